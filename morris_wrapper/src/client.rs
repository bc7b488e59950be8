use morris::{GameState, JoinGameRequest, LoginRequest, MoveRequest, NewGameRequest};
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::ClientError;

pub const LOGIN_ENDPOINT: &str = "/api/user/login";
pub const GAME_BOARDS_ENDPOINT: &str = "/api/game/availableGameBoards";
pub const ALL_OPEN_GAMES_ENDPOINT: &str = "/api/game/availableOpenGames";
pub const MY_OPEN_GAMES_ENDPOINT: &str = "/api/game/myOpenGames";
pub const MY_ACTIVE_GAMES_ENDPOINT: &str = "/api/game/myActiveGames";
pub const NEW_GAME_ENDPOINT: &str = "/api/game/newGame";
pub const JOIN_GAME_ENDPOINT: &str = "/api/game/joinOpenGame";
pub const APPLY_MOVE_ENDPOINT: &str = "/api/game/applyMove";

/// The requests the runner makes against the game server.
///
/// Everything after [`login`](GameClient::login) is expected to reuse the
/// session that the login established.
pub trait GameClient {
    /// Starts a fresh session, dropping any previous one.
    fn login(&mut self, username: &str, password: &str) -> Result<(), ClientError>;
    fn my_active_games(&mut self) -> Result<Vec<GameState>, ClientError>;
    /// Games this identity created that are still waiting for an opponent.
    fn my_open_games(&mut self) -> Result<Vec<GameState>, ClientError>;
    /// Every game on the server that is waiting for an opponent.
    fn available_open_games(&mut self) -> Result<Vec<GameState>, ClientError>;
    /// Names of the board layouts a new game can be created with.
    fn available_game_boards(&mut self) -> Result<Vec<String>, ClientError>;
    fn new_game(&mut self, req: &NewGameRequest) -> Result<GameState, ClientError>;
    fn join_open_game(&mut self, req: &JoinGameRequest) -> Result<GameState, ClientError>;
    /// Fails with [`ClientError::Status`] when the server rejects the move.
    fn apply_move(&mut self, req: &MoveRequest) -> Result<GameState, ClientError>;
}

/// [`GameClient`] talking JSON over HTTP, with the session kept in a cookie.
pub struct HttpGameClient {
    server: String,
    client: Client,
}

impl HttpGameClient {
    pub fn new(server: &str) -> Result<Self, ClientError> {
        Ok(Self {
            server: String::from(server.trim_end_matches('/')),
            client: session_client(LOGIN_ENDPOINT)?,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.server, endpoint)
    }

    fn get<T: DeserializeOwned>(&self, endpoint: &'static str) -> Result<T, ClientError> {
        let response = self
            .client
            .get(self.url(endpoint))
            .send()
            .map_err(|err| ClientError::Transport { endpoint, err })?;
        read_json(endpoint, check_status(endpoint, response)?)
    }

    fn post<B: Serialize>(
        &self,
        endpoint: &'static str,
        body: &B,
    ) -> Result<Response, ClientError> {
        let response = self
            .client
            .post(self.url(endpoint))
            .json(body)
            .send()
            .map_err(|err| ClientError::Transport { endpoint, err })?;
        check_status(endpoint, response)
    }

    fn get_games(&self, endpoint: &'static str) -> Result<Vec<GameState>, ClientError> {
        let games: Vec<Option<GameState>> = self.get(endpoint)?;
        Ok(games.into_iter().flatten().collect())
    }
}

impl GameClient for HttpGameClient {
    fn login(&mut self, username: &str, password: &str) -> Result<(), ClientError> {
        // A new client comes with an empty cookie jar, i.e. a new session
        self.client = session_client(LOGIN_ENDPOINT)?;
        let req = LoginRequest {
            username: String::from(username),
            password: String::from(password),
        };
        let response = self.post(LOGIN_ENDPOINT, &req)?;
        let body = response.text().map_err(|err| ClientError::Transport {
            endpoint: LOGIN_ENDPOINT,
            err,
        })?;
        trace!(response = %body, "Login response");
        Ok(())
    }

    fn my_active_games(&mut self) -> Result<Vec<GameState>, ClientError> {
        self.get_games(MY_ACTIVE_GAMES_ENDPOINT)
    }

    fn my_open_games(&mut self) -> Result<Vec<GameState>, ClientError> {
        self.get_games(MY_OPEN_GAMES_ENDPOINT)
    }

    fn available_open_games(&mut self) -> Result<Vec<GameState>, ClientError> {
        self.get_games(ALL_OPEN_GAMES_ENDPOINT)
    }

    fn available_game_boards(&mut self) -> Result<Vec<String>, ClientError> {
        self.get(GAME_BOARDS_ENDPOINT)
    }

    fn new_game(&mut self, req: &NewGameRequest) -> Result<GameState, ClientError> {
        let response = self.post(NEW_GAME_ENDPOINT, req)?;
        read_json(NEW_GAME_ENDPOINT, response)
    }

    fn join_open_game(&mut self, req: &JoinGameRequest) -> Result<GameState, ClientError> {
        let response = self.post(JOIN_GAME_ENDPOINT, req)?;
        read_json(JOIN_GAME_ENDPOINT, response)
    }

    fn apply_move(&mut self, req: &MoveRequest) -> Result<GameState, ClientError> {
        let response = self.post(APPLY_MOVE_ENDPOINT, req)?;
        read_json(APPLY_MOVE_ENDPOINT, response)
    }
}

fn session_client(endpoint: &'static str) -> Result<Client, ClientError> {
    Client::builder()
        .cookie_store(true)
        .build()
        .map_err(|err| ClientError::Transport { endpoint, err })
}

fn check_status(endpoint: &'static str, response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        debug!(endpoint, status = status.as_u16(), "Request was not successful");
        Err(ClientError::Status {
            endpoint,
            status: status.as_u16(),
        })
    }
}

fn read_json<T: DeserializeOwned>(
    endpoint: &'static str,
    response: Response,
) -> Result<T, ClientError> {
    let body = response
        .text()
        .map_err(|err| ClientError::Transport { endpoint, err })?;
    trace!(endpoint, response = %body, "Received response");
    parse_body(endpoint, &body)
}

fn parse_body<T: DeserializeOwned>(endpoint: &'static str, body: &str) -> Result<T, ClientError> {
    serde_json::from_str(body).map_err(|err| ClientError::MalformedBody { endpoint, err })
}
