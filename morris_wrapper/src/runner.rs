use std::time::Duration;

use morris::{
    highlight_diff, swap_players, GameState, JoinGameRequest, MoveRequest, NewGameRequest, Seat,
};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info, info_span, warn};

use crate::client::GameClient;
use crate::delay::Sleeper;
use crate::error::{ClientError, OracleError};
use crate::oracle::MoveGenerator;

/// Applied after every step, on top of whatever the step waited itself.
pub const BASE_DELAY: Duration = Duration::from_secs(1);
pub const LOGIN_RETRY_DELAY: Duration = Duration::from_secs(10);
pub const LOGIN_BACKOFF_DELAY: Duration = Duration::from_secs(5 * 60);
/// Failed logins that are retried after [`LOGIN_RETRY_DELAY`]; later ones
/// wait [`LOGIN_BACKOFF_DELAY`].
pub const LOGIN_QUICK_RETRIES: u32 = 4;
pub const NOT_MY_TURN_DELAY: Duration = Duration::from_secs(20);
pub const PLAYING_SLOWDOWN: Duration = Duration::from_secs(2);
pub const OPEN_GAME_DELAY: Duration = Duration::from_secs(2 * 60);
/// Below this many joinable games, a new game is created instead.
pub const MIN_AVAILABLE_OPEN_GAMES: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    LoggedOut,
    GamePolling,
    GamePlaying,
    OpenGame,
    JoinGame,
    NewGame,
}

impl State {
    pub const ALL: [State; 6] = [
        State::LoggedOut,
        State::GamePolling,
        State::GamePlaying,
        State::OpenGame,
        State::JoinGame,
        State::NewGame,
    ];

    /// Every state a step from `self` can end in.
    pub fn successors(self) -> &'static [State] {
        match self {
            State::LoggedOut => &[State::LoggedOut, State::GamePolling],
            State::GamePolling => &[State::GamePlaying, State::OpenGame, State::LoggedOut],
            State::GamePlaying => &[State::GamePlaying, State::GamePolling, State::LoggedOut],
            State::OpenGame => &[
                State::GamePlaying,
                State::OpenGame,
                State::NewGame,
                State::JoinGame,
                State::LoggedOut,
            ],
            State::JoinGame => &[State::GamePlaying, State::OpenGame],
            State::NewGame => &[State::OpenGame, State::LoggedOut],
        }
    }
}

/// How long to wait after the `failures`-th consecutive failed login.
pub fn login_backoff(failures: u32) -> Duration {
    if failures <= LOGIN_QUICK_RETRIES {
        LOGIN_RETRY_DELAY
    } else {
        LOGIN_BACKOFF_DELAY
    }
}

/// Plays games on the server on behalf of one identity, forever.
///
/// Every call to [`step`](Runner::step) performs the action of the current
/// state and moves to the next one. Errors talking to the server always lead
/// back to [`State::LoggedOut`]; nothing is fatal.
pub struct Runner<C, M, S> {
    client: C,
    oracle: M,
    sleeper: S,
    rng: StdRng,
    username: String,
    password: String,
    state: State,
    login_failures: u32,
    /// The number of our own open games seen by the last poll. If it shrinks,
    /// somebody joined one of them.
    my_open_game_count: usize,
    /// Joinable games, as found by the last poll in [`State::OpenGame`].
    all_open_games: Vec<GameState>,
}

impl<C: GameClient, M: MoveGenerator, S: Sleeper> Runner<C, M, S> {
    pub fn new(
        client: C,
        oracle: M,
        sleeper: S,
        rng: StdRng,
        username: &str,
        password: &str,
    ) -> Self {
        Self {
            client,
            oracle,
            sleeper,
            rng,
            username: String::from(username),
            password: String::from(password),
            state: State::LoggedOut,
            login_failures: 0,
            my_open_game_count: 0,
            all_open_games: Vec::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Runs until the process is killed.
    pub fn run(&mut self) -> ! {
        loop {
            self.tick();
        }
    }

    /// One step followed by the base delay.
    pub fn tick(&mut self) -> State {
        let state = self.step();
        self.sleeper.sleep(BASE_DELAY);
        state
    }

    pub fn step(&mut self) -> State {
        let next = match self.state {
            State::LoggedOut => self.logged_out(),
            State::GamePolling => {
                let result = self.game_polling();
                self.recover("getting active games", result)
            }
            State::GamePlaying => {
                let result = self.game_playing();
                self.recover("getting active games", result)
            }
            State::OpenGame => {
                let result = self.open_game();
                self.recover("getting my open games", result)
            }
            State::JoinGame => self.join_game(),
            State::NewGame => {
                let result = self.new_game();
                self.recover("creating a new game", result)
            }
        };
        debug_assert!(self.state.successors().contains(&next));
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "State transition");
        }
        self.state = next;
        next
    }

    fn recover(&self, action: &str, result: Result<State, ClientError>) -> State {
        result.unwrap_or_else(|err| {
            info!("Got an error {}. Going to try logging in again: {}", action, err);
            State::LoggedOut
        })
    }

    fn logged_out(&mut self) -> State {
        match self.client.login(&self.username, &self.password) {
            Ok(()) => {
                info!(username = %self.username, "Logged in");
                self.login_failures = 0;
                State::GamePolling
            }
            Err(err) => {
                self.login_failures += 1;
                let delay = login_backoff(self.login_failures);
                warn!(
                    attempt = self.login_failures,
                    "Login for user {} failed: {}. Waiting for {} seconds before trying again",
                    self.username,
                    err,
                    delay.as_secs()
                );
                self.sleeper.sleep(delay);
                State::LoggedOut
            }
        }
    }

    fn game_polling(&mut self) -> Result<State, ClientError> {
        info!("Entering Game Polling State");
        let games = self.client.my_active_games()?;
        if games.iter().any(|gs| gs.is_my_turn(&self.username)) {
            Ok(State::GamePlaying)
        } else {
            Ok(State::OpenGame)
        }
    }

    fn game_playing(&mut self) -> Result<State, ClientError> {
        info!("Entering Game Playing State");
        let games: Vec<GameState> = self
            .client
            .my_active_games()?
            .into_iter()
            .filter(|gs| gs.holds_automated_seat(&self.username))
            .collect();
        info!("I have {} games", games.len());
        if games.is_empty() {
            self.sleeper.sleep(PLAYING_SLOWDOWN);
            return Ok(State::GamePolling);
        }

        let mut any_my_turn = false;
        for game in &games {
            if game.is_my_turn(&self.username) {
                any_my_turn = true;
                info!(game_id = game.id, "It's my turn");
                self.play_turn(game)?;
            } else {
                let opponent = game
                    .automated_seat(&self.username)
                    .and_then(|seat| game.username(seat.other()))
                    .unwrap_or("nobody");
                info!(game_id = game.id, "It's not my turn, waiting on {}", opponent);
            }
        }

        if !any_my_turn {
            info!(
                "I have {} active games, but it's not my turn. Waiting for {} seconds",
                games.len(),
                NOT_MY_TURN_DELAY.as_secs()
            );
            self.sleeper.sleep(NOT_MY_TURN_DELAY);
        }
        self.sleeper.sleep(PLAYING_SLOWDOWN);
        Ok(State::GamePlaying)
    }

    /// Computes and submits a move for a game where it is our turn.
    ///
    /// Failing to compute a move and the server rejecting it are both only
    /// logged; the turn is retried on the next poll.
    fn play_turn(&mut self, game: &GameState) -> Result<(), ClientError> {
        let _span = info_span!(
            "game",
            game_id = game.id,
            move_number = game.number_of_moves_made
        )
        .entered();
        let seat = game.seat_to_move();
        info!(
            "{}; is player 1's turn: {}; \
             player 1 unplayed pieces: {}; player 2 unplayed pieces: {}",
            game.current_board_state,
            game.is_player_ones_turn,
            game.player_one_unplayed_piece_count,
            game.player_two_unplayed_piece_count
        );

        let next_move = match self.compute_move(game, seat) {
            Ok(next_move) => next_move,
            Err(err) => {
                warn!("Unable to get the next move: {}", err);
                return Ok(());
            }
        };

        let req = MoveRequest {
            game_id: game.id,
            player_name: self.username.clone(),
            board_state: next_move,
        };
        let from_player_one = seat == Seat::PlayerOne;
        match self.client.apply_move(&req) {
            Ok(updated) => {
                let label = format!(
                    "Game Id: {}; Move #{}: ",
                    game.id, updated.number_of_moves_made
                );
                info!(
                    "\n{}",
                    highlight_diff(
                        &label,
                        &game.current_board_state,
                        &updated.current_board_state,
                        from_player_one
                    )
                );
                Ok(())
            }
            Err(err @ ClientError::Status { .. }) => {
                debug!("{}", err);
                let label = format!("Move Rejected By Server: Game Id: {}: ", game.id);
                info!(
                    "\n{}",
                    highlight_diff(
                        &label,
                        &game.current_board_state,
                        &req.board_state,
                        from_player_one
                    )
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Asks the oracle for a move, always from player one's point of view.
    fn compute_move(&self, game: &GameState, seat: Seat) -> Result<String, OracleError> {
        let unplayed = game.unplayed_piece_count(seat);
        match seat {
            Seat::PlayerOne => self.oracle.compute_move(&game.current_board_state, unplayed),
            Seat::PlayerTwo => {
                let board = swap_players(&game.current_board_state);
                let next_move = self.oracle.compute_move(&board, unplayed)?;
                Ok(swap_players(&next_move))
            }
        }
    }

    fn open_game(&mut self) -> Result<State, ClientError> {
        info!("Entering Open Game State");
        let my_open_games = self
            .client
            .my_open_games()?
            .into_iter()
            .filter(|gs| gs.holds_automated_seat(&self.username))
            .count();

        if my_open_games < self.my_open_game_count {
            info!("Somebody joined one of my open games");
            self.my_open_game_count = my_open_games;
            return Ok(State::GamePlaying);
        }
        self.my_open_game_count = my_open_games;

        if my_open_games > 0 {
            info!(
                "I have {} open games, waiting for another player to join. Waiting for {} seconds",
                my_open_games,
                OPEN_GAME_DELAY.as_secs()
            );
            self.sleeper.sleep(OPEN_GAME_DELAY);
            return Ok(State::OpenGame);
        }

        let username = &self.username;
        self.all_open_games = self
            .client
            .available_open_games()?
            .into_iter()
            .filter(|gs| !gs.is_seated(username))
            .collect();
        info!("There are {} open games I could join", self.all_open_games.len());

        if self.all_open_games.len() < MIN_AVAILABLE_OPEN_GAMES {
            Ok(State::NewGame)
        } else {
            Ok(State::JoinGame)
        }
    }

    /// Losing a race for a seat is expected, so failures here are not errors.
    fn join_game(&mut self) -> State {
        info!("Entering Join Game State");
        let candidates: Vec<i64> = self.all_open_games.iter().map(|gs| gs.id).collect();
        for game_id in candidates {
            let req = JoinGameRequest {
                game_id,
                player_name: self.username.clone(),
                is_automated: true,
            };
            match self.client.join_open_game(&req) {
                Ok(joined) => {
                    info!(game_id = joined.id, "Joined game");
                    return State::GamePlaying;
                }
                Err(err) => {
                    info!(game_id, "Could not join game. Maybe somebody else beat me to it");
                    debug!("{}", err);
                }
            }
        }
        State::OpenGame
    }

    fn new_game(&mut self) -> Result<State, ClientError> {
        info!("Entering New Game State");
        let game_board_name = self
            .client
            .available_game_boards()?
            .into_iter()
            .next()
            .ok_or(ClientError::NoGameBoards)?;

        let req = NewGameRequest {
            game_board_name,
            is_player_one: self.rng.gen::<bool>(),
            player_name: self.username.clone(),
            is_automated: true,
        };
        let game = self.client.new_game(&req)?;
        let seat = if req.is_player_one {
            Seat::PlayerOne
        } else {
            Seat::PlayerTwo
        };
        info!(
            game_id = game.id,
            "Created a new game on board '{}'; I'm {}", req.game_board_name, seat
        );
        Ok(State::OpenGame)
    }
}
