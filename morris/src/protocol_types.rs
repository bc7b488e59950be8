use serde::{Deserialize, Deserializer, Serialize};

use crate::{PLAYER_ONE_MARKER, PLAYER_TWO_MARKER};

/// One of the two player slots of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Seat {
    /// The first-seated player, whose pieces are marked `W`.
    PlayerOne,
    /// The second-seated player, whose pieces are marked `B`.
    PlayerTwo,
}

impl Seat {
    pub fn other(self) -> Seat {
        match self {
            Seat::PlayerOne => Seat::PlayerTwo,
            Seat::PlayerTwo => Seat::PlayerOne,
        }
    }

    /// The character that marks this seat's pieces in a board state string.
    pub fn marker(self) -> char {
        match self {
            Seat::PlayerOne => PLAYER_ONE_MARKER,
            Seat::PlayerTwo => PLAYER_TWO_MARKER,
        }
    }
}

impl std::fmt::Display for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Seat::PlayerOne => write!(f, "player 1"),
            Seat::PlayerTwo => write!(f, "player 2"),
        }
    }
}

/// Snapshot of one game instance, as returned by the server.
///
/// Snapshots are never mutated in place. Every poll replaces the cached copy,
/// and the perspective swap in front of the move oracle works on a copy of
/// the board string only.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameState {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub current_board_state: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_player_ones_turn: bool,
    pub player_one_username: Option<String>,
    pub player_two_username: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub player_one_is_automated: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub player_two_is_automated: bool,
    /// Address of an external bot endpoint playing this seat. When set, the
    /// seat is played by someone else even if it is flagged as automated.
    pub player_one_ai_endpoint: Option<String>,
    pub player_two_ai_endpoint: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub player_one_unplayed_piece_count: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub player_two_unplayed_piece_count: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub number_of_moves_made: u32,
}

/// The server may send `null` for any boxed field; treat it like a missing one.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl GameState {
    pub fn seat_to_move(&self) -> Seat {
        if self.is_player_ones_turn {
            Seat::PlayerOne
        } else {
            Seat::PlayerTwo
        }
    }

    pub fn username(&self, seat: Seat) -> Option<&str> {
        match seat {
            Seat::PlayerOne => self.player_one_username.as_deref(),
            Seat::PlayerTwo => self.player_two_username.as_deref(),
        }
    }

    pub fn unplayed_piece_count(&self, seat: Seat) -> u32 {
        match seat {
            Seat::PlayerOne => self.player_one_unplayed_piece_count,
            Seat::PlayerTwo => self.player_two_unplayed_piece_count,
        }
    }

    /// Is `seat` held by `username` and meant to be played by this client?
    ///
    /// That requires the automation flag and no external AI endpoint.
    pub fn is_automated_seat(&self, seat: Seat, username: &str) -> bool {
        let (name, automated, endpoint) = match seat {
            Seat::PlayerOne => (
                &self.player_one_username,
                self.player_one_is_automated,
                &self.player_one_ai_endpoint,
            ),
            Seat::PlayerTwo => (
                &self.player_two_username,
                self.player_two_is_automated,
                &self.player_two_ai_endpoint,
            ),
        };
        name.as_deref() == Some(username)
            && automated
            && endpoint.as_deref().map_or(true, str::is_empty)
    }

    /// The first seat that this client plays automatically, if any.
    pub fn automated_seat(&self, username: &str) -> Option<Seat> {
        [Seat::PlayerOne, Seat::PlayerTwo]
            .into_iter()
            .find(|&seat| self.is_automated_seat(seat, username))
    }

    pub fn holds_automated_seat(&self, username: &str) -> bool {
        self.automated_seat(username).is_some()
    }

    pub fn is_my_turn(&self, username: &str) -> bool {
        self.is_automated_seat(self.seat_to_move(), username)
    }

    /// Whether `username` sits at this game at all, automated or not.
    pub fn is_seated(&self, username: &str) -> bool {
        self.player_one_username.as_deref() == Some(username)
            || self.player_two_username.as_deref() == Some(username)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request to open a new game and take one of its seats.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGameRequest {
    pub game_board_name: String,
    pub is_player_one: bool,
    pub player_name: String,
    pub is_automated: bool,
}

/// Request to take the free seat of somebody else's open game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameRequest {
    pub game_id: i64,
    pub player_name: String,
    pub is_automated: bool,
}

/// Proposes the next board state for a game.
///
/// The server answers with the updated [`GameState`], or with an error
/// status if it rejects the move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub game_id: i64,
    pub player_name: String,
    pub board_state: String,
}
