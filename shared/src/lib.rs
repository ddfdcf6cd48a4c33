//! Types shared between the game server and the client:
//! the wire protocol, the newline-delimited line codec, and the
//! 3x3 board model with its 9-character wire encoding.

pub mod board;
pub mod codec;
pub mod protocol;

pub use board::{Board, Marker};
pub use codec::LineFramer;
pub use protocol::{GameOutcome, Mode, Request, RequestError, ServerMessage};

/// Maximum number of rooms the server tracks concurrently.
pub const MAX_ROOMS: usize = 256;

/// Maximum length of a room name in characters.
pub const ROOM_NAME_MAX_LEN: usize = 20;

/// Returns true if `name` is a legal room name: non-empty, at most
/// [`ROOM_NAME_MAX_LEN`] characters, drawn from `[A-Za-z0-9_ -]`.
pub fn valid_room_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().count() <= ROOM_NAME_MAX_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ' || c == '-')
}
