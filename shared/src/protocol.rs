//! The colon-delimited wire protocol.
//!
//! Every message is a single ASCII line. Client requests parse into
//! [`Request`] so the server dispatches on a tagged variant instead of
//! string prefixes; server lines parse into [`ServerMessage`] on the
//! client side. Parse failures carry the offending command, because
//! each command answers malformed input with its own status code.

use crate::board::Board;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How a client wants to enter a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Player,
    Viewer,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Player => "PLAYER",
            Mode::Viewer => "VIEWER",
        }
    }
}

impl FromStr for Mode {
    type Err = ();

    /// Case-insensitive; clients upcase input before sending but the
    /// server does not rely on that.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PLAYER" => Ok(Mode::Player),
            "VIEWER" => Ok(Mode::Viewer),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Login { username: String, password: String },
    Register { username: String, password: String },
    RoomList { mode: Mode },
    Create { name: String },
    /// `mode` stays unvalidated here: JOIN answers "room not found"
    /// before "invalid mode", so the lookup must happen first.
    Join { name: String, mode: Option<Mode> },
    Place { x: usize, y: usize },
    Forfeit,
}

/// A request line that failed to parse, tagged with the command so the
/// server can answer the command-specific malformed status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("malformed LOGIN message")]
    MalformedLogin,
    #[error("malformed REGISTER message")]
    MalformedRegister,
    #[error("malformed ROOMLIST message")]
    MalformedRoomList,
    #[error("malformed CREATE message")]
    MalformedCreate,
    #[error("malformed JOIN message")]
    MalformedJoin,
    #[error("malformed PLACE message")]
    MalformedPlace,
    #[error("unknown command")]
    Unknown,
}

impl RequestError {
    /// The reply owed to the client, if any. Malformed PLACE and
    /// unknown commands are dropped without an answer.
    pub fn ack(self) -> Option<ServerMessage> {
        match self {
            RequestError::MalformedLogin => Some(ServerMessage::LoginAck(3)),
            RequestError::MalformedRegister => Some(ServerMessage::RegisterAck(2)),
            RequestError::MalformedRoomList => Some(ServerMessage::RoomListErr(1)),
            RequestError::MalformedCreate => Some(ServerMessage::CreateAck(4)),
            RequestError::MalformedJoin => Some(ServerMessage::JoinAck(3)),
            RequestError::MalformedPlace | RequestError::Unknown => None,
        }
    }
}

impl Request {
    /// Parses one wire line. Field counts are strict: a stray colon in
    /// a password makes the message malformed rather than ambiguous.
    pub fn parse(line: &str) -> Result<Request, RequestError> {
        let parts: Vec<&str> = line.split(':').collect();
        match parts[0] {
            "LOGIN" => {
                if parts.len() != 3 {
                    return Err(RequestError::MalformedLogin);
                }
                Ok(Request::Login {
                    username: parts[1].to_string(),
                    password: parts[2].to_string(),
                })
            }
            "REGISTER" => {
                if parts.len() != 3 {
                    return Err(RequestError::MalformedRegister);
                }
                Ok(Request::Register {
                    username: parts[1].to_string(),
                    password: parts[2].to_string(),
                })
            }
            "ROOMLIST" => {
                if parts.len() != 2 {
                    return Err(RequestError::MalformedRoomList);
                }
                let mode = parts[1]
                    .parse()
                    .map_err(|_| RequestError::MalformedRoomList)?;
                Ok(Request::RoomList { mode })
            }
            "CREATE" => {
                if parts.len() != 2 {
                    return Err(RequestError::MalformedCreate);
                }
                Ok(Request::Create {
                    name: parts[1].to_string(),
                })
            }
            "JOIN" => {
                if parts.len() != 3 {
                    return Err(RequestError::MalformedJoin);
                }
                Ok(Request::Join {
                    name: parts[1].to_string(),
                    mode: parts[2].parse().ok(),
                })
            }
            "PLACE" => {
                if parts.len() != 3 {
                    return Err(RequestError::MalformedPlace);
                }
                let x: usize = parts[1].parse().map_err(|_| RequestError::MalformedPlace)?;
                let y: usize = parts[2].parse().map_err(|_| RequestError::MalformedPlace)?;
                if x > 2 || y > 2 {
                    return Err(RequestError::MalformedPlace);
                }
                Ok(Request::Place { x, y })
            }
            "FORFEIT" => Ok(Request::Forfeit),
            _ => Err(RequestError::Unknown),
        }
    }

    /// True for every command that mutates shared state and therefore
    /// sits behind the authentication gate.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Request::Login { .. } | Request::Register { .. })
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Login { username, password } => {
                write!(f, "LOGIN:{}:{}", username, password)
            }
            Request::Register { username, password } => {
                write!(f, "REGISTER:{}:{}", username, password)
            }
            Request::RoomList { mode } => write!(f, "ROOMLIST:{}", mode),
            Request::Create { name } => write!(f, "CREATE:{}", name),
            Request::Join { name, mode } => {
                let mode = mode.map(Mode::as_str).unwrap_or("");
                write!(f, "JOIN:{}:{}", name, mode)
            }
            Request::Place { x, y } => write!(f, "PLACE:{}:{}", x, y),
            Request::Forfeit => f.write_str("FORFEIT"),
        }
    }
}

/// How a finished game ended, with the winner's username where one
/// exists. Wire codes: win 0, draw 1, forfeit 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOutcome {
    Win(String),
    Draw,
    Forfeit(String),
}

/// Every server-to-client line: command acknowledgements and the
/// server-initiated broadcasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// 0 ok, 1 user not found, 2 bad password, 3 malformed.
    LoginAck(u8),
    /// 0 ok, 1 username taken, 2 malformed.
    RegisterAck(u8),
    RoomListOk { label: String, rooms: Vec<String> },
    RoomListErr(u8),
    /// 0 ok, 1 invalid name, 2 exists, 3 room limit, 4 malformed.
    CreateAck(u8),
    /// 0 ok, 1 not found, 2 full, 3 invalid mode or malformed.
    JoinAck(u8),
    /// 2 occupied, 3 queued. Success has no ack; a board broadcast
    /// follows instead.
    PlaceAck(u8),
    BadAuth,
    NoRoom,
    Begin { player1: String, player2: String },
    InProgress { player1: String, player2: String },
    BoardStatus(Board),
    ForfeitNotice { player: String },
    GameEnd { board: Board, outcome: GameOutcome },
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::LoginAck(status) => write!(f, "LOGIN:ACKSTATUS:{}", status),
            ServerMessage::RegisterAck(status) => write!(f, "REGISTER:ACKSTATUS:{}", status),
            ServerMessage::RoomListOk { label, rooms } => {
                write!(f, "ROOMLIST:ACKSTATUS:0:{}:{}", label, rooms.join(","))
            }
            ServerMessage::RoomListErr(status) => write!(f, "ROOMLIST:ACKSTATUS:{}", status),
            ServerMessage::CreateAck(status) => write!(f, "CREATE:ACKSTATUS:{}", status),
            ServerMessage::JoinAck(status) => write!(f, "JOIN:ACKSTATUS:{}", status),
            ServerMessage::PlaceAck(status) => write!(f, "PLACE:ACKSTATUS:{}", status),
            ServerMessage::BadAuth => f.write_str("BADAUTH"),
            ServerMessage::NoRoom => f.write_str("NOROOM"),
            ServerMessage::Begin { player1, player2 } => {
                write!(f, "BEGIN:{}:{}", player1, player2)
            }
            ServerMessage::InProgress { player1, player2 } => {
                write!(f, "INPROGRESS:{}:{}", player1, player2)
            }
            ServerMessage::BoardStatus(board) => write!(f, "BOARDSTATUS:{}", board.encode()),
            ServerMessage::ForfeitNotice { player } => write!(f, "FORFEIT:{}", player),
            ServerMessage::GameEnd { board, outcome } => match outcome {
                GameOutcome::Win(winner) => write!(f, "GAMEEND:{}:0:{}", board.encode(), winner),
                GameOutcome::Draw => write!(f, "GAMEEND:{}:1", board.encode()),
                GameOutcome::Forfeit(winner) => {
                    write!(f, "GAMEEND:{}:2:{}", board.encode(), winner)
                }
            },
        }
    }
}

impl ServerMessage {
    /// Parses one server line on the client side. Returns `None` for
    /// anything unrecognized so the caller can fall back to printing
    /// the raw line.
    pub fn parse(line: &str) -> Option<ServerMessage> {
        let parts: Vec<&str> = line.split(':').collect();
        match parts[0] {
            "LOGIN" | "REGISTER" | "CREATE" | "JOIN" | "PLACE" => {
                if parts.len() != 3 || parts[1] != "ACKSTATUS" {
                    return None;
                }
                let status: u8 = parts[2].parse().ok()?;
                Some(match parts[0] {
                    "LOGIN" => ServerMessage::LoginAck(status),
                    "REGISTER" => ServerMessage::RegisterAck(status),
                    "CREATE" => ServerMessage::CreateAck(status),
                    "JOIN" => ServerMessage::JoinAck(status),
                    _ => ServerMessage::PlaceAck(status),
                })
            }
            "ROOMLIST" => {
                if parts.len() < 3 || parts[1] != "ACKSTATUS" {
                    return None;
                }
                let status: u8 = parts[2].parse().ok()?;
                if status != 0 {
                    return Some(ServerMessage::RoomListErr(status));
                }
                let label = parts.get(3).unwrap_or(&"").to_string();
                let rooms = match parts.get(4) {
                    Some(&"") | None => Vec::new(),
                    Some(csv) => csv.split(',').map(str::to_string).collect(),
                };
                Some(ServerMessage::RoomListOk { label, rooms })
            }
            "BADAUTH" if parts.len() == 1 => Some(ServerMessage::BadAuth),
            "NOROOM" if parts.len() == 1 => Some(ServerMessage::NoRoom),
            "BEGIN" if parts.len() == 3 => Some(ServerMessage::Begin {
                player1: parts[1].to_string(),
                player2: parts[2].to_string(),
            }),
            "INPROGRESS" if parts.len() == 3 => Some(ServerMessage::InProgress {
                player1: parts[1].to_string(),
                player2: parts[2].to_string(),
            }),
            "BOARDSTATUS" if parts.len() == 2 => {
                Board::decode(parts[1]).map(ServerMessage::BoardStatus)
            }
            "FORFEIT" if parts.len() == 2 => Some(ServerMessage::ForfeitNotice {
                player: parts[1].to_string(),
            }),
            "GAMEEND" => {
                if parts.len() < 3 {
                    return None;
                }
                let board = Board::decode(parts[1])?;
                let outcome = match (parts[2], parts.get(3)) {
                    ("0", Some(winner)) => GameOutcome::Win(winner.to_string()),
                    ("1", None) => GameOutcome::Draw,
                    ("2", Some(winner)) => GameOutcome::Forfeit(winner.to_string()),
                    _ => return None,
                };
                Some(ServerMessage::GameEnd { board, outcome })
            }
            _ => None,
        }
    }
}
