//! Message display and board rendering for the terminal client.

use crate::session::SessionHandle;
use shared::board::{Board, Marker};
use shared::protocol::{GameOutcome, ServerMessage};

/// Renders the board the way the prompts expect it: three rows of
/// `X | O |  ` cells. Player one is X, player two is O.
pub fn render_board(board: &Board) -> String {
    let cell = |x, y| match board.get(x, y) {
        Some(Marker::P1) => 'X',
        Some(Marker::P2) => 'O',
        None => ' ',
    };
    (0..3)
        .map(|y| format!("{} | {} | {}", cell(0, y), cell(1, y), cell(2, y)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prints one server message and applies its effect on the shared
/// session: BEGIN seats us and sets the first turn, BOARDSTATUS flips
/// the turn flag, GAMEEND returns us to the lobby.
pub fn handle_server_message(message: &ServerMessage, session: &SessionHandle) {
    match message {
        ServerMessage::LoginAck(status) => match status {
            0 => println!("Login successful."),
            1 => {
                let username = session.read(|s| s.username.clone()).unwrap_or_default();
                println!("Error: User {} not found.", username);
            }
            2 => println!("Error: Incorrect password."),
            _ => println!("Error: Malformed login message."),
        },
        ServerMessage::RegisterAck(status) => match status {
            0 => println!("Registration successful."),
            1 => println!("Error: Username already exists."),
            _ => println!("Error: Malformed register message."),
        },
        ServerMessage::RoomListOk { label, rooms } => {
            if rooms.is_empty() {
                println!("No rooms available.");
            } else {
                println!("{}: {}", label, rooms.join(","));
            }
        }
        ServerMessage::RoomListErr(_) => println!("Error: Invalid mode."),
        ServerMessage::CreateAck(status) => match status {
            0 => {
                println!("Room created successfully.");
                println!("Waiting for other player to join...");
            }
            1 => println!("Error: Invalid room name."),
            2 => println!("Error: Room already exists."),
            3 => println!("Error: Maximum number of rooms reached."),
            _ => println!("Error: Malformed create message."),
        },
        ServerMessage::JoinAck(status) => match status {
            0 => println!("Successfully joined the room."),
            1 => println!("Error: Room does not exist."),
            2 => println!("Error: Room is full."),
            _ => println!("Error: Invalid mode."),
        },
        ServerMessage::PlaceAck(status) => match status {
            2 => println!("There is already a marker there."),
            3 => println!("Not your turn; your move has been queued."),
            _ => println!("Unexpected place response: {}", status),
        },
        ServerMessage::BadAuth => {
            println!("Error: You must be logged in to perform this action.")
        }
        ServerMessage::NoRoom => println!("Error: You are not in a room."),
        ServerMessage::Begin { player1, player2 } => {
            let username = session.read(|s| s.username.clone());
            if username.as_deref() == Some(player1) {
                println!("Game started. It is your turn, {}.", player1);
                session.update(|s| {
                    s.in_game = true;
                    s.my_turn = true;
                    s.opponent = Some(player2.clone());
                });
            } else if username.as_deref() == Some(player2) {
                println!("Game started. It is {}'s turn.", player1);
                session.update(|s| {
                    s.in_game = true;
                    s.my_turn = false;
                    s.opponent = Some(player1.clone());
                });
            } else {
                println!("Game between {} and {} has started.", player1, player2);
            }
        }
        ServerMessage::InProgress { player1, player2 } => {
            println!("Match between {} and {} is in progress.", player1, player2);
        }
        ServerMessage::BoardStatus(board) => {
            println!("\nCurrent board:");
            println!("{}", render_board(board));
            let (in_game, my_turn) = session.read(|s| (s.in_game, s.my_turn));
            if in_game {
                if my_turn {
                    let opponent = session.read(|s| s.opponent.clone()).unwrap_or_default();
                    println!("It is now {}'s turn.", opponent);
                } else {
                    println!("It is your turn.");
                }
                session.update(|s| s.my_turn = !s.my_turn);
            }
        }
        ServerMessage::ForfeitNotice { player } => {
            println!("{} has forfeited the game.", player);
        }
        ServerMessage::GameEnd { board, outcome } => {
            println!("\nFinal board:");
            println!("{}", render_board(board));
            match outcome {
                GameOutcome::Win(winner) => println!("{} wins!", winner),
                GameOutcome::Draw => println!("The game is a draw."),
                GameOutcome::Forfeit(winner) => {
                    println!("Game forfeited; {} wins!", winner)
                }
            }
            session.update(|s| {
                s.in_game = false;
                s.my_turn = false;
                s.opponent = None;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_board_marks_both_players() {
        let board = Board::decode("120010002").unwrap();
        assert_eq!(render_board(&board), "X | O |  \n  | X |  \n  |   | O");
    }

    #[test]
    fn test_begin_seats_player_one_with_the_turn() {
        let session = SessionHandle::new();
        session.update(|s| s.username = Some("alice".to_string()));

        handle_server_message(
            &ServerMessage::Begin {
                player1: "alice".to_string(),
                player2: "bob".to_string(),
            },
            &session,
        );

        session.read(|s| {
            assert!(s.in_game);
            assert!(s.my_turn);
            assert_eq!(s.opponent.as_deref(), Some("bob"));
        });
    }

    #[test]
    fn test_begin_seats_player_two_waiting() {
        let session = SessionHandle::new();
        session.update(|s| s.username = Some("bob".to_string()));

        handle_server_message(
            &ServerMessage::Begin {
                player1: "alice".to_string(),
                player2: "bob".to_string(),
            },
            &session,
        );

        session.read(|s| {
            assert!(s.in_game);
            assert!(!s.my_turn);
            assert_eq!(s.opponent.as_deref(), Some("alice"));
        });
    }

    #[test]
    fn test_board_status_flips_the_turn_each_time() {
        let session = SessionHandle::new();
        session.update(|s| {
            s.username = Some("alice".to_string());
            s.in_game = true;
            s.my_turn = true;
            s.opponent = Some("bob".to_string());
        });

        let board = Board::decode("100000000").unwrap();
        handle_server_message(&ServerMessage::BoardStatus(board), &session);
        assert!(!session.read(|s| s.my_turn));
        handle_server_message(&ServerMessage::BoardStatus(board), &session);
        assert!(session.read(|s| s.my_turn));
    }

    #[test]
    fn test_game_end_returns_to_lobby() {
        let session = SessionHandle::new();
        session.update(|s| {
            s.in_game = true;
            s.my_turn = true;
            s.opponent = Some("bob".to_string());
        });

        handle_server_message(
            &ServerMessage::GameEnd {
                board: Board::decode("111220000").unwrap(),
                outcome: GameOutcome::Win("alice".to_string()),
            },
            &session,
        );

        session.read(|s| {
            assert!(!s.in_game);
            assert!(!s.my_turn);
            assert_eq!(s.opponent, None);
        });
    }
}
