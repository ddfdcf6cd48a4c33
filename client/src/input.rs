//! The interactive command loop.
//!
//! Outside a game the loop prompts for lobby commands and writes the
//! matching request. Inside a game it parks on the session's turn
//! flag — woken by the listener task, never polled — and then prompts
//! for the next placement.

use crate::network::Client;
use shared::protocol::{Mode, Request};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type InputLines = Lines<BufReader<Stdin>>;

enum MoveInput {
    Place(usize, usize),
    Forfeit,
    Quit,
    Invalid,
}

/// Runs until the user quits or the server connection drops.
pub async fn command_loop(mut client: Client) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let session = client.session().clone();

    println!("Commands: LOGIN, REGISTER, ROOMLIST, CREATE, JOIN, PLACE, FORFEIT, QUIT");

    loop {
        if !session.read(|s| s.connected) {
            break;
        }

        if session.read(|s| s.in_game) {
            if !session.wait_my_turn().await {
                continue;
            }
            match prompt_move(&mut lines).await? {
                MoveInput::Place(x, y) => client.send(&Request::Place { x, y }).await?,
                MoveInput::Forfeit => client.send(&Request::Forfeit).await?,
                MoveInput::Quit => break,
                MoveInput::Invalid => {}
            }
            continue;
        }

        let command = prompt(&mut lines, "> ").await?;
        match command.to_ascii_uppercase().as_str() {
            "LOGIN" => {
                let username = prompt(&mut lines, "Enter your username: ").await?;
                let password = prompt(&mut lines, "Enter your password: ").await?;
                session.update(|s| s.username = Some(username.clone()));
                client.send(&Request::Login { username, password }).await?;
            }
            "REGISTER" => {
                let username = prompt(&mut lines, "Enter a new username: ").await?;
                let password = prompt(&mut lines, "Enter a new password: ").await?;
                client.send(&Request::Register { username, password }).await?;
            }
            "ROOMLIST" => {
                let mode = prompt(&mut lines, "Enter mode (PLAYER/VIEWER): ").await?;
                match mode.parse::<Mode>() {
                    Ok(mode) => client.send(&Request::RoomList { mode }).await?,
                    Err(()) => println!("Invalid mode. Use PLAYER or VIEWER."),
                }
            }
            "CREATE" => {
                let name = prompt(&mut lines, "Enter the room name: ").await?;
                client.send(&Request::Create { name }).await?;
            }
            "JOIN" => {
                let name = prompt(&mut lines, "Enter the room name to join: ").await?;
                let mode = prompt(&mut lines, "Enter mode (PLAYER/VIEWER): ").await?;
                // Invalid mode still goes to the server, which answers
                // with the join status code
                client
                    .send(&Request::Join {
                        name,
                        mode: mode.parse().ok(),
                    })
                    .await?;
            }
            "PLACE" => match prompt_move(&mut lines).await? {
                MoveInput::Place(x, y) => client.send(&Request::Place { x, y }).await?,
                MoveInput::Forfeit => client.send(&Request::Forfeit).await?,
                MoveInput::Quit => break,
                MoveInput::Invalid => {}
            },
            "FORFEIT" => client.send(&Request::Forfeit).await?,
            "QUIT" => break,
            "" => {}
            _ => println!("Invalid command. Please try again."),
        }
    }

    println!("Closing connection and exiting...");
    Ok(())
}

/// Prompts for a placement. `FORFEIT` and `QUIT` are accepted in place
/// of a coordinate so a player on turn is never trapped.
async fn prompt_move(lines: &mut InputLines) -> std::io::Result<MoveInput> {
    let x = prompt(lines, "Enter X coordinate (0-2), or FORFEIT: ").await?;
    match x.to_ascii_uppercase().as_str() {
        "FORFEIT" => return Ok(MoveInput::Forfeit),
        "QUIT" => return Ok(MoveInput::Quit),
        _ => {}
    }
    let y = prompt(lines, "Enter Y coordinate (0-2): ").await?;

    match (parse_coord(&x), parse_coord(&y)) {
        (Some(x), Some(y)) => Ok(MoveInput::Place(x, y)),
        _ => {
            println!("Invalid coordinates. Please enter numbers between 0 and 2.");
            Ok(MoveInput::Invalid)
        }
    }
}

fn parse_coord(s: &str) -> Option<usize> {
    s.parse().ok().filter(|&v| v <= 2)
}

/// Prints `text` without a newline and reads one trimmed input line.
/// End of input counts as an empty line.
async fn prompt(lines: &mut InputLines, text: &str) -> std::io::Result<String> {
    print!("{}", text);
    std::io::stdout().flush()?;
    Ok(lines
        .next_line()
        .await?
        .unwrap_or_default()
        .trim()
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_parse_in_range_only() {
        assert_eq!(parse_coord("0"), Some(0));
        assert_eq!(parse_coord("2"), Some(2));
        assert_eq!(parse_coord("3"), None);
        assert_eq!(parse_coord("-1"), None);
        assert_eq!(parse_coord("x"), None);
        assert_eq!(parse_coord(""), None);
    }
}
