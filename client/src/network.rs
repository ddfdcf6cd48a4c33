//! Client-side networking: connection setup, the listener task and
//! request writing.

use crate::session::SessionHandle;
use crate::ui;
use log::debug;
use shared::codec::{frame, LineFramer};
use shared::protocol::{Request, ServerMessage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

const READ_CHUNK: usize = 8192;

/// One live connection to the game server. Writing happens from the
/// input loop through [`Client::send`]; reading happens on a spawned
/// listener task that updates the shared session.
pub struct Client {
    writer: OwnedWriteHalf,
    session: SessionHandle,
}

impl Client {
    /// Connects and spawns the listener task.
    pub async fn connect(host: &str, port: u16) -> std::io::Result<Client> {
        let stream = TcpStream::connect((host, port)).await?;
        println!("Connected to server at {}:{}", host, port);

        let (read_half, writer) = stream.into_split();
        let session = SessionHandle::new();
        tokio::spawn(listen_for_messages(read_half, session.clone()));

        Ok(Client { writer, session })
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Writes one request line to the server.
    pub async fn send(&mut self, request: &Request) -> std::io::Result<()> {
        debug!("Sending {:?}", request);
        self.writer.write_all(frame(request).as_bytes()).await
    }
}

/// Reads server pushes, frames them into lines, and hands each parsed
/// message to the UI (which also updates the shared session). An empty
/// read or a read error both end the session.
async fn listen_for_messages(mut read_half: OwnedReadHalf, session: SessionHandle) {
    let mut framer = LineFramer::new();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        match read_half.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                framer.extend(&buf[..n]);
                while let Some(line) = framer.next_message() {
                    match ServerMessage::parse(&line) {
                        Some(message) => ui::handle_server_message(&message, &session),
                        None => println!("Server says: {}", line),
                    }
                }
            }
            Err(e) => {
                debug!("Read error: {}", e);
                break;
            }
        }
    }
    println!("Server has closed the connection.");
    session.update(|s| {
        s.connected = false;
        s.in_game = false;
    });
}
