//! The server's connection multiplexer and command dispatch.
//!
//! Each accepted socket gets a small I/O task pair: a reader that frames
//! inbound bytes into lines and a writer that drains the connection's
//! outbound queue. Every framed line funnels through one mpsc channel
//! into [`Server::run`], which owns all mutable state (connections,
//! rooms, users) and handles events to completion one at a time. That
//! single-owner loop is what makes the registry and credential state
//! safe without locks: messages from one connection are processed in
//! arrival order, and no handler ever blocks on I/O.

use crate::connection::{ConnId, ConnectionTable};
use crate::rooms::RoomRegistry;
use crate::users::{RegisterOutcome, UserStore};
use log::{debug, error, info, warn};
use shared::codec::LineFramer;
use shared::protocol::{GameOutcome, Mode, Request, ServerMessage};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;

const READ_CHUNK: usize = 8192;

/// Events flowing from the per-connection reader tasks into the main
/// server loop.
#[derive(Debug)]
enum ServerEvent {
    Message { conn: ConnId, line: String },
    Disconnected { conn: ConnId },
}

/// The game server: listener plus all process-wide state. All fields
/// are owned by the event loop; nothing here is shared across tasks.
pub struct Server {
    listener: TcpListener,
    connections: ConnectionTable,
    rooms: RoomRegistry,
    users: UserStore,
    events_tx: mpsc::UnboundedSender<ServerEvent>,
    events_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    /// Binds the listening socket. The user store is loaded by the
    /// caller so startup errors surface before we start accepting.
    pub async fn bind<A: ToSocketAddrs>(addr: A, users: UserStore) -> std::io::Result<Server> {
        let listener = TcpListener::bind(addr).await?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Ok(Server {
            listener,
            connections: ConnectionTable::new(),
            rooms: RoomRegistry::new(),
            users,
            events_tx,
            events_rx,
        })
    }

    /// The address actually bound, useful when listening on port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept-and-dispatch loop forever.
    pub async fn run(mut self) -> std::io::Result<()> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.accept(stream, addr),
                    Err(e) => warn!("Failed to accept connection: {}", e),
                },
                Some(event) = self.events_rx.recv() => match event {
                    ServerEvent::Message { conn, line } => self.dispatch(conn, &line),
                    ServerEvent::Disconnected { conn } => self.disconnect(conn),
                },
            }
        }
    }

    fn accept(&mut self, stream: TcpStream, addr: SocketAddr) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let id = self.connections.add(addr, outbound_tx);
        let events = self.events_tx.clone();
        let (read_half, write_half) = stream.into_split();
        tokio::spawn(write_outbound(id, write_half, outbound_rx));
        tokio::spawn(read_inbound(id, read_half, events));
    }

    /// Parses and executes one inbound line. Runs to completion before
    /// the loop picks up the next event.
    fn dispatch(&mut self, conn: ConnId, line: &str) {
        debug!("Connection {} sent {:?}", conn, line);
        let request = match Request::parse(line) {
            Ok(request) => request,
            Err(e) => {
                debug!("Connection {}: {}", conn, e);
                if let Some(ack) = e.ack() {
                    self.connections.send(conn, &ack);
                }
                return;
            }
        };

        if request.requires_auth() && !self.connections.is_authenticated(conn) {
            self.connections.send(conn, &ServerMessage::BadAuth);
            return;
        }

        match request {
            Request::Login { username, password } => self.handle_login(conn, &username, &password),
            Request::Register { username, password } => {
                self.handle_register(conn, &username, &password)
            }
            Request::RoomList { mode } => self.handle_roomlist(conn, mode),
            Request::Create { name } => self.handle_create(conn, &name),
            Request::Join { name, mode } => self.handle_join(conn, &name, mode),
            Request::Place { x, y } => self.handle_place(conn, x, y),
            Request::Forfeit => self.handle_forfeit(conn),
        }
    }

    fn handle_login(&mut self, conn: ConnId, username: &str, password: &str) {
        let outcome = self.users.verify(username, password);
        if outcome == crate::users::LoginOutcome::Ok {
            if let Some(record) = self.connections.get_mut(conn) {
                record.authenticate(username);
            }
            info!("Connection {} logged in as '{}'", conn, username);
        }
        self.connections
            .send(conn, &ServerMessage::LoginAck(outcome.code()));
    }

    fn handle_register(&mut self, conn: ConnId, username: &str, password: &str) {
        match self.users.register(username, password) {
            Ok(RegisterOutcome::Ok) => self.connections.send(conn, &ServerMessage::RegisterAck(0)),
            Ok(RegisterOutcome::UsernameTaken) => {
                self.connections.send(conn, &ServerMessage::RegisterAck(1))
            }
            // A hashing failure must still answer, or the client waits
            // forever on the acknowledgement
            Err(e) => {
                error!("Registration of '{}' failed: {}", username, e);
                self.connections.send(conn, &ServerMessage::RegisterAck(2));
            }
        }
    }

    fn handle_roomlist(&mut self, conn: ConnId, mode: Mode) {
        let rooms = match mode {
            Mode::Player => self.rooms.names_with_open_seat(),
            Mode::Viewer => self.rooms.all_names(),
        };
        let message = ServerMessage::RoomListOk {
            label: format!("Rooms available to join as {}", mode),
            rooms,
        };
        self.connections.send(conn, &message);
    }

    fn handle_create(&mut self, conn: ConnId, name: &str) {
        let creator_name = self.connections.username(conn).unwrap_or("").to_string();
        let ack = match self.rooms.create(name, conn, &creator_name) {
            Ok(()) => ServerMessage::CreateAck(0),
            Err(e) => ServerMessage::CreateAck(e.code()),
        };
        self.connections.send(conn, &ack);
    }

    fn handle_join(&mut self, conn: ConnId, name: &str, mode: Option<Mode>) {
        // Room lookup answers before mode validation, so a bad mode on
        // a missing room reports "not found"
        if !self.rooms.contains(name) {
            self.connections.send(conn, &ServerMessage::JoinAck(1));
            return;
        }
        let Some(mode) = mode else {
            self.connections.send(conn, &ServerMessage::JoinAck(3));
            return;
        };

        match mode {
            Mode::Player => self.join_as_player(conn, name),
            Mode::Viewer => self.join_as_viewer(conn, name),
        }
    }

    fn join_as_player(&mut self, conn: ConnId, name: &str) {
        let username = self.connections.username(conn).unwrap_or("").to_string();
        let Some(room) = self.rooms.get_mut(name) else {
            return;
        };
        if room.player2.is_some() {
            self.connections.send(conn, &ServerMessage::JoinAck(2));
            return;
        }

        room.seat_player2(conn, &username);
        let player1_name = room.player1_name.clone();
        let players = [room.player1, conn];
        let viewers = room.viewers.clone();
        let begin = ServerMessage::Begin {
            player1: player1_name.clone(),
            player2: username.clone(),
        };
        let in_progress = ServerMessage::InProgress {
            player1: player1_name,
            player2: username,
        };

        self.connections.send(conn, &ServerMessage::JoinAck(0));
        self.connections.send_to_all(&players, &begin);
        self.connections.send_to_all(&viewers, &in_progress);
        info!("Game started in room '{}'", name);

        // Anything the creator queued while waiting becomes playable now
        self.run_moves(name, None);
    }

    fn join_as_viewer(&mut self, conn: ConnId, name: &str) {
        let Some(room) = self.rooms.get_mut(name) else {
            return;
        };
        room.add_viewer(conn);
        let snapshot = ServerMessage::InProgress {
            player1: room.player1_name.clone(),
            player2: room
                .player2_name
                .clone()
                .unwrap_or_else(|| "Waiting for player 2".to_string()),
        };
        self.connections.send(conn, &ServerMessage::JoinAck(0));
        self.connections.send(conn, &snapshot);
    }

    fn handle_place(&mut self, conn: ConnId, x: usize, y: usize) {
        let Some(name) = self.rooms.room_for_player(conn) else {
            self.connections.send(conn, &ServerMessage::NoRoom);
            return;
        };
        self.run_moves(&name, Some((conn, x, y)));
    }

    /// Applies `first` (if any) and then drains the room's move queue
    /// with an explicit work list: as long as the queue head belongs to
    /// the player on turn, it is popped and replayed. Terminal boards
    /// broadcast GAMEEND and tear the room down, which also discards
    /// whatever was left in the queue.
    fn run_moves(&mut self, name: &str, first: Option<(ConnId, usize, usize)>) {
        use crate::game::PlaceOutcome;

        let mut next = first;
        loop {
            let (conn, x, y) = match next.take() {
                Some(mv) => mv,
                None => match self.rooms.get_mut(name).and_then(|r| r.pop_ready_move()) {
                    Some(queued) => (queued.submitter, queued.x, queued.y),
                    None => return,
                },
            };
            let Some(room) = self.rooms.get_mut(name) else {
                return;
            };

            match room.place(conn, x, y) {
                PlaceOutcome::Queued => {
                    self.connections.send(conn, &ServerMessage::PlaceAck(3));
                }
                PlaceOutcome::Occupied => {
                    self.connections.send(conn, &ServerMessage::PlaceAck(2));
                }
                PlaceOutcome::Placed(board) => {
                    let recipients = room.participants();
                    self.connections
                        .send_to_all(&recipients, &ServerMessage::BoardStatus(board));
                }
                PlaceOutcome::Won(board) => {
                    let winner = room.player_name(conn).to_string();
                    let recipients = room.participants();
                    info!("Room '{}': '{}' wins", name, winner);
                    self.connections.send_to_all(
                        &recipients,
                        &ServerMessage::GameEnd {
                            board,
                            outcome: GameOutcome::Win(winner),
                        },
                    );
                    self.rooms.delete(name);
                    return;
                }
                PlaceOutcome::Draw(board) => {
                    let recipients = room.participants();
                    info!("Room '{}': draw", name);
                    self.connections.send_to_all(
                        &recipients,
                        &ServerMessage::GameEnd {
                            board,
                            outcome: GameOutcome::Draw,
                        },
                    );
                    self.rooms.delete(name);
                    return;
                }
            }
        }
    }

    fn handle_forfeit(&mut self, conn: ConnId) {
        let Some(name) = self.rooms.room_for_player(conn) else {
            self.connections.send(conn, &ServerMessage::NoRoom);
            return;
        };
        self.finish_by_forfeit(&name, conn);
    }

    /// Ends the game in `name` with `forfeiter` losing, then removes
    /// the room. A room still waiting for its second player has nobody
    /// to declare winner and is torn down silently.
    fn finish_by_forfeit(&mut self, name: &str, forfeiter: ConnId) {
        let Some(room) = self.rooms.get_mut(name) else {
            return;
        };
        if let Some(winner) = room.forfeit_winner(forfeiter) {
            let notice = ServerMessage::ForfeitNotice {
                player: room.player_name(forfeiter).to_string(),
            };
            let board = room.board;
            let recipients = room.participants();
            info!("Room '{}': forfeit, '{}' wins", name, winner);
            self.connections.send_to_all(&recipients, &notice);
            self.connections.send_to_all(
                &recipients,
                &ServerMessage::GameEnd {
                    board,
                    outcome: GameOutcome::Forfeit(winner),
                },
            );
        }
        self.rooms.delete(name);
    }

    /// Uniform cleanup for orderly and abrupt closes: forfeit if the
    /// connection was seated as a player, drop it from viewer lists,
    /// then release the record.
    fn disconnect(&mut self, conn: ConnId) {
        if let Some(name) = self.rooms.room_for_player(conn) {
            self.finish_by_forfeit(&name, conn);
        }
        self.rooms.remove_viewer(conn);
        self.connections.remove(conn);
    }
}

/// Reads bounded chunks from the socket, frames them into lines and
/// forwards each to the event loop. An empty read is an orderly close;
/// a read error is an abrupt one. Both end in the same Disconnected
/// event.
async fn read_inbound(
    id: ConnId,
    mut read_half: OwnedReadHalf,
    events: mpsc::UnboundedSender<ServerEvent>,
) {
    let mut framer = LineFramer::new();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        match read_half.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                framer.extend(&buf[..n]);
                while let Some(line) = framer.next_message() {
                    if events.send(ServerEvent::Message { conn: id, line }).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                debug!("Read error on connection {}: {}", id, e);
                break;
            }
        }
    }
    let _ = events.send(ServerEvent::Disconnected { conn: id });
}

/// Drains the connection's outbound queue onto the socket. Exits when
/// the queue closes (connection removed) or the peer stops reading.
async fn write_outbound(
    id: ConnId,
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    while let Some(line) = outbound.recv().await {
        if let Err(e) = write_half.write_all(line.as_bytes()).await {
            debug!("Write error on connection {}: {}", id, e);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("ttt-network-users-{}.json", std::process::id()))
    }

    #[tokio::test]
    async fn test_register_hash_failure_still_answers_the_client() {
        // An illegal bcrypt cost makes every hash attempt fail, which
        // is the only way to reach the register error branch
        let users = UserStore::load_with_cost(&temp_store_path(), 99).unwrap();
        let mut server = Server::bind("127.0.0.1:0", users).await.unwrap();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        let conn = server.connections.add(addr, outbound_tx);

        server.dispatch(conn, "REGISTER:alice:pw1");
        assert_eq!(outbound_rx.try_recv().unwrap(), "REGISTER:ACKSTATUS:2\n");
    }
}
