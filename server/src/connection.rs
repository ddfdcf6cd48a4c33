//! Connection tracking and authentication state for the game server
//!
//! This module handles the server-side bookkeeping for connected clients:
//! - Connection lifecycle (accept, authenticate, disconnect)
//! - The authentication gate every mutating command passes through
//! - Username binding for the lifetime of a connection
//! - Best-effort outbound delivery that never blocks the event loop
//!
//! Each socket gets exactly one [`Connection`] record carrying all of its
//! per-connection state, created on accept and destroyed on close, so no
//! dangling entries survive a disconnect in separate side tables.

use log::info;
use shared::codec;
use shared::protocol::ServerMessage;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::mpsc::UnboundedSender;

/// Identifier the event loop uses to refer to a live socket. Rooms and
/// games reference connections only through these ids, never by owning
/// the socket.
pub type ConnId = u64;

/// One connected client and everything the server knows about it
#[derive(Debug)]
pub struct Connection {
    /// Unique id assigned by the server on accept
    pub id: ConnId,
    /// Peer address, for logging
    pub addr: SocketAddr,
    /// Channel into this connection's writer task
    outbound: UnboundedSender<String>,
    /// Set once LOGIN succeeds; never revoked except by disconnect
    pub authenticated: bool,
    /// Bound on successful login, for the remainder of the connection
    pub username: Option<String>,
}

impl Connection {
    pub fn new(id: ConnId, addr: SocketAddr, outbound: UnboundedSender<String>) -> Self {
        Self {
            id,
            addr,
            outbound,
            authenticated: false,
            username: None,
        }
    }

    /// Queues one message for this connection. Delivery is best effort:
    /// if the writer task is gone the message is dropped and the
    /// disconnect path will clean up shortly.
    pub fn send(&self, message: &ServerMessage) {
        let _ = self.outbound.send(codec::frame(message));
    }

    /// Marks the connection authenticated and binds its username.
    pub fn authenticate(&mut self, username: &str) {
        self.authenticated = true;
        self.username = Some(username.to_string());
    }
}

/// Owns every live connection record, keyed by connection id
///
/// All access happens from the single event-loop task, so the table
/// needs no locking. Ids are never reused within a server run, which
/// keeps stale references from a closed connection harmless.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    connections: HashMap<ConnId, Connection>,
    next_id: ConnId,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted socket and returns its id.
    pub fn add(&mut self, addr: SocketAddr, outbound: UnboundedSender<String>) -> ConnId {
        let id = self.next_id;
        self.next_id += 1;
        info!("Connection {} accepted from {}", id, addr);
        self.connections.insert(id, Connection::new(id, addr, outbound));
        id
    }

    /// Removes a connection record, returning it if it was present.
    pub fn remove(&mut self, id: ConnId) -> Option<Connection> {
        let removed = self.connections.remove(&id);
        if let Some(conn) = &removed {
            info!("Connection {} from {} closed", conn.id, conn.addr);
        }
        removed
    }

    pub fn get_mut(&mut self, id: ConnId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    /// The gating predicate for CREATE, ROOMLIST, JOIN, PLACE and
    /// FORFEIT. Unknown ids count as unauthenticated.
    pub fn is_authenticated(&self, id: ConnId) -> bool {
        self.connections
            .get(&id)
            .map(|conn| conn.authenticated)
            .unwrap_or(false)
    }

    /// Resolves a connection to the username it logged in with.
    pub fn username(&self, id: ConnId) -> Option<&str> {
        self.connections.get(&id)?.username.as_deref()
    }

    /// Sends to one connection if it is still registered.
    pub fn send(&self, id: ConnId, message: &ServerMessage) {
        if let Some(conn) = self.connections.get(&id) {
            conn.send(message);
        }
    }

    /// Sends the same message to each listed connection.
    pub fn send_to_all(&self, ids: &[ConnId], message: &ServerMessage) {
        for &id in ids {
            self.send(id, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[test]
    fn test_connections_get_distinct_ids() {
        let mut table = ConnectionTable::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let a = table.add(test_addr(), tx.clone());
        let b = table.add(test_addr(), tx);
        assert_ne!(a, b);
    }

    #[test]
    fn test_authentication_binds_username() {
        let mut table = ConnectionTable::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = table.add(test_addr(), tx);

        assert!(!table.is_authenticated(id));
        assert_eq!(table.username(id), None);

        table.get_mut(id).unwrap().authenticate("alice");
        assert!(table.is_authenticated(id));
        assert_eq!(table.username(id), Some("alice"));
    }

    #[test]
    fn test_removed_connection_is_unauthenticated() {
        let mut table = ConnectionTable::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = table.add(test_addr(), tx);
        table.get_mut(id).unwrap().authenticate("alice");

        assert!(table.remove(id).is_some());
        assert!(table.remove(id).is_none());
        assert!(!table.is_authenticated(id));
    }

    #[test]
    fn test_send_frames_with_trailing_newline() {
        let mut table = ConnectionTable::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = table.add(test_addr(), tx);

        table.send(id, &ServerMessage::BadAuth);
        assert_eq!(rx.try_recv().unwrap(), "BADAUTH\n");
    }

    #[test]
    fn test_send_to_dead_writer_is_dropped() {
        let mut table = ConnectionTable::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let id = table.add(test_addr(), tx);
        drop(rx);
        // Must not panic or block
        table.send(id, &ServerMessage::NoRoom);
    }
}
