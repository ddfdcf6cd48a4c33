//! The room registry: every live game room, keyed by name.
//!
//! Rooms are created by CREATE, filled by JOIN and destroyed the moment
//! their game ends, so the registry never lists a finished game. Names
//! are sorted (BTreeMap) to keep ROOMLIST output deterministic.

use crate::connection::ConnId;
use log::info;
use shared::board::{Board, Marker};
use shared::{valid_room_name, MAX_ROOMS};
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;

/// Lifecycle phase of a room. A room in `Waiting` has only its creator
/// seated; the second player's JOIN flips it to `InProgress`. There is
/// no explicit ended phase: a finished room is deleted immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    Waiting,
    InProgress,
}

/// A move submitted out of turn, parked until its submitter holds the
/// turn. FIFO per room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedMove {
    pub submitter: ConnId,
    pub x: usize,
    pub y: usize,
}

/// One game room: two player seats, any number of viewers, the board
/// and the turn pointer.
#[derive(Debug)]
pub struct Room {
    pub name: String,
    pub player1: ConnId,
    pub player1_name: String,
    pub player2: Option<ConnId>,
    pub player2_name: Option<String>,
    pub viewers: Vec<ConnId>,
    pub board: Board,
    /// Which connection may place next. Always one of the two players,
    /// never a viewer.
    pub current_turn: ConnId,
    pub phase: RoomPhase,
    pub(crate) queue: VecDeque<QueuedMove>,
}

impl Room {
    fn new(name: &str, creator: ConnId, creator_name: &str) -> Self {
        Self {
            name: name.to_string(),
            player1: creator,
            player1_name: creator_name.to_string(),
            player2: None,
            player2_name: None,
            viewers: Vec::new(),
            board: Board::new(),
            current_turn: creator,
            phase: RoomPhase::Waiting,
            queue: VecDeque::new(),
        }
    }

    /// True if `id` occupies one of the two player seats.
    pub fn is_player(&self, id: ConnId) -> bool {
        id == self.player1 || self.player2 == Some(id)
    }

    /// The marker a seated player places with. Player one is the room
    /// creator and always holds `Marker::P1`.
    pub fn marker_of(&self, id: ConnId) -> Marker {
        if id == self.player1 {
            Marker::P1
        } else {
            Marker::P2
        }
    }

    /// The other seated player, if both seats are taken.
    pub fn opponent_of(&self, id: ConnId) -> Option<ConnId> {
        if id == self.player1 {
            self.player2
        } else {
            Some(self.player1)
        }
    }

    /// Display name for a seated player.
    pub fn player_name(&self, id: ConnId) -> &str {
        if id == self.player1 {
            &self.player1_name
        } else {
            self.player2_name.as_deref().unwrap_or("")
        }
    }

    /// Seats the second player and starts the game: the room goes
    /// in-progress and the turn pointer lands on player one.
    pub fn seat_player2(&mut self, id: ConnId, username: &str) {
        self.player2 = Some(id);
        self.player2_name = Some(username.to_string());
        self.phase = RoomPhase::InProgress;
        self.current_turn = self.player1;
    }

    pub fn add_viewer(&mut self, id: ConnId) {
        self.viewers.push(id);
    }

    /// Every connection that receives board and game-end broadcasts:
    /// both players plus all viewers.
    pub fn participants(&self) -> Vec<ConnId> {
        let mut ids = vec![self.player1];
        ids.extend(self.player2);
        ids.extend(&self.viewers);
        ids
    }
}

/// Why a CREATE was refused. Wire codes 1, 2 and 3; checks run in
/// exactly this order so the response codes stay deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CreateError {
    #[error("invalid room name")]
    InvalidName,
    #[error("room already exists")]
    AlreadyExists,
    #[error("room limit reached")]
    LimitReached,
}

impl CreateError {
    pub fn code(self) -> u8 {
        match self {
            CreateError::InvalidName => 1,
            CreateError::AlreadyExists => 2,
            CreateError::LimitReached => 3,
        }
    }
}

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: BTreeMap<String, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a room with `creator` seated as player one. Validation
    /// order: name, existence, capacity.
    pub fn create(
        &mut self,
        name: &str,
        creator: ConnId,
        creator_name: &str,
    ) -> Result<(), CreateError> {
        if !valid_room_name(name) {
            return Err(CreateError::InvalidName);
        }
        if self.rooms.contains_key(name) {
            return Err(CreateError::AlreadyExists);
        }
        if self.rooms.len() >= MAX_ROOMS {
            return Err(CreateError::LimitReached);
        }
        self.rooms
            .insert(name.to_string(), Room::new(name, creator, creator_name));
        info!("Room '{}' created by '{}'", name, creator_name);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rooms.contains_key(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Room> {
        self.rooms.get_mut(name)
    }

    /// Resolves the room a connection is seated in as a player, so
    /// PLACE and FORFEIT need not name it. Viewers never resolve.
    pub fn room_for_player(&self, id: ConnId) -> Option<String> {
        self.rooms
            .values()
            .find(|room| room.is_player(id))
            .map(|room| room.name.clone())
    }

    /// Removes a room. Idempotent: deleting an absent room is a no-op.
    pub fn delete(&mut self, name: &str) {
        if self.rooms.remove(name).is_some() {
            info!("Room '{}' deleted", name);
        }
    }

    /// Drops `id` from every viewer list it appears in.
    pub fn remove_viewer(&mut self, id: ConnId) {
        for room in self.rooms.values_mut() {
            room.viewers.retain(|&viewer| viewer != id);
        }
    }

    /// Room names with an open player seat, for ROOMLIST as PLAYER.
    pub fn names_with_open_seat(&self) -> Vec<String> {
        self.rooms
            .values()
            .filter(|room| room.player2.is_none())
            .map(|room| room.name.clone())
            .collect()
    }

    /// All room names, for ROOMLIST as VIEWER.
    pub fn all_names(&self) -> Vec<String> {
        self.rooms.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_validation_order() {
        let mut registry = RoomRegistry::new();

        // Invalid name wins over everything else
        assert_eq!(
            registry.create("bad:name", 1, "alice"),
            Err(CreateError::InvalidName)
        );

        registry.create("R1", 1, "alice").unwrap();
        assert_eq!(
            registry.create("R1", 2, "bob"),
            Err(CreateError::AlreadyExists)
        );
    }

    #[test]
    fn test_room_cap_rejects_creation_past_limit() {
        let mut registry = RoomRegistry::new();
        for i in 0..MAX_ROOMS {
            registry.create(&format!("room{}", i), 1, "alice").unwrap();
        }
        assert_eq!(
            registry.create("one more", 1, "alice"),
            Err(CreateError::LimitReached)
        );
        // Existence still checked before capacity
        assert_eq!(
            registry.create("room0", 1, "alice"),
            Err(CreateError::AlreadyExists)
        );
    }

    #[test]
    fn test_creator_is_seated_as_player1_with_first_turn() {
        let mut registry = RoomRegistry::new();
        registry.create("R1", 7, "alice").unwrap();
        let room = registry.get_mut("R1").unwrap();
        assert_eq!(room.player1, 7);
        assert_eq!(room.player1_name, "alice");
        assert_eq!(room.current_turn, 7);
        assert_eq!(room.phase, RoomPhase::Waiting);
        assert_eq!(room.board, Board::new());
    }

    #[test]
    fn test_seating_second_player_starts_the_game() {
        let mut registry = RoomRegistry::new();
        registry.create("R1", 1, "alice").unwrap();
        let room = registry.get_mut("R1").unwrap();
        room.seat_player2(2, "bob");
        assert_eq!(room.phase, RoomPhase::InProgress);
        assert_eq!(room.current_turn, 1);
        assert_eq!(room.marker_of(1), Marker::P1);
        assert_eq!(room.marker_of(2), Marker::P2);
        assert_eq!(room.opponent_of(1), Some(2));
        assert_eq!(room.opponent_of(2), Some(1));
    }

    #[test]
    fn test_room_resolution_is_for_players_only() {
        let mut registry = RoomRegistry::new();
        registry.create("R1", 1, "alice").unwrap();
        registry.get_mut("R1").unwrap().add_viewer(9);

        assert_eq!(registry.room_for_player(1), Some("R1".to_string()));
        assert_eq!(registry.room_for_player(9), None);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut registry = RoomRegistry::new();
        registry.create("R1", 1, "alice").unwrap();
        registry.delete("R1");
        registry.delete("R1");
        registry.delete("never existed");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_roomlist_filters_by_mode() {
        let mut registry = RoomRegistry::new();
        registry.create("full", 1, "alice").unwrap();
        registry.get_mut("full").unwrap().seat_player2(2, "bob");
        registry.create("open", 3, "carol").unwrap();

        assert_eq!(registry.names_with_open_seat(), vec!["open".to_string()]);
        assert_eq!(
            registry.all_names(),
            vec!["full".to_string(), "open".to_string()]
        );
    }

    #[test]
    fn test_remove_viewer_clears_every_room() {
        let mut registry = RoomRegistry::new();
        registry.create("R1", 1, "alice").unwrap();
        registry.create("R2", 2, "bob").unwrap();
        registry.get_mut("R1").unwrap().add_viewer(9);
        registry.get_mut("R2").unwrap().add_viewer(9);

        registry.remove_viewer(9);
        assert!(registry.get_mut("R1").unwrap().viewers.is_empty());
        assert!(registry.get_mut("R2").unwrap().viewers.is_empty());
    }
}
