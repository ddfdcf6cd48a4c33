//! The per-room game state machine: move validation, win and draw
//! detection, and the out-of-turn move queue.
//!
//! Placement returns a [`PlaceOutcome`] instead of doing any I/O; the
//! network layer turns outcomes into acknowledgements and broadcasts.
//! Queued moves are drained through an iterative work list in the
//! network layer, never by recursive re-entry, so a long idle-then-
//! flush sequence cannot blow the stack.

use crate::connection::ConnId;
use crate::rooms::{QueuedMove, Room, RoomPhase};
use shared::board::Board;

/// What happened to one submitted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    /// Not the submitter's turn (or the game has not started yet);
    /// the move is parked, not discarded.
    Queued,
    /// Target cell already holds a marker. The turn does not pass.
    Occupied,
    /// Marker placed, game continues; the turn has flipped. Carries
    /// the board to broadcast.
    Placed(Board),
    /// Marker placed and the mover completed a line. The board is
    /// terminal and the room should be torn down.
    Won(Board),
    /// Marker placed and the grid filled with no line. Terminal.
    Draw(Board),
}

impl Room {
    /// Applies one move by `conn`, which must be a seated player.
    ///
    /// Moves arriving before the second player joins count as
    /// out-of-turn and queue up; they drain when the game begins.
    pub fn place(&mut self, conn: ConnId, x: usize, y: usize) -> PlaceOutcome {
        if self.phase != RoomPhase::InProgress || conn != self.current_turn {
            self.queue.push_back(QueuedMove { submitter: conn, x, y });
            return PlaceOutcome::Queued;
        }

        let marker = self.marker_of(conn);
        if !self.board.place(x, y, marker) {
            return PlaceOutcome::Occupied;
        }

        if self.board.has_won(marker) {
            return PlaceOutcome::Won(self.board);
        }
        if self.board.is_full() {
            return PlaceOutcome::Draw(self.board);
        }

        // opponent_of is always Some once the game is in progress
        if let Some(next) = self.opponent_of(conn) {
            self.current_turn = next;
        }
        PlaceOutcome::Placed(self.board)
    }

    /// Pops the queue head if its submitter now holds the turn. The
    /// drain loop calls this after every successful placement until it
    /// returns `None`.
    pub fn pop_ready_move(&mut self) -> Option<QueuedMove> {
        if self.phase != RoomPhase::InProgress {
            return None;
        }
        if self.queue.front()?.submitter != self.current_turn {
            return None;
        }
        self.queue.pop_front()
    }

    /// Resolves a forfeit by `conn`: the opponent is the winner.
    /// Returns `None` while the room is still waiting for a second
    /// player, in which case there is nobody to declare and the room
    /// is simply torn down.
    pub fn forfeit_winner(&self, conn: ConnId) -> Option<String> {
        if self.phase != RoomPhase::InProgress {
            return None;
        }
        let winner = self.opponent_of(conn)?;
        Some(self.player_name(winner).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::RoomRegistry;

    const ALICE: ConnId = 1;
    const BOB: ConnId = 2;

    fn in_progress_room(registry: &mut RoomRegistry) -> &mut Room {
        registry.create("R1", ALICE, "alice").unwrap();
        let room = registry.get_mut("R1").unwrap();
        room.seat_player2(BOB, "bob");
        room
    }

    #[test]
    fn test_accepted_move_flips_the_turn() {
        let mut registry = RoomRegistry::new();
        let room = in_progress_room(&mut registry);

        match room.place(ALICE, 0, 0) {
            PlaceOutcome::Placed(board) => assert_eq!(board.encode(), "100000000"),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(room.current_turn, BOB);
    }

    #[test]
    fn test_turn_alternates_strictly_across_a_game() {
        let mut registry = RoomRegistry::new();
        let room = in_progress_room(&mut registry);

        let moves = [(ALICE, 0, 0), (BOB, 1, 1), (ALICE, 2, 2), (BOB, 0, 1)];
        for (mover, x, y) in moves {
            assert_eq!(room.current_turn, mover);
            assert!(matches!(room.place(mover, x, y), PlaceOutcome::Placed(_)));
        }
    }

    #[test]
    fn test_occupied_cell_does_not_pass_the_turn() {
        let mut registry = RoomRegistry::new();
        let room = in_progress_room(&mut registry);

        assert!(matches!(room.place(ALICE, 0, 0), PlaceOutcome::Placed(_)));
        assert_eq!(room.place(BOB, 0, 0), PlaceOutcome::Occupied);
        assert_eq!(room.current_turn, BOB);
        assert_eq!(room.board.encode(), "100000000");
    }

    #[test]
    fn test_out_of_turn_moves_queue_in_fifo_order() {
        let mut registry = RoomRegistry::new();
        let room = in_progress_room(&mut registry);

        assert_eq!(room.place(BOB, 1, 1), PlaceOutcome::Queued);
        assert_eq!(room.place(BOB, 2, 2), PlaceOutcome::Queued);
        assert_eq!(room.pop_ready_move(), None);

        assert!(matches!(room.place(ALICE, 0, 0), PlaceOutcome::Placed(_)));
        assert_eq!(
            room.pop_ready_move(),
            Some(QueuedMove { submitter: BOB, x: 1, y: 1 })
        );
        assert!(matches!(room.place(BOB, 1, 1), PlaceOutcome::Placed(_)));

        // Replaying the first move passed the turn back, so the second
        // queued move is not ready until it comes around again
        assert_eq!(room.pop_ready_move(), None);
        assert!(matches!(room.place(ALICE, 0, 1), PlaceOutcome::Placed(_)));
        assert_eq!(
            room.pop_ready_move(),
            Some(QueuedMove { submitter: BOB, x: 2, y: 2 })
        );
    }

    #[test]
    fn test_moves_before_game_start_queue_and_drain_later() {
        let mut registry = RoomRegistry::new();
        registry.create("R1", ALICE, "alice").unwrap();
        let room = registry.get_mut("R1").unwrap();

        assert_eq!(room.place(ALICE, 0, 0), PlaceOutcome::Queued);
        assert_eq!(room.pop_ready_move(), None, "waiting room never drains");

        room.seat_player2(BOB, "bob");
        assert_eq!(
            room.pop_ready_move(),
            Some(QueuedMove { submitter: ALICE, x: 0, y: 0 })
        );
    }

    #[test]
    fn test_completing_a_line_wins() {
        let mut registry = RoomRegistry::new();
        let room = in_progress_room(&mut registry);

        assert!(matches!(room.place(ALICE, 0, 0), PlaceOutcome::Placed(_)));
        assert!(matches!(room.place(BOB, 0, 1), PlaceOutcome::Placed(_)));
        assert!(matches!(room.place(ALICE, 1, 0), PlaceOutcome::Placed(_)));
        assert!(matches!(room.place(BOB, 1, 1), PlaceOutcome::Placed(_)));
        match room.place(ALICE, 2, 0) {
            PlaceOutcome::Won(board) => assert_eq!(board.encode(), "111220000"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_filling_the_grid_without_a_line_draws() {
        let mut registry = RoomRegistry::new();
        let room = in_progress_room(&mut registry);

        // X O X / X O O / O X X filled so the last move completes no line
        let moves = [
            (ALICE, 0, 0),
            (BOB, 1, 0),
            (ALICE, 2, 0),
            (BOB, 1, 1),
            (ALICE, 0, 1),
            (BOB, 2, 1),
            (ALICE, 1, 2),
            (BOB, 0, 2),
        ];
        for (mover, x, y) in moves {
            assert!(matches!(room.place(mover, x, y), PlaceOutcome::Placed(_)));
        }
        match room.place(ALICE, 2, 2) {
            PlaceOutcome::Draw(board) => assert_eq!(board.encode(), "121122211"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_forfeit_declares_the_opponent_winner() {
        let mut registry = RoomRegistry::new();
        let room = in_progress_room(&mut registry);
        assert_eq!(room.forfeit_winner(ALICE), Some("bob".to_string()));
        assert_eq!(room.forfeit_winner(BOB), Some("alice".to_string()));
    }

    #[test]
    fn test_forfeit_in_waiting_room_has_no_winner() {
        let mut registry = RoomRegistry::new();
        registry.create("R1", ALICE, "alice").unwrap();
        let room = registry.get_mut("R1").unwrap();
        assert_eq!(room.forfeit_winner(ALICE), None);
    }
}
