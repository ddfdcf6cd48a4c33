//! The 3x3 game board and its terminal-state checks.
//!
//! The board travels on the wire as a 9-character row-major string:
//! `0` for an empty cell, `1` for player one's marker, `2` for player
//! two's marker. Both server and client use the same encode/decode so
//! the representation round-trips losslessly.

/// A player's marker. `P1` belongs to the room creator and always
/// moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    P1,
    P2,
}

impl Marker {
    /// The opposing marker.
    pub fn other(self) -> Marker {
        match self {
            Marker::P1 => Marker::P2,
            Marker::P2 => Marker::P1,
        }
    }

    fn digit(self) -> char {
        match self {
            Marker::P1 => '1',
            Marker::P2 => '2',
        }
    }
}

/// The 8 winning lines: 3 rows, 3 columns, 2 diagonals.
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// A 3x3 grid of cells, stored row-major. `(x, y)` addresses column
/// `x` of row `y`, both in `0..3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Board {
    cells: [Option<Marker>; 9],
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the marker at `(x, y)`, or `None` for an empty or
    /// out-of-range cell.
    pub fn get(&self, x: usize, y: usize) -> Option<Marker> {
        if x > 2 || y > 2 {
            return None;
        }
        self.cells[y * 3 + x]
    }

    /// Places `marker` at `(x, y)`. Returns false without touching the
    /// grid if the cell is occupied or out of range; a successful call
    /// mutates exactly one cell.
    pub fn place(&mut self, x: usize, y: usize, marker: Marker) -> bool {
        if x > 2 || y > 2 {
            return false;
        }
        let cell = &mut self.cells[y * 3 + x];
        if cell.is_some() {
            return false;
        }
        *cell = Some(marker);
        true
    }

    /// True if any of the 8 lines is held entirely by `marker`.
    pub fn has_won(&self, marker: Marker) -> bool {
        LINES
            .iter()
            .any(|line| line.iter().all(|&i| self.cells[i] == Some(marker)))
    }

    /// True if no empty cell remains. A full board with no winning
    /// line is a draw.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| cell.is_some())
    }

    /// Encodes the board as the 9-character wire string.
    pub fn encode(&self) -> String {
        self.cells
            .iter()
            .map(|cell| match cell {
                None => '0',
                Some(marker) => marker.digit(),
            })
            .collect()
    }

    /// Decodes a 9-character wire string back into a board. Returns
    /// `None` on wrong length or foreign characters.
    pub fn decode(s: &str) -> Option<Board> {
        if s.len() != 9 {
            return None;
        }
        let mut cells = [None; 9];
        for (i, c) in s.chars().enumerate() {
            cells[i] = match c {
                '0' => None,
                '1' => Some(Marker::P1),
                '2' => Some(Marker::P2),
                _ => return None,
            };
        }
        Some(Board { cells })
    }
}
