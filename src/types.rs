use std::fmt;

use serde::{Deserialize, Serialize};

/// A board coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiskColor {
    Black,
    White,
}

impl DiskColor {
    pub fn opponent(self) -> Self {
        match self {
            DiskColor::Black => DiskColor::White,
            DiskColor::White => DiskColor::Black,
        }
    }
}

impl fmt::Display for DiskColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskColor::Black => f.write_str("Black"),
            DiskColor::White => f.write_str("White"),
        }
    }
}

/// Lifecycle of a game. Only moves forward: `NotStarted -> InProgress -> Won | Drawn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    NotStarted,
    InProgress,
    Won,
    Drawn,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Won | Status::Drawn)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::NotStarted => "not started",
            Status::InProgress => "in progress",
            Status::Won => "won",
            Status::Drawn => "drawn",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub color: DiskColor,
}

impl Player {
    pub fn new(name: impl Into<String>, color: DiskColor) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

/// One board square as seen by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellView {
    pub row: u8,
    pub column: u8,
    pub disk_color: Option<DiskColor>,
}

/// Public game state returned from the registry and the WASM APIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub game_id: String,
    pub current_player: String,
    pub current_player_color: DiskColor,
    pub status: Status,
    /// Row-major, one inner `Vec` per row.
    pub board: Vec<Vec<CellView>>,
    /// Legal moves for `current_player`. Empty once the game is over.
    pub valid_moves: Vec<Position>,
    pub black_score: usize,
    pub white_score: usize,
    /// Contract:
    /// - `Some(name)` only when `status` is `Won`.
    /// - `None` while playing and on a draw.
    pub winner: Option<String>,
}
