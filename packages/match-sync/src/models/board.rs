use serde::{Deserialize, Serialize};

pub const ROWS: usize = 6;
pub const COLS: usize = 7;

/// Disc colour. Slot A of a match always plays `Red`, slot B always `Yellow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    Red,
    Yellow,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::Red => Player::Yellow,
            Player::Yellow => Player::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Disc(Player),
}

impl Cell {
    /// Decodes the backend's integer encoding (0 = empty, 1 = red, 2 = yellow).
    /// `None` means the value is outside the encoding.
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(Cell::Empty),
            1 => Some(Cell::Disc(Player::Red)),
            2 => Some(Cell::Disc(Player::Yellow)),
            _ => None,
        }
    }

    pub fn to_raw(self) -> i64 {
        match self {
            Cell::Empty => 0,
            Cell::Disc(Player::Red) => 1,
            Cell::Disc(Player::Yellow) => 2,
        }
    }

    pub fn player(self) -> Option<Player> {
        match self {
            Cell::Empty => None,
            Cell::Disc(player) => Some(player),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

/// Fixed 6x7 grid, row 0 at the top.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Board {
    cells: [[Cell; COLS]; ROWS],
}

impl Board {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, row: usize, column: usize) -> Cell {
        self.cells[row][column]
    }

    pub fn set(&mut self, row: usize, column: usize, cell: Cell) {
        self.cells[row][column] = cell;
    }

    pub fn rows(&self) -> &[[Cell; COLS]; ROWS] {
        &self.cells
    }

    /// Row a disc dropped into `column` would land in.
    pub fn landing_row(&self, column: usize) -> Option<usize> {
        (0..ROWS).rev().find(|&row| self.cells[row][column].is_empty())
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(|cell| !cell.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().flatten().all(|cell| cell.is_empty())
    }

    pub fn to_raw(&self) -> Vec<Vec<i64>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_raw()).collect())
            .collect()
    }
}
