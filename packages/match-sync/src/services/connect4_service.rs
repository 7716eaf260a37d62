use crate::{
    models::{
        board::{Board, Cell, Player, COLS, ROWS},
        match_view::DisplayStatus,
    },
    services::errors::connect4_service_errors::Connect4Error,
};

const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Result of dropping one disc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub board: Board,
    pub row: usize,
    pub column: usize,
    /// Cells of the four-or-more line through the placed disc, if any.
    pub winning_line: Option<Vec<(usize, usize)>>,
    pub is_draw: bool,
}

/// Pure rules for local play. The online game never consults it: there the
/// server decides.
#[derive(Debug, Clone, Copy, Default)]
pub struct Connect4Service;

impl Connect4Service {
    pub fn new() -> Self {
        Connect4Service
    }

    pub fn play_column(
        &self,
        board: &Board,
        column: usize,
        player: Player,
    ) -> Result<MoveOutcome, Connect4Error> {
        if column >= COLS {
            return Err(Connect4Error::ColumnOutOfRange(column));
        }
        let row = board
            .landing_row(column)
            .ok_or(Connect4Error::ColumnFull(column))?;

        let mut next = board.clone();
        next.set(row, column, Cell::Disc(player));

        let winning_line = self.winning_line(&next, row, column);
        let is_draw = winning_line.is_none() && next.is_full();

        Ok(MoveOutcome {
            board: next,
            row,
            column,
            winning_line,
            is_draw,
        })
    }

    /// Longest run through (`row`, `column`) if it reaches four.
    pub fn winning_line(
        &self,
        board: &Board,
        row: usize,
        column: usize,
    ) -> Option<Vec<(usize, usize)>> {
        let player = board.get(row, column).player()?;

        for (dr, dc) in DIRECTIONS {
            let mut line = walk(board, player, row, column, -dr, -dc);
            line.reverse();
            line.push((row, column));
            line.extend(walk(board, player, row, column, dr, dc));

            if line.len() >= 4 {
                return Some(line);
            }
        }
        None
    }
}

/// Consecutive cells owned by `player`, stepping away from the origin.
fn walk(
    board: &Board,
    player: Player,
    row: usize,
    column: usize,
    dr: isize,
    dc: isize,
) -> Vec<(usize, usize)> {
    let mut cells = Vec::new();
    let (mut r, mut c) = (row as isize + dr, column as isize + dc);

    while (0..ROWS as isize).contains(&r) && (0..COLS as isize).contains(&c) {
        if board.get(r as usize, c as usize) != Cell::Disc(player) {
            break;
        }
        cells.push((r as usize, c as usize));
        r += dr;
        c += dc;
    }
    cells
}

/// Hot-seat game on one device. Red moves first.
#[derive(Debug, Clone)]
pub struct LocalGame {
    engine: Connect4Service,
    board: Board,
    current_player: Player,
    status: DisplayStatus,
    winner: Option<Player>,
    winning_cells: Vec<(usize, usize)>,
}

impl Default for LocalGame {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalGame {
    pub fn new() -> Self {
        LocalGame {
            engine: Connect4Service::new(),
            board: Board::empty(),
            current_player: Player::Red,
            status: DisplayStatus::Playing,
            winner: None,
            winning_cells: Vec::new(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn status(&self) -> DisplayStatus {
        self.status
    }

    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    pub fn winning_cells(&self) -> &[(usize, usize)] {
        &self.winning_cells
    }

    pub fn play_column(&mut self, column: usize) -> Result<MoveOutcome, Connect4Error> {
        if self.status.is_over() {
            return Err(Connect4Error::GameOver);
        }

        let outcome = self
            .engine
            .play_column(&self.board, column, self.current_player)?;
        self.board = outcome.board.clone();

        if let Some(line) = &outcome.winning_line {
            self.status = DisplayStatus::Won;
            self.winner = Some(self.current_player);
            self.winning_cells = line.clone();
        } else if outcome.is_draw {
            self.status = DisplayStatus::Draw;
        } else {
            self.current_player = self.current_player.opponent();
        }

        Ok(outcome)
    }

    pub fn reset(&mut self) {
        *self = LocalGame::new();
    }
}
