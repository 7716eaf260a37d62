use serde_json::Value;

use crate::models::board::{Board, Cell, Player};
use crate::models::match_record::{DecodeError, MatchRecord, MatchStatus};

/// A cell value outside the known encoding. Rendered as empty and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeAnomaly {
    pub row: usize,
    pub column: usize,
    pub raw: i64,
}

impl std::fmt::Display for DecodeAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unrecognised cell value {} at row {}, column {}",
            self.raw, self.row, self.column
        )
    }
}

/// Client-side mirror of one match record.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSnapshot {
    pub match_id: String,
    pub player1_id: String,
    pub player2_id: Option<String>,
    pub status: MatchStatus,
    pub board: Board,
    pub current_turn_id: Option<String>,
    pub winner_id: Option<String>,
    pub rematch_id: Option<String>,
    pub anomalies: Vec<DecodeAnomaly>,
}

impl MatchSnapshot {
    /// Projects a decoded record. This never re-derives anything the server
    /// decided: the board, turn and winner are copied, only re-encoded.
    pub fn project(record: &MatchRecord) -> Self {
        let (board, anomalies) = decode_board(record);

        MatchSnapshot {
            match_id: record.id.clone(),
            player1_id: record.player1_id.clone(),
            player2_id: record.player2_id.clone(),
            status: record.status,
            board,
            current_turn_id: record.current_turn().map(str::to_string),
            winner_id: record.winner().map(str::to_string),
            rematch_id: record.rematch_match_id.clone(),
            anomalies,
        }
    }

    /// Decode and project in one step.
    pub fn from_raw(raw: Value) -> Result<Self, DecodeError> {
        MatchRecord::decode(raw).map(|record| Self::project(&record))
    }

    /// Colour bound to a player. Fixed by slot, never by turn order.
    pub fn color_of(&self, player_id: &str) -> Option<Player> {
        if self.player1_id == player_id {
            Some(Player::Red)
        } else if self.player2_id.as_deref() == Some(player_id) {
            Some(Player::Yellow)
        } else {
            None
        }
    }

    pub fn opponent_of(&self, player_id: &str) -> Option<&str> {
        match self.color_of(player_id)? {
            Player::Red => self.player2_id.as_deref(),
            Player::Yellow => Some(self.player1_id.as_str()),
        }
    }

    pub fn is_participant(&self, player_id: &str) -> bool {
        self.color_of(player_id).is_some()
    }

    /// Colour whose turn it is. Only defined while playing.
    pub fn current_player(&self) -> Option<Player> {
        if self.status != MatchStatus::Playing {
            return None;
        }
        self.current_turn_id
            .as_deref()
            .and_then(|turn| self.color_of(turn))
    }

    pub fn winner(&self) -> Option<Player> {
        self.winner_id
            .as_deref()
            .and_then(|winner| self.color_of(winner))
    }
}

fn decode_board(record: &MatchRecord) -> (Board, Vec<DecodeAnomaly>) {
    let mut board = Board::empty();
    let mut anomalies = Vec::new();

    let Some(raw) = record.state.as_ref().and_then(|s| s.board.as_ref()) else {
        return (board, anomalies);
    };

    for (row, cells) in raw.iter().enumerate() {
        for (column, raw_cell) in cells.iter().enumerate() {
            let Some(value) = raw_cell else { continue };
            match Cell::from_raw(*value) {
                Some(cell) => board.set(row, column, cell),
                None => anomalies.push(DecodeAnomaly {
                    row,
                    column,
                    raw: *value,
                }),
            }
        }
    }

    (board, anomalies)
}
