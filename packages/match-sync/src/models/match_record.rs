use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::board::{COLS, ROWS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Waiting,
    Playing,
    Finished,
}

impl MatchStatus {
    fn rank(self) -> u8 {
        match self {
            MatchStatus::Waiting => 0,
            MatchStatus::Playing => 1,
            MatchStatus::Finished => 2,
        }
    }

    /// Status only ever moves `waiting -> playing -> finished`.
    pub fn can_become(self, next: MatchStatus) -> bool {
        next.rank() >= self.rank()
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStatus::Waiting => write!(f, "waiting"),
            MatchStatus::Playing => write!(f, "playing"),
            MatchStatus::Finished => write!(f, "finished"),
        }
    }
}

/// Embedded game state as the backend stores it. `null` cells are allowed and
/// read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGameState {
    #[serde(default)]
    pub board: Option<Vec<Vec<Option<i64>>>>,
    #[serde(default)]
    pub current_turn: Option<String>,
    #[serde(default)]
    pub winner: Option<String>,
}

/// One row of the `matches` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: String,
    pub player1_id: String,
    #[serde(default)]
    pub player2_id: Option<String>,
    pub status: MatchStatus,
    #[serde(default)]
    pub state: Option<RawGameState>,
    #[serde(default)]
    pub winner_id: Option<String>,
    #[serde(default)]
    pub rematch_match_id: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    Malformed(String),
    BoardShape { rows: usize, columns: usize },
    MissingIdentity(&'static str),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Malformed(msg) => write!(f, "Malformed match record: {}", msg),
            DecodeError::BoardShape { rows, columns } => write!(
                f,
                "Board must be {}x{} but was {}x{}",
                ROWS, COLS, rows, columns
            ),
            DecodeError::MissingIdentity(field) => write!(f, "Match record has empty {}", field),
        }
    }
}

impl std::error::Error for DecodeError {}

impl MatchRecord {
    /// Validates and narrows an untyped record. Nothing downstream sees a
    /// record that has not been through here.
    pub fn decode(raw: Value) -> Result<Self, DecodeError> {
        let record: MatchRecord =
            serde_json::from_value(raw).map_err(|e| DecodeError::Malformed(e.to_string()))?;

        if record.id.is_empty() {
            return Err(DecodeError::MissingIdentity("id"));
        }
        if record.player1_id.is_empty() {
            return Err(DecodeError::MissingIdentity("player1_id"));
        }

        if let Some(board) = record.state.as_ref().and_then(|s| s.board.as_ref()) {
            // An empty board means "not initialised yet" and is accepted.
            if !board.is_empty() {
                let bad_row = board.iter().find(|row| row.len() != COLS);
                if board.len() != ROWS || bad_row.is_some() {
                    return Err(DecodeError::BoardShape {
                        rows: board.len(),
                        columns: bad_row.map(Vec::len).unwrap_or(COLS),
                    });
                }
            }
        }

        Ok(record)
    }

    /// Winner identity, preferring the column over the embedded state.
    pub fn winner(&self) -> Option<&str> {
        self.winner_id
            .as_deref()
            .or_else(|| self.state.as_ref().and_then(|s| s.winner.as_deref()))
    }

    pub fn current_turn(&self) -> Option<&str> {
        self.state.as_ref().and_then(|s| s.current_turn.as_deref())
    }

    pub fn has_participant(&self, player_id: &str) -> bool {
        self.player1_id == player_id || self.player2_id.as_deref() == Some(player_id)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.created_at.as_deref()?)
    }
}

/// Accepts RFC 3339 and the offset-less form the change feed sometimes uses.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|t| t.and_utc())
        })
}
