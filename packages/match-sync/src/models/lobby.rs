use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::match_record::{parse_timestamp, MatchStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRef {
    #[serde(default)]
    pub username: Option<String>,
}

/// A lobby row: the match plus the joined player profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub id: String,
    pub player1_id: String,
    #[serde(default)]
    pub player2_id: Option<String>,
    pub status: MatchStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub player1: Option<ProfileRef>,
    #[serde(default)]
    pub player2: Option<ProfileRef>,
}

impl MatchSummary {
    pub fn host_name(&self) -> Option<&str> {
        self.player1.as_ref().and_then(|p| p.username.as_deref())
    }

    /// Name of whoever is not `player_id`.
    pub fn opponent_name(&self, player_id: &str) -> Option<&str> {
        let profile = if self.player1_id == player_id {
            self.player2.as_ref()
        } else {
            self.player1.as_ref()
        };
        profile.and_then(|p| p.username.as_deref())
    }

    pub fn is_hosted_by(&self, player_id: &str) -> bool {
        self.player1_id == player_id
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.created_at.as_deref()?)
    }
}

/// Everything the lobby screen shows at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LobbyListing {
    pub waiting: Vec<MatchSummary>,
    pub active: Vec<MatchSummary>,
}
