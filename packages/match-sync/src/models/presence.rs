use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a client announces on a match's presence channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub user_id: String,
    #[serde(default)]
    pub online_at: Option<DateTime<Utc>>,
}

impl PresenceRecord {
    pub fn now(user_id: &str) -> Self {
        PresenceRecord {
            user_id: user_id.to_string(),
            online_at: Some(Utc::now()),
        }
    }
}

/// Whether the caller's opponent currently has a client attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresenceStatus {
    /// Slot B is empty, or the caller is not one of the two players.
    NotApplicable,
    /// The presence channel is not (or no longer) attached.
    Unknown,
    Present,
    Absent,
}

impl PresenceStatus {
    /// Only a confirmed absence counts as "not present".
    pub fn is_present(self) -> bool {
        self != PresenceStatus::Absent
    }
}
