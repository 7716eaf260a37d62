use std::collections::HashSet;

use tracing::{debug, warn};

use crate::models::presence::{PresenceRecord, PresenceStatus};

#[derive(Debug, Clone, PartialEq)]
enum Tracking {
    /// Attached but no sync received yet.
    Attaching,
    /// Attach failed, the channel dropped, or the session closed.
    Untracked(String),
    Tracking(HashSet<String>),
}

/// Answers "is my opponent's client connected?" from the announced set on a
/// match's presence channel. Liveness is whatever the transport reports; there
/// is no timeout logic here.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    state: Tracking,
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceTracker {
    pub fn new() -> Self {
        PresenceTracker {
            state: Tracking::Attaching,
        }
    }

    /// Replaces the announced set with a fresh sync.
    pub fn sync(&mut self, records: &[PresenceRecord]) {
        let announced: HashSet<String> = records.iter().map(|r| r.user_id.clone()).collect();
        debug!("Presence sync: {} client(s) announced", announced.len());
        self.state = Tracking::Tracking(announced);
    }

    pub fn degrade(&mut self, reason: &str) {
        if let Tracking::Untracked(_) = self.state {
            return;
        }
        warn!("Presence no longer tracked: {}", reason);
        self.state = Tracking::Untracked(reason.to_string());
    }

    /// Stops tracking after a deliberate teardown.
    pub fn detach(&mut self) {
        if let Tracking::Untracked(_) = self.state {
            return;
        }
        debug!("Presence detached");
        self.state = Tracking::Untracked("detached".to_string());
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, Tracking::Tracking(_))
    }

    pub fn is_announced(&self, player_id: &str) -> bool {
        match &self.state {
            Tracking::Tracking(announced) => announced.contains(player_id),
            _ => false,
        }
    }

    /// Presence of whoever sits opposite `me`. Neutral until both slots are
    /// filled, and for anyone who is not one of the two players.
    pub fn opponent_status(
        &self,
        player1_id: &str,
        player2_id: Option<&str>,
        me: &str,
    ) -> PresenceStatus {
        let Some(player2_id) = player2_id else {
            return PresenceStatus::NotApplicable;
        };
        let opponent = if me == player1_id {
            player2_id
        } else if me == player2_id {
            player1_id
        } else {
            return PresenceStatus::NotApplicable;
        };

        match &self.state {
            Tracking::Tracking(announced) if announced.contains(opponent) => {
                PresenceStatus::Present
            }
            Tracking::Tracking(_) => PresenceStatus::Absent,
            Tracking::Attaching | Tracking::Untracked(_) => PresenceStatus::Unknown,
        }
    }
}
