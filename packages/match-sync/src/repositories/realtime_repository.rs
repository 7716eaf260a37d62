use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::models::presence::PresenceRecord;
use crate::repositories::errors::realtime_errors::RealtimeError;

/// One row change pushed by the backend. `old`/`new` are `Null` when the
/// event carries no such image (inserts, deletes).
#[derive(Debug, Clone, PartialEq)]
pub struct RecordChange {
    pub event: String,
    pub old: Value,
    pub new: Value,
}

impl RecordChange {
    pub fn update(old: Value, new: Value) -> Self {
        RecordChange {
            event: "UPDATE".to_string(),
            old,
            new,
        }
    }
}

/// Owned attachment to a realtime channel. Closing (or dropping) it tells the
/// transport to leave the channel.
#[derive(Debug)]
pub struct ChannelHandle {
    topic: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl ChannelHandle {
    pub fn new(topic: &str, shutdown: oneshot::Sender<()>) -> Self {
        Self {
            topic: topic.to_string(),
            shutdown: Some(shutdown),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_none()
    }

    /// Returns `false` when the handle was already closed.
    pub fn close(&mut self) -> bool {
        match self.shutdown.take() {
            Some(shutdown) => {
                // The transport may already be gone; nothing left to do then.
                let _ = shutdown.send(());
                debug!("Left channel {}", self.topic);
                true
            }
            None => false,
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Ordered stream of row changes. The receiver ends when the transport drops.
#[derive(Debug)]
pub struct ChangeFeed {
    pub changes: mpsc::Receiver<RecordChange>,
    pub handle: ChannelHandle,
}

/// Stream of full presence sets, one per sync.
#[derive(Debug)]
pub struct PresenceFeed {
    pub syncs: mpsc::Receiver<Vec<PresenceRecord>>,
    pub handle: ChannelHandle,
}

#[async_trait]
pub trait RealtimeRepository: Send + Sync {
    /// Updates to a single match row.
    async fn subscribe_match(&self, match_id: &str) -> Result<ChangeFeed, RealtimeError>;

    /// Every change to the match table.
    async fn subscribe_matches(&self) -> Result<ChangeFeed, RealtimeError>;

    /// Attaches to the match's presence channel and announces `me` as soon as
    /// the attach succeeds.
    async fn join_presence(
        &self,
        match_id: &str,
        me: &PresenceRecord,
    ) -> Result<PresenceFeed, RealtimeError>;
}
