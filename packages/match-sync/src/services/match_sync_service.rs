use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    models::{
        board::COLS,
        match_record::{MatchRecord, MatchStatus},
        match_view::MatchView,
        presence::{PresenceRecord, PresenceStatus},
        snapshot::MatchSnapshot,
    },
    repositories::{
        match_repository::MatchRepository,
        procedure_repository::MatchProcedures,
        realtime_repository::{ChangeFeed, PresenceFeed, RealtimeRepository, RecordChange},
    },
    services::{
        errors::match_sync_errors::{MatchSyncError, PreconditionRejected},
        presence_tracker::PresenceTracker,
    },
};

/// Which realtime feed a [`SessionUpdate::Degraded`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Changes,
    Presence,
}

/// Why a server push was dropped without touching the view.
#[derive(Debug, Clone, PartialEq)]
pub enum IgnoredPush {
    Malformed(String),
    ForeignMatch(String),
    StatusRegression { from: MatchStatus, to: MatchStatus },
}

/// What one call to [`MatchSession::process_next`] changed.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Snapshot {
        previous: MatchStatus,
        current: MatchStatus,
    },
    Presence(PresenceStatus),
    Ignored(IgnoredPush),
    Degraded(Feed),
}

impl SessionUpdate {
    /// The `waiting -> playing` edge.
    pub fn started(&self) -> bool {
        matches!(
            self,
            SessionUpdate::Snapshot {
                previous: MatchStatus::Waiting,
                current: MatchStatus::Playing,
            }
        )
    }

    pub fn finished(&self) -> bool {
        matches!(
            self,
            SessionUpdate::Snapshot {
                previous: MatchStatus::Waiting | MatchStatus::Playing,
                current: MatchStatus::Finished,
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveAttempt {
    /// Sent to the server. The board changes once the server pushes it.
    Submitted,
    /// Rejected locally, nothing was sent.
    Ignored(PreconditionRejected),
}

enum Event {
    Change(Option<RecordChange>),
    Presence(Option<Vec<PresenceRecord>>),
}

#[derive(Clone)]
pub struct MatchSyncService {
    matches: Arc<dyn MatchRepository + Send + Sync>,
    procedures: Arc<dyn MatchProcedures + Send + Sync>,
    realtime: Arc<dyn RealtimeRepository + Send + Sync>,
}

impl MatchSyncService {
    pub fn new(
        matches: Arc<dyn MatchRepository + Send + Sync>,
        procedures: Arc<dyn MatchProcedures + Send + Sync>,
        realtime: Arc<dyn RealtimeRepository + Send + Sync>,
    ) -> Self {
        MatchSyncService {
            matches,
            procedures,
            realtime,
        }
    }

    /// Opens a live session on one match for `player_id`.
    ///
    /// Change notifications are subscribed before the snapshot is fetched so
    /// that nothing pushed in between is lost. Failing to attach either
    /// realtime channel degrades the session instead of failing the open.
    pub async fn open(
        &self,
        match_id: &str,
        player_id: &str,
    ) -> Result<MatchSession, MatchSyncError> {
        if Uuid::parse_str(match_id).is_err() {
            warn!("Refusing to open match with malformed id {:?}", match_id);
            return Err(MatchSyncError::NotFound(match_id.to_string()));
        }

        let changes = match self.realtime.subscribe_match(match_id).await {
            Ok(feed) => Some(feed),
            Err(e) => {
                warn!("Live updates unavailable for match {}: {}", match_id, e);
                None
            }
        };

        let record = self
            .matches
            .get_match(match_id)
            .await?
            .ok_or_else(|| MatchSyncError::NotFound(match_id.to_string()))?;

        let snapshot = MatchSnapshot::project(&record);
        report_anomalies(&snapshot);

        let mut presence = PresenceTracker::new();
        let presence_feed = match self
            .realtime
            .join_presence(match_id, &PresenceRecord::now(player_id))
            .await
        {
            Ok(feed) => Some(feed),
            Err(e) => {
                presence.degrade(&e.to_string());
                None
            }
        };

        info!(
            "Opened match {} for player {} ({})",
            match_id, player_id, snapshot.status
        );

        Ok(MatchSession {
            match_id: match_id.to_string(),
            player_id: player_id.to_string(),
            procedures: self.procedures.clone(),
            snapshot,
            presence,
            changes,
            presence_feed,
            closed: false,
        })
    }
}

/// Live mirror of one match. Owns its realtime subscriptions and releases
/// them on [`close`](MatchSession::close) or drop.
pub struct MatchSession {
    match_id: String,
    player_id: String,
    procedures: Arc<dyn MatchProcedures + Send + Sync>,
    snapshot: MatchSnapshot,
    presence: PresenceTracker,
    changes: Option<ChangeFeed>,
    presence_feed: Option<PresenceFeed>,
    closed: bool,
}

impl MatchSession {
    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn snapshot(&self) -> &MatchSnapshot {
        &self.snapshot
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether server pushes are still arriving.
    pub fn is_live(&self) -> bool {
        self.changes.is_some()
    }

    pub fn opponent_presence(&self) -> PresenceStatus {
        self.presence.opponent_status(
            &self.snapshot.player1_id,
            self.snapshot.player2_id.as_deref(),
            &self.player_id,
        )
    }

    pub fn view(&self) -> MatchView {
        MatchView::from_snapshot(&self.snapshot, &self.player_id, self.opponent_presence())
    }

    /// Realtime channels still held by this session.
    pub fn active_channels(&self) -> usize {
        let changes = self
            .changes
            .as_ref()
            .filter(|feed| !feed.handle.is_closed())
            .is_some();
        let presence = self
            .presence_feed
            .as_ref()
            .filter(|feed| !feed.handle.is_closed())
            .is_some();
        usize::from(changes) + usize::from(presence)
    }

    /// Waits for the next push or presence sync and applies it in arrival
    /// order. Returns `None` once the session is closed or has no feed left.
    pub async fn process_next(&mut self) -> Option<SessionUpdate> {
        if self.closed {
            return None;
        }

        let event = {
            let changes = self.changes.as_mut().map(|feed| &mut feed.changes);
            let syncs = self.presence_feed.as_mut().map(|feed| &mut feed.syncs);
            if changes.is_none() && syncs.is_none() {
                return None;
            }

            tokio::select! {
                biased;
                change = recv_or_pending(changes) => Event::Change(change),
                sync = recv_or_pending(syncs) => Event::Presence(sync),
            }
        };

        let update = match event {
            Event::Change(Some(change)) => self.apply_server_snapshot(change.new),
            Event::Change(None) => {
                warn!(
                    "Update channel for match {} dropped, keeping last snapshot",
                    self.match_id
                );
                self.changes = None;
                SessionUpdate::Degraded(Feed::Changes)
            }
            Event::Presence(Some(records)) => {
                self.presence.sync(&records);
                SessionUpdate::Presence(self.opponent_presence())
            }
            Event::Presence(None) => {
                self.presence.degrade("presence channel dropped");
                self.presence_feed = None;
                SessionUpdate::Degraded(Feed::Presence)
            }
        };
        Some(update)
    }

    /// Replaces the mirrored state with a pushed record. The record is taken
    /// as the server sent it; nothing is re-derived locally.
    pub fn apply_server_snapshot(&mut self, raw: Value) -> SessionUpdate {
        let record = match MatchRecord::decode(raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring malformed push for match {}: {}", self.match_id, e);
                return SessionUpdate::Ignored(IgnoredPush::Malformed(e.to_string()));
            }
        };

        if record.id != self.match_id {
            warn!(
                "Ignoring push for match {} on session {}",
                record.id, self.match_id
            );
            return SessionUpdate::Ignored(IgnoredPush::ForeignMatch(record.id));
        }

        let previous = self.snapshot.status;
        if !previous.can_become(record.status) {
            warn!(
                "Ignoring push moving match {} from {} back to {}",
                self.match_id, previous, record.status
            );
            return SessionUpdate::Ignored(IgnoredPush::StatusRegression {
                from: previous,
                to: record.status,
            });
        }

        let mut next = MatchSnapshot::project(&record);
        report_anomalies(&next);

        if let Some(known) = &self.snapshot.rematch_id {
            if next.rematch_id.as_ref().is_some_and(|id| id != known) {
                warn!(
                    "Match {} already links rematch {}, keeping it",
                    self.match_id, known
                );
            }
            next.rematch_id = Some(known.clone());
        }

        debug!(
            "Match {} updated: {} -> {}",
            self.match_id, previous, next.status
        );
        self.snapshot = next;

        SessionUpdate::Snapshot {
            previous,
            current: self.snapshot.status,
        }
    }

    fn check_move(&self, column: usize) -> Result<(), PreconditionRejected> {
        if self.closed {
            return Err(PreconditionRejected::SessionClosed);
        }
        if !self.snapshot.is_participant(&self.player_id) {
            return Err(PreconditionRejected::NotAParticipant);
        }
        if self.snapshot.status != MatchStatus::Playing {
            return Err(PreconditionRejected::NotPlaying);
        }
        if column >= COLS {
            return Err(PreconditionRejected::ColumnOutOfRange(column));
        }
        if self.snapshot.current_turn_id.as_deref() != Some(self.player_id.as_str()) {
            return Err(PreconditionRejected::NotYourTurn);
        }
        if self.opponent_presence() == PresenceStatus::Absent {
            return Err(PreconditionRejected::OpponentDisconnected);
        }
        Ok(())
    }

    /// Drops a disc in `column`. Local guard failures are logged and reported
    /// as [`MoveAttempt::Ignored`] without contacting the server; a server
    /// rejection leaves the view as it is until the next push.
    pub async fn attempt_move(&self, column: usize) -> Result<MoveAttempt, MatchSyncError> {
        if let Err(reason) = self.check_move(column) {
            warn!(
                "Move in column {} on match {} not sent: {}",
                column, self.match_id, reason
            );
            return Ok(MoveAttempt::Ignored(reason));
        }

        match self.procedures.make_move(&self.match_id, column).await {
            Ok(()) => {
                info!("Submitted move in column {} on match {}", column, self.match_id);
                Ok(MoveAttempt::Submitted)
            }
            Err(e) => {
                warn!("Move on match {} failed: {}", self.match_id, e);
                Err(e.into())
            }
        }
    }

    /// Returns the successor match, creating it on the first call only.
    pub async fn request_rematch(&mut self) -> Result<String, MatchSyncError> {
        if let Some(rematch_id) = &self.snapshot.rematch_id {
            return Ok(rematch_id.clone());
        }
        if self.closed {
            return Err(PreconditionRejected::SessionClosed.into());
        }
        if !self.snapshot.is_participant(&self.player_id) {
            return Err(PreconditionRejected::NotAParticipant.into());
        }
        if self.snapshot.status != MatchStatus::Finished {
            return Err(PreconditionRejected::NotFinished.into());
        }

        let rematch_id = self.procedures.create_rematch(&self.match_id).await?;
        info!("Match {} continues as {}", self.match_id, rematch_id);
        self.snapshot.rematch_id = Some(rematch_id.clone());
        Ok(rematch_id)
    }

    /// Page-unload hook. Only a host still waiting for an opponent gives up
    /// the match; a disconnect mid-game is treated as transient. Returns
    /// whether the leave was delivered.
    pub async fn on_unload(&self) -> bool {
        if self.snapshot.status != MatchStatus::Waiting
            || self.snapshot.player1_id != self.player_id
        {
            return false;
        }

        match self.procedures.leave_match(&self.match_id).await {
            Ok(()) => {
                info!("Left waiting match {}", self.match_id);
                true
            }
            Err(e) => {
                warn!("Leave for match {} not delivered: {}", self.match_id, e);
                false
            }
        }
    }

    /// Releases both realtime channels. Safe to call any number of times.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(mut feed) = self.changes.take() {
            feed.handle.close();
        }
        if let Some(mut feed) = self.presence_feed.take() {
            feed.handle.close();
        }
        self.presence.detach();
        info!("Closed match session {}", self.match_id);
    }
}

impl Drop for MatchSession {
    fn drop(&mut self) {
        self.close();
    }
}

async fn recv_or_pending<T>(receiver: Option<&mut mpsc::Receiver<T>>) -> Option<T> {
    match receiver {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

fn report_anomalies(snapshot: &MatchSnapshot) {
    for anomaly in &snapshot.anomalies {
        warn!("Match {}: {}", snapshot.match_id, anomaly);
    }
}
