//! In-memory backend shared by the scenario tests.
//!
//! Behaves like the hosted backend as far as the client can tell: it owns
//! every match row, validates moves and joins under one lock, and pushes the
//! resulting row images to subscribers in commit order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use uuid::Uuid;

use match_sync::{
    models::{
        board::{Board, Player},
        lobby::MatchSummary,
        match_record::{MatchRecord, MatchStatus},
        presence::PresenceRecord,
    },
    repositories::{
        errors::{
            match_repository_errors::MatchRepositoryError,
            procedure_errors::{ProcedureError, RemoteRejection},
            realtime_errors::RealtimeError,
        },
        match_repository::MatchRepository,
        procedure_repository::MatchProcedures,
        realtime_repository::{
            ChangeFeed, ChannelHandle, PresenceFeed, RealtimeRepository, RecordChange,
        },
    },
    services::{
        connect4_service::Connect4Service,
        errors::connect4_service_errors::Connect4Error,
        lobby_service::LobbyService,
        match_sync_service::{MatchSession, MatchSyncService, SessionUpdate},
    },
};

const FEED_CAPACITY: usize = 64;

struct StoredMatch {
    id: String,
    seq: u64,
    player1_id: String,
    player2_id: Option<String>,
    status: MatchStatus,
    board: Board,
    current_turn: Option<String>,
    winner_id: Option<String>,
    rematch_match_id: Option<String>,
}

impl StoredMatch {
    fn new(seq: u64, player1_id: &str) -> Self {
        StoredMatch {
            id: Uuid::new_v4().to_string(),
            seq,
            player1_id: player1_id.to_string(),
            player2_id: None,
            status: MatchStatus::Waiting,
            board: Board::empty(),
            current_turn: None,
            winner_id: None,
            rematch_match_id: None,
        }
    }

    fn to_row(&self) -> Value {
        json!({
            "id": self.id,
            "player1_id": self.player1_id,
            "player2_id": self.player2_id,
            "status": self.status,
            "state": {
                "board": self.board.to_raw(),
                "current_turn": self.current_turn,
                "winner": self.winner_id,
            },
            "winner_id": self.winner_id,
            "rematch_match_id": self.rematch_match_id,
            "mode": "online",
            "created_at": format!("2025-03-01T10:00:{:02}Z", self.seq % 60),
        })
    }

    fn summary(&self) -> MatchSummary {
        serde_json::from_value(self.to_row()).unwrap()
    }

    fn has_participant(&self, player_id: &str) -> bool {
        self.player1_id == player_id || self.player2_id.as_deref() == Some(player_id)
    }

    fn colour_of(&self, player_id: &str) -> Player {
        if self.player1_id == player_id {
            Player::Red
        } else {
            Player::Yellow
        }
    }

    fn opponent_of(&self, player_id: &str) -> Option<String> {
        if self.player1_id == player_id {
            self.player2_id.clone()
        } else {
            Some(self.player1_id.clone())
        }
    }
}

struct Subscriber {
    match_id: Option<String>,
    sender: mpsc::Sender<RecordChange>,
}

struct Member {
    key: u64,
    user_id: String,
    sender: mpsc::Sender<Vec<PresenceRecord>>,
}

#[derive(Default)]
struct State {
    matches: HashMap<String, StoredMatch>,
    subscribers: Vec<Subscriber>,
    presence: HashMap<String, Vec<Member>>,
    next_seq: u64,
    move_calls: usize,
    rematch_calls: usize,
}

fn rejected(rejection: RemoteRejection) -> ProcedureError {
    ProcedureError::Rejected(rejection)
}

impl State {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn insert(&mut self, stored: StoredMatch) -> Value {
        let row = stored.to_row();
        let id = stored.id.clone();
        self.matches.insert(id.clone(), stored);
        self.publish("INSERT", &id, Value::Null, row.clone());
        row
    }

    fn publish(&mut self, event: &str, match_id: &str, old: Value, new: Value) {
        self.subscribers.retain(|s| !s.sender.is_closed());
        for subscriber in &self.subscribers {
            let wanted = match &subscriber.match_id {
                Some(id) => id == match_id && event == "UPDATE",
                None => true,
            };
            if wanted {
                let _ = subscriber.sender.try_send(RecordChange {
                    event: event.to_string(),
                    old: old.clone(),
                    new: new.clone(),
                });
            }
        }
    }

    /// Applies `change` atomically and publishes the new row image.
    fn update<T>(
        &mut self,
        match_id: &str,
        change: impl FnOnce(&mut StoredMatch) -> Result<T, ProcedureError>,
    ) -> Result<T, ProcedureError> {
        let (out, old, new) = {
            let stored = self
                .matches
                .get_mut(match_id)
                .ok_or_else(|| rejected(RemoteRejection::Other("Match not found".to_string())))?;
            let old = stored.to_row();
            let out = change(stored)?;
            (out, old, stored.to_row())
        };
        self.publish("UPDATE", match_id, old, new);
        Ok(out)
    }

    fn broadcast_presence(&mut self, match_id: &str) {
        if let Some(members) = self.presence.get_mut(match_id) {
            members.retain(|m| !m.sender.is_closed());
            let records: Vec<PresenceRecord> = members
                .iter()
                .map(|m| PresenceRecord::now(&m.user_id))
                .collect();
            for member in members.iter() {
                let _ = member.sender.try_send(records.clone());
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<State>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection authenticated as `player_id`.
    pub fn client(&self, player_id: &str) -> Arc<BackendClient> {
        Arc::new(BackendClient {
            backend: self.clone(),
            caller: player_id.to_string(),
        })
    }

    /// Realtime channels whose reader is still alive.
    pub fn open_channels(&self) -> usize {
        let state = self.state.lock().unwrap();
        let changes = state
            .subscribers
            .iter()
            .filter(|s| !s.sender.is_closed())
            .count();
        let presence = state
            .presence
            .values()
            .flatten()
            .filter(|m| !m.sender.is_closed())
            .count();
        changes + presence
    }

    pub fn move_calls(&self) -> usize {
        self.state.lock().unwrap().move_calls
    }

    pub fn rematch_calls(&self) -> usize {
        self.state.lock().unwrap().rematch_calls
    }

    pub fn has_match(&self, match_id: &str) -> bool {
        self.state.lock().unwrap().matches.contains_key(match_id)
    }

    pub fn board(&self, match_id: &str) -> Option<Board> {
        self.state
            .lock()
            .unwrap()
            .matches
            .get(match_id)
            .map(|m| m.board.clone())
    }

    fn leave_presence(&self, match_id: &str, key: u64) {
        let mut state = self.state.lock().unwrap();
        if let Some(members) = state.presence.get_mut(match_id) {
            members.retain(|m| m.key != key);
        }
        state.broadcast_presence(match_id);
    }
}

pub struct BackendClient {
    backend: InMemoryBackend,
    caller: String,
}

impl BackendClient {
    pub fn sync_service(self: &Arc<Self>) -> MatchSyncService {
        MatchSyncService::new(self.clone(), self.clone(), self.clone())
    }

    pub fn lobby_service(self: &Arc<Self>) -> LobbyService {
        LobbyService::new(self.clone(), self.clone(), self.clone())
    }

    fn subscribe(&self, match_id: Option<&str>) -> ChangeFeed {
        let (sender, changes) = mpsc::channel(FEED_CAPACITY);
        let (shutdown, _) = oneshot::channel();
        let topic = match match_id {
            Some(id) => format!("match:{}", id),
            None => "lobby".to_string(),
        };

        self.backend.state.lock().unwrap().subscribers.push(Subscriber {
            match_id: match_id.map(str::to_string),
            sender,
        });

        ChangeFeed {
            changes,
            handle: ChannelHandle::new(&topic, shutdown),
        }
    }
}

#[async_trait]
impl MatchRepository for BackendClient {
    async fn get_match(&self, match_id: &str) -> Result<Option<MatchRecord>, MatchRepositoryError> {
        let row = self
            .backend
            .state
            .lock()
            .unwrap()
            .matches
            .get(match_id)
            .map(StoredMatch::to_row);

        match row {
            Some(row) => Ok(Some(MatchRecord::decode(row)?)),
            None => Ok(None),
        }
    }

    async fn create_match(&self, creator_id: &str) -> Result<MatchRecord, MatchRepositoryError> {
        let row = {
            let mut state = self.backend.state.lock().unwrap();
            let seq = state.next_seq();
            state.insert(StoredMatch::new(seq, creator_id))
        };
        Ok(MatchRecord::decode(row)?)
    }

    async fn list_waiting_matches(&self) -> Result<Vec<MatchSummary>, MatchRepositoryError> {
        let state = self.backend.state.lock().unwrap();
        let mut waiting: Vec<&StoredMatch> = state
            .matches
            .values()
            .filter(|m| m.status == MatchStatus::Waiting)
            .collect();
        waiting.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(waiting.into_iter().map(StoredMatch::summary).collect())
    }

    async fn list_active_matches(
        &self,
        player_id: &str,
    ) -> Result<Vec<MatchSummary>, MatchRepositoryError> {
        let state = self.backend.state.lock().unwrap();
        let mut active: Vec<&StoredMatch> = state
            .matches
            .values()
            .filter(|m| m.status == MatchStatus::Playing && m.has_participant(player_id))
            .collect();
        active.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(active.into_iter().map(StoredMatch::summary).collect())
    }
}

#[async_trait]
impl MatchProcedures for BackendClient {
    async fn make_move(&self, match_id: &str, column: usize) -> Result<(), ProcedureError> {
        let caller = self.caller.as_str();
        let mut state = self.backend.state.lock().unwrap();
        state.move_calls += 1;

        state.update(match_id, |stored| {
            if stored.status != MatchStatus::Playing {
                return Err(rejected(RemoteRejection::MatchNotPlaying));
            }
            if stored.current_turn.as_deref() != Some(caller) {
                return Err(rejected(RemoteRejection::NotYourTurn));
            }

            let outcome = Connect4Service::new()
                .play_column(&stored.board, column, stored.colour_of(caller))
                .map_err(|e| match e {
                    Connect4Error::ColumnFull(_) => rejected(RemoteRejection::ColumnFull),
                    other => rejected(RemoteRejection::Other(other.to_string())),
                })?;

            stored.board = outcome.board;
            if outcome.winning_line.is_some() {
                stored.status = MatchStatus::Finished;
                stored.winner_id = Some(caller.to_string());
                stored.current_turn = None;
            } else if outcome.is_draw {
                stored.status = MatchStatus::Finished;
                stored.current_turn = None;
            } else {
                stored.current_turn = stored.opponent_of(caller);
            }
            Ok(())
        })
    }

    async fn join_match(&self, match_id: &str) -> Result<(), ProcedureError> {
        let caller = self.caller.as_str();
        let mut state = self.backend.state.lock().unwrap();

        state.update(match_id, |stored| {
            if stored.status != MatchStatus::Waiting || stored.player2_id.is_some() {
                return Err(rejected(RemoteRejection::classify(
                    "Match is not in waiting state",
                )));
            }
            if stored.player1_id == caller {
                return Err(rejected(RemoteRejection::Other(
                    "Cannot join your own match".to_string(),
                )));
            }
            stored.player2_id = Some(caller.to_string());
            stored.status = MatchStatus::Playing;
            stored.current_turn = Some(stored.player1_id.clone());
            Ok(())
        })
    }

    async fn create_rematch(&self, old_match_id: &str) -> Result<String, ProcedureError> {
        let caller = self.caller.as_str();
        let mut state = self.backend.state.lock().unwrap();
        state.rematch_calls += 1;

        let (player1, player2) = {
            let old = state
                .matches
                .get(old_match_id)
                .ok_or_else(|| rejected(RemoteRejection::Other("Match not found".to_string())))?;
            if old.status != MatchStatus::Finished || !old.has_participant(caller) {
                return Err(rejected(RemoteRejection::MatchNotPlaying));
            }
            if let Some(existing) = &old.rematch_match_id {
                return Ok(existing.clone());
            }
            (old.player2_id.clone(), old.player1_id.clone())
        };

        // Colours swap for the rematch.
        let seq = state.next_seq();
        let mut successor = StoredMatch::new(seq, player1.as_deref().unwrap_or(caller));
        successor.player2_id = Some(player2);
        successor.status = MatchStatus::Playing;
        successor.current_turn = Some(successor.player1_id.clone());
        let successor_id = successor.id.clone();
        state.insert(successor);

        state.update(old_match_id, |old| {
            old.rematch_match_id = Some(successor_id.clone());
            Ok(())
        })?;
        Ok(successor_id)
    }

    async fn leave_match(&self, match_id: &str) -> Result<(), ProcedureError> {
        let mut state = self.backend.state.lock().unwrap();

        let row = match state.matches.get(match_id) {
            Some(stored)
                if stored.status == MatchStatus::Waiting && stored.player1_id == self.caller =>
            {
                stored.to_row()
            }
            _ => return Err(rejected(RemoteRejection::NotWaiting)),
        };

        state.matches.remove(match_id);
        state.publish("DELETE", match_id, row, Value::Null);
        Ok(())
    }
}

#[async_trait]
impl RealtimeRepository for BackendClient {
    async fn subscribe_match(&self, match_id: &str) -> Result<ChangeFeed, RealtimeError> {
        Ok(self.subscribe(Some(match_id)))
    }

    async fn subscribe_matches(&self) -> Result<ChangeFeed, RealtimeError> {
        Ok(self.subscribe(None))
    }

    async fn join_presence(
        &self,
        match_id: &str,
        me: &PresenceRecord,
    ) -> Result<PresenceFeed, RealtimeError> {
        let (sender, syncs) = mpsc::channel(FEED_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let key = {
            let mut state = self.backend.state.lock().unwrap();
            let key = state.next_seq();
            state
                .presence
                .entry(match_id.to_string())
                .or_default()
                .push(Member {
                    key,
                    user_id: me.user_id.clone(),
                    sender,
                });
            state.broadcast_presence(match_id);
            key
        };

        // The transport drops the member once the client goes away.
        let backend = self.backend.clone();
        let topic_match = match_id.to_string();
        tokio::spawn(async move {
            let _ = shutdown_rx.await;
            backend.leave_presence(&topic_match, key);
        });

        Ok(PresenceFeed {
            syncs,
            handle: ChannelHandle::new(&format!("presence:{}", match_id), shutdown_tx),
        })
    }
}

/// Applies everything the session has been sent until it goes quiet.
pub async fn settle(session: &mut MatchSession) -> Vec<SessionUpdate> {
    let mut updates = Vec::new();
    while let Ok(Some(update)) = timeout(Duration::from_millis(100), session.process_next()).await
    {
        updates.push(update);
    }
    updates
}
