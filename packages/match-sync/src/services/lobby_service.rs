use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    models::{
        lobby::{LobbyListing, MatchSummary},
        match_record::MatchRecord,
    },
    repositories::{
        errors::procedure_errors::{ProcedureError, RemoteRejection},
        match_repository::MatchRepository,
        procedure_repository::MatchProcedures,
        realtime_repository::{ChangeFeed, RealtimeRepository},
    },
    services::errors::lobby_service_errors::LobbyServiceError,
};

#[derive(Clone)]
pub struct LobbyService {
    matches: Arc<dyn MatchRepository + Send + Sync>,
    procedures: Arc<dyn MatchProcedures + Send + Sync>,
    realtime: Arc<dyn RealtimeRepository + Send + Sync>,
}

impl LobbyService {
    pub fn new(
        matches: Arc<dyn MatchRepository + Send + Sync>,
        procedures: Arc<dyn MatchProcedures + Send + Sync>,
        realtime: Arc<dyn RealtimeRepository + Send + Sync>,
    ) -> Self {
        LobbyService {
            matches,
            procedures,
            realtime,
        }
    }

    /// Open matches, newest first.
    pub async fn list_waiting(&self) -> Result<Vec<MatchSummary>, LobbyServiceError> {
        Ok(self.matches.list_waiting_matches().await?)
    }

    /// Games in progress that `player_id` can reconnect to.
    pub async fn list_active(
        &self,
        player_id: &str,
    ) -> Result<Vec<MatchSummary>, LobbyServiceError> {
        Ok(self.matches.list_active_matches(player_id).await?)
    }

    pub async fn listing(&self, player_id: &str) -> Result<LobbyListing, LobbyServiceError> {
        let (waiting, active) =
            tokio::try_join!(self.list_waiting(), self.list_active(player_id))?;
        Ok(LobbyListing { waiting, active })
    }

    pub async fn create_match(&self, player_id: &str) -> Result<MatchRecord, LobbyServiceError> {
        if player_id.trim().is_empty() {
            return Err(LobbyServiceError::ValidationError(
                "Player id is required".to_string(),
            ));
        }

        let record = self.matches.create_match(player_id).await?;
        info!("Player {} created match {}", player_id, record.id);
        Ok(record)
    }

    /// Takes slot B of a waiting match.
    ///
    /// A "not waiting" answer may mean our own join landed and only the
    /// response was lost, so the match is re-read before giving up.
    pub async fn join_match(
        &self,
        match_id: &str,
        player_id: &str,
    ) -> Result<(), LobbyServiceError> {
        if Uuid::parse_str(match_id).is_err() {
            return Err(LobbyServiceError::ValidationError(format!(
                "Invalid match id: {}",
                match_id
            )));
        }

        match self.procedures.join_match(match_id).await {
            Ok(()) => {
                info!("Player {} joined match {}", player_id, match_id);
                Ok(())
            }
            Err(ProcedureError::Rejected(RemoteRejection::NotWaiting)) => {
                let record = self.matches.get_match(match_id).await?;
                if record
                    .as_ref()
                    .and_then(|r| r.player2_id.as_deref())
                    .is_some_and(|joined| joined == player_id)
                {
                    debug!(
                        "Join of match {} already applied for {}",
                        match_id, player_id
                    );
                    Ok(())
                } else {
                    warn!("Match {} is no longer open", match_id);
                    Err(LobbyServiceError::Rejected(RemoteRejection::NotWaiting))
                }
            }
            Err(e) => {
                warn!("Join of match {} failed: {}", match_id, e);
                Err(e.into())
            }
        }
    }

    /// Subscribes to every change on the match table. Each change yields a
    /// fresh listing from [`LobbyWatch::next_listing`].
    pub async fn watch(&self, player_id: &str) -> Result<LobbyWatch, LobbyServiceError> {
        let feed = self.realtime.subscribe_matches().await?;
        info!("Watching lobby for {}", player_id);
        Ok(LobbyWatch {
            service: self.clone(),
            player_id: player_id.to_string(),
            feed: Some(feed),
        })
    }
}

pub struct LobbyWatch {
    service: LobbyService,
    player_id: String,
    feed: Option<ChangeFeed>,
}

impl LobbyWatch {
    /// `None` once the watch is closed or the transport went away.
    pub async fn next_listing(&mut self) -> Option<Result<LobbyListing, LobbyServiceError>> {
        let feed = self.feed.as_mut()?;

        match feed.changes.recv().await {
            Some(change) => {
                debug!("Lobby change: {}", change.event);
                Some(self.service.listing(&self.player_id).await)
            }
            None => {
                warn!("Lobby feed ended");
                self.feed = None;
                None
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.feed.is_none()
    }

    pub fn close(&mut self) {
        if let Some(mut feed) = self.feed.take() {
            feed.handle.close();
        }
    }
}
