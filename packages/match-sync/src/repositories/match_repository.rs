use crate::config::BackendConfig;
use crate::models::lobby::MatchSummary;
use crate::models::match_record::MatchRecord;
use crate::repositories::errors::match_repository_errors::MatchRepositoryError;
use crate::repositories::rest::{RestClient, RestError};
use async_trait::async_trait;
use serde_json::{json, Value};

#[cfg(test)]
use mockall::automock;

const MATCHES_TABLE: &str = "matches";

/// Read/create access to the backend's match table.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MatchRepository: Send + Sync {
    async fn get_match(&self, match_id: &str) -> Result<Option<MatchRecord>, MatchRepositoryError>;
    async fn create_match(&self, creator_id: &str) -> Result<MatchRecord, MatchRepositoryError>;
    async fn list_waiting_matches(&self) -> Result<Vec<MatchSummary>, MatchRepositoryError>;
    async fn list_active_matches(
        &self,
        player_id: &str,
    ) -> Result<Vec<MatchSummary>, MatchRepositoryError>;
}

pub struct RestMatchRepository {
    client: RestClient,
}

impl RestMatchRepository {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            client: RestClient::new(config),
        }
    }
}

impl From<RestError> for MatchRepositoryError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Serialization(msg) => MatchRepositoryError::Serialization(msg),
            other => MatchRepositoryError::Http(other.to_string()),
        }
    }
}

fn summaries(rows: Vec<Value>) -> Result<Vec<MatchSummary>, MatchRepositoryError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| MatchRepositoryError::Serialization(e.to_string()))
        })
        .collect()
}

#[async_trait]
impl MatchRepository for RestMatchRepository {
    async fn get_match(&self, match_id: &str) -> Result<Option<MatchRecord>, MatchRepositoryError> {
        let rows = self
            .client
            .select(
                MATCHES_TABLE,
                &[
                    ("select", "*".to_string()),
                    ("id", format!("eq.{}", match_id)),
                ],
            )
            .await?;

        match rows.into_iter().next() {
            Some(row) => Ok(Some(MatchRecord::decode(row)?)),
            None => Ok(None),
        }
    }

    async fn create_match(&self, creator_id: &str) -> Result<MatchRecord, MatchRepositoryError> {
        let rows = self
            .client
            .insert(
                MATCHES_TABLE,
                &json!({
                    "player1_id": creator_id,
                    "mode": "online",
                    "status": "waiting"
                }),
            )
            .await?;

        let row = rows.into_iter().next().ok_or_else(|| {
            MatchRepositoryError::Serialization("insert returned no row".to_string())
        })?;
        Ok(MatchRecord::decode(row)?)
    }

    async fn list_waiting_matches(&self) -> Result<Vec<MatchSummary>, MatchRepositoryError> {
        let rows = self
            .client
            .select(
                MATCHES_TABLE,
                &[
                    ("select", "*,player1:player1_id(username)".to_string()),
                    ("status", "eq.waiting".to_string()),
                    ("order", "created_at.desc".to_string()),
                ],
            )
            .await?;
        summaries(rows)
    }

    async fn list_active_matches(
        &self,
        player_id: &str,
    ) -> Result<Vec<MatchSummary>, MatchRepositoryError> {
        let rows = self
            .client
            .select(
                MATCHES_TABLE,
                &[
                    (
                        "select",
                        "*,player1:player1_id(username),player2:player2_id(username)".to_string(),
                    ),
                    ("status", "eq.playing".to_string()),
                    (
                        "or",
                        format!("(player1_id.eq.{0},player2_id.eq.{0})", player_id),
                    ),
                    ("order", "created_at.desc".to_string()),
                ],
            )
            .await?;
        summaries(rows)
    }
}
