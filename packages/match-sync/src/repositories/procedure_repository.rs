use crate::config::BackendConfig;
use crate::repositories::errors::procedure_errors::{ProcedureError, RemoteRejection};
use crate::repositories::rest::{RestClient, RestError};
use async_trait::async_trait;
use serde_json::{json, Value};

#[cfg(test)]
use mockall::automock;

/// Validated mutations the backend exposes. Every one of them re-checks its
/// preconditions server-side.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MatchProcedures: Send + Sync {
    async fn make_move(&self, match_id: &str, column: usize) -> Result<(), ProcedureError>;
    async fn join_match(&self, match_id: &str) -> Result<(), ProcedureError>;
    /// Idempotent per finished match: asking twice yields the same id.
    async fn create_rematch(&self, old_match_id: &str) -> Result<String, ProcedureError>;
    async fn leave_match(&self, match_id: &str) -> Result<(), ProcedureError>;
}

pub struct RestMatchProcedures {
    client: RestClient,
}

impl RestMatchProcedures {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            client: RestClient::new(config),
        }
    }

    async fn call(&self, function: &str, args: Value) -> Result<Value, ProcedureError> {
        self.client
            .rpc(function, &args)
            .await
            .map_err(ProcedureError::from)
    }
}

impl From<RestError> for ProcedureError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Status { status, message } if status.is_client_error() => {
                ProcedureError::Rejected(RemoteRejection::classify(&message))
            }
            RestError::Serialization(msg) => ProcedureError::Serialization(msg),
            other => ProcedureError::Http(other.to_string()),
        }
    }
}

/// The rematch procedure answers with either a bare id or a row.
fn rematch_id(body: Value) -> Result<String, ProcedureError> {
    match body {
        Value::String(id) => Ok(id),
        Value::Object(row) => row
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProcedureError::Serialization("rematch row has no id".to_string())),
        other => Err(ProcedureError::Serialization(format!(
            "unexpected rematch response: {}",
            other
        ))),
    }
}

#[async_trait]
impl MatchProcedures for RestMatchProcedures {
    async fn make_move(&self, match_id: &str, column: usize) -> Result<(), ProcedureError> {
        self.call(
            "make_move_connect4",
            json!({ "p_match_id": match_id, "p_col_index": column }),
        )
        .await?;
        Ok(())
    }

    async fn join_match(&self, match_id: &str) -> Result<(), ProcedureError> {
        self.call("join_match", json!({ "p_match_id": match_id }))
            .await?;
        Ok(())
    }

    async fn create_rematch(&self, old_match_id: &str) -> Result<String, ProcedureError> {
        let body = self
            .call("create_rematch", json!({ "p_old_match_id": old_match_id }))
            .await?;
        rematch_id(body)
    }

    async fn leave_match(&self, match_id: &str) -> Result<(), ProcedureError> {
        self.call("leave_match", json!({ "p_match_id": match_id }))
            .await?;
        Ok(())
    }
}
