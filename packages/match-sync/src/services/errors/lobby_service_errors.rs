use crate::repositories::errors::match_repository_errors::MatchRepositoryError;
use crate::repositories::errors::procedure_errors::{ProcedureError, RemoteRejection};
use crate::repositories::errors::realtime_errors::RealtimeError;

#[derive(Debug)]
pub enum LobbyServiceError {
    ValidationError(String),
    Rejected(RemoteRejection),
    RepositoryError(MatchRepositoryError),
    ProcedureError(ProcedureError),
    RealtimeError(RealtimeError),
}

impl std::fmt::Display for LobbyServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LobbyServiceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            LobbyServiceError::Rejected(rejection) => write!(f, "Rejected: {}", rejection),
            LobbyServiceError::RepositoryError(err) => write!(f, "Repository error: {}", err),
            LobbyServiceError::ProcedureError(err) => write!(f, "Procedure error: {}", err),
            LobbyServiceError::RealtimeError(err) => write!(f, "Realtime error: {}", err),
        }
    }
}

impl std::error::Error for LobbyServiceError {}

impl From<MatchRepositoryError> for LobbyServiceError {
    fn from(err: MatchRepositoryError) -> Self {
        LobbyServiceError::RepositoryError(err)
    }
}

impl From<ProcedureError> for LobbyServiceError {
    fn from(err: ProcedureError) -> Self {
        match err {
            ProcedureError::Rejected(rejection) => LobbyServiceError::Rejected(rejection),
            other => LobbyServiceError::ProcedureError(other),
        }
    }
}

impl From<RealtimeError> for LobbyServiceError {
    fn from(err: RealtimeError) -> Self {
        LobbyServiceError::RealtimeError(err)
    }
}
