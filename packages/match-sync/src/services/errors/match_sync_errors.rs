use crate::repositories::errors::match_repository_errors::MatchRepositoryError;
use crate::repositories::errors::procedure_errors::{ProcedureError, RemoteRejection};
use crate::repositories::errors::realtime_errors::RealtimeError;

/// Local guard failures. These never reach the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreconditionRejected {
    SessionClosed,
    NotAParticipant,
    NotPlaying,
    NotYourTurn,
    ColumnOutOfRange(usize),
    OpponentDisconnected,
    NotFinished,
}

impl std::fmt::Display for PreconditionRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreconditionRejected::SessionClosed => write!(f, "Match session is closed"),
            PreconditionRejected::NotAParticipant => write!(f, "Not a player in this match"),
            PreconditionRejected::NotPlaying => write!(f, "Match is not in progress"),
            PreconditionRejected::NotYourTurn => write!(f, "Not your turn"),
            PreconditionRejected::ColumnOutOfRange(column) => {
                write!(f, "Column {} is off the board", column)
            }
            PreconditionRejected::OpponentDisconnected => {
                write!(f, "Opponent is disconnected, game is paused")
            }
            PreconditionRejected::NotFinished => write!(f, "Match has not finished"),
        }
    }
}

#[derive(Debug)]
pub enum MatchSyncError {
    NotFound(String),
    PreconditionRejected(PreconditionRejected),
    RemoteRejected(RemoteRejection),
    TransportDegraded(String),
    Repository(MatchRepositoryError),
    Procedure(ProcedureError),
}

impl std::fmt::Display for MatchSyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchSyncError::NotFound(id) => write!(f, "Match not found: {}", id),
            MatchSyncError::PreconditionRejected(reason) => {
                write!(f, "Precondition rejected: {}", reason)
            }
            MatchSyncError::RemoteRejected(rejection) => {
                write!(f, "Rejected by server: {}", rejection)
            }
            MatchSyncError::TransportDegraded(msg) => write!(f, "Transport degraded: {}", msg),
            MatchSyncError::Repository(err) => write!(f, "Repository error: {}", err),
            MatchSyncError::Procedure(err) => write!(f, "Procedure error: {}", err),
        }
    }
}

impl std::error::Error for MatchSyncError {}

impl From<MatchRepositoryError> for MatchSyncError {
    fn from(err: MatchRepositoryError) -> Self {
        MatchSyncError::Repository(err)
    }
}

impl From<ProcedureError> for MatchSyncError {
    fn from(err: ProcedureError) -> Self {
        match err {
            ProcedureError::Rejected(rejection) => MatchSyncError::RemoteRejected(rejection),
            other => MatchSyncError::Procedure(other),
        }
    }
}

impl From<RealtimeError> for MatchSyncError {
    fn from(err: RealtimeError) -> Self {
        MatchSyncError::TransportDegraded(err.to_string())
    }
}

impl From<PreconditionRejected> for MatchSyncError {
    fn from(reason: PreconditionRejected) -> Self {
        MatchSyncError::PreconditionRejected(reason)
    }
}
