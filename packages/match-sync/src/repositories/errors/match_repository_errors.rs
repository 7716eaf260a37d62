use crate::models::match_record::DecodeError;

#[derive(Debug)]
pub enum MatchRepositoryError {
    Http(String),
    Serialization(String),
    Decode(DecodeError),
}

impl std::fmt::Display for MatchRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchRepositoryError::Http(msg) => write!(f, "HTTP error: {}", msg),
            MatchRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            MatchRepositoryError::Decode(err) => write!(f, "Decode error: {}", err),
        }
    }
}

impl std::error::Error for MatchRepositoryError {}

impl From<DecodeError> for MatchRepositoryError {
    fn from(err: DecodeError) -> Self {
        MatchRepositoryError::Decode(err)
    }
}
