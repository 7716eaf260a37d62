/// Why the backend refused a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRejection {
    NotYourTurn,
    ColumnFull,
    MatchNotPlaying,
    MatchFull,
    NotWaiting,
    Other(String),
}

impl RemoteRejection {
    /// Classifies the message raised by a backend procedure.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();

        if lower.contains("not your turn") {
            RemoteRejection::NotYourTurn
        } else if lower.contains("column") && lower.contains("full") {
            RemoteRejection::ColumnFull
        } else if lower.contains("not in waiting state") || lower.contains("not waiting") {
            RemoteRejection::NotWaiting
        } else if lower.contains("already full") || lower.contains("match is full") {
            RemoteRejection::MatchFull
        } else if lower.contains("not playing")
            || lower.contains("not in progress")
            || lower.contains("game is over")
        {
            RemoteRejection::MatchNotPlaying
        } else {
            RemoteRejection::Other(message.to_string())
        }
    }
}

impl std::fmt::Display for RemoteRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteRejection::NotYourTurn => write!(f, "Not your turn"),
            RemoteRejection::ColumnFull => write!(f, "Column is full"),
            RemoteRejection::MatchNotPlaying => write!(f, "Match is not in progress"),
            RemoteRejection::MatchFull => write!(f, "Match is already full"),
            RemoteRejection::NotWaiting => write!(f, "Match is not in waiting state"),
            RemoteRejection::Other(msg) => write!(f, "{}", msg),
        }
    }
}

#[derive(Debug)]
pub enum ProcedureError {
    Rejected(RemoteRejection),
    Http(String),
    Serialization(String),
}

impl std::fmt::Display for ProcedureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcedureError::Rejected(rejection) => write!(f, "Rejected: {}", rejection),
            ProcedureError::Http(msg) => write!(f, "HTTP error: {}", msg),
            ProcedureError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for ProcedureError {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Not your turn", RemoteRejection::NotYourTurn)]
    #[case("Column 3 is full", RemoteRejection::ColumnFull)]
    #[case("Match is not in waiting state", RemoteRejection::NotWaiting)]
    #[case("Match already full", RemoteRejection::MatchFull)]
    #[case("Match is not playing", RemoteRejection::MatchNotPlaying)]
    #[case(
        "permission denied for table matches",
        RemoteRejection::Other("permission denied for table matches".to_string())
    )]
    fn test_classify_backend_messages(#[case] message: &str, #[case] expected: RemoteRejection) {
        assert_eq!(RemoteRejection::classify(message), expected);
    }

    #[test]
    fn test_rejection_display() {
        let err = ProcedureError::Rejected(RemoteRejection::ColumnFull);
        assert_eq!(err.to_string(), "Rejected: Column is full");
    }
}
