#[derive(Debug)]
pub enum RealtimeError {
    Connect(String),
    JoinRejected(String),
    Timeout,
    Protocol(String),
    Closed,
}

impl std::fmt::Display for RealtimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RealtimeError::Connect(msg) => write!(f, "Realtime connection error: {}", msg),
            RealtimeError::JoinRejected(msg) => write!(f, "Channel join rejected: {}", msg),
            RealtimeError::Timeout => write!(f, "Timed out attaching to channel"),
            RealtimeError::Protocol(msg) => write!(f, "Realtime protocol error: {}", msg),
            RealtimeError::Closed => write!(f, "Realtime connection closed"),
        }
    }
}

impl std::error::Error for RealtimeError {}
