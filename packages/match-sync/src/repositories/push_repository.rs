use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

#[derive(Debug)]
pub enum PushProviderError {
    Init(String),
    Permission(String),
    Tagging(String),
}

impl std::fmt::Display for PushProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushProviderError::Init(msg) => write!(f, "Push provider init failed: {}", msg),
            PushProviderError::Permission(msg) => write!(f, "Permission request failed: {}", msg),
            PushProviderError::Tagging(msg) => write!(f, "Tagging failed: {}", msg),
        }
    }
}

impl std::error::Error for PushProviderError {}

/// Third-party push notification SDK. `init` must run at most once per process.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn init(&self, app_id: &str) -> Result<(), PushProviderError>;
    async fn permission_granted(&self) -> bool;
    async fn request_permission(&self) -> Result<bool, PushProviderError>;
    async fn add_tag(&self, key: &str, value: &str) -> Result<(), PushProviderError>;
}
