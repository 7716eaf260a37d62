use crate::repositories::push_repository::PushProviderError;

#[derive(Debug)]
pub enum NotificationServiceError {
    NotConfigured,
    ProviderError(PushProviderError),
}

impl std::fmt::Display for NotificationServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationServiceError::NotConfigured => {
                write!(f, "Push notifications are not configured")
            }
            NotificationServiceError::ProviderError(err) => write!(f, "Provider error: {}", err),
        }
    }
}

impl std::error::Error for NotificationServiceError {}

impl From<PushProviderError> for NotificationServiceError {
    fn from(err: PushProviderError) -> Self {
        NotificationServiceError::ProviderError(err)
    }
}
