use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::repositories::push_repository::PushProvider;
use crate::services::errors::notification_service_errors::NotificationServiceError;

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const INITIALIZED: u8 = 2;

/// Process-wide init-once flag.
#[derive(Debug)]
pub struct InitOnce {
    state: AtomicU8,
}

impl InitOnce {
    pub const fn new() -> Self {
        InitOnce {
            state: AtomicU8::new(UNINITIALIZED),
        }
    }

    /// Claims the right to initialise. Only one caller ever gets `true` until
    /// a failed attempt releases the flag.
    fn try_begin(&self) -> bool {
        self.state
            .compare_exchange(
                UNINITIALIZED,
                INITIALIZING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    fn finish(&self, succeeded: bool) {
        let next = if succeeded { INITIALIZED } else { UNINITIALIZED };
        self.state.store(next, Ordering::Release);
    }

    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == INITIALIZED
    }
}

impl Default for InitOnce {
    fn default() -> Self {
        Self::new()
    }
}

static PUSH_PROVIDER_INIT: InitOnce = InitOnce::new();

const HOSTED_MATCH_TAG: &str = "hosted_match_id";

pub struct NotificationService {
    provider: Arc<dyn PushProvider + Send + Sync>,
    app_id: Option<String>,
    init: &'static InitOnce,
}

impl NotificationService {
    pub fn new(provider: Arc<dyn PushProvider + Send + Sync>, app_id: Option<String>) -> Self {
        Self::with_flag(provider, app_id, &PUSH_PROVIDER_INIT)
    }

    pub fn with_flag(
        provider: Arc<dyn PushProvider + Send + Sync>,
        app_id: Option<String>,
        init: &'static InitOnce,
    ) -> Self {
        NotificationService {
            provider,
            app_id,
            init,
        }
    }

    /// Initialises the provider unless another call already did (or is doing
    /// so). Returns whether this call performed the initialisation.
    pub async fn ensure_initialized(&self) -> Result<bool, NotificationServiceError> {
        let app_id = self
            .app_id
            .as_deref()
            .ok_or(NotificationServiceError::NotConfigured)?;

        if !self.init.try_begin() {
            debug!("Push provider already initialised");
            return Ok(false);
        }

        match self.provider.init(app_id).await {
            Ok(()) => {
                self.init.finish(true);
                info!("Push provider initialised");
                Ok(true)
            }
            Err(e) => {
                self.init.finish(false);
                warn!("Push provider init failed: {}", e);
                Err(e.into())
            }
        }
    }

    pub async fn request_permission(&self) -> Result<bool, NotificationServiceError> {
        self.ensure_initialized().await?;

        if self.provider.permission_granted().await {
            return Ok(true);
        }

        self.provider.request_permission().await.map_err(|e| {
            warn!("Notification permission request failed: {}", e);
            NotificationServiceError::from(e)
        })
    }

    /// Tags this device so the host is notified when someone joins.
    pub async fn subscribe_to_lobby(&self, match_id: &str) -> Result<(), NotificationServiceError> {
        self.ensure_initialized().await?;

        self.provider
            .add_tag(HOSTED_MATCH_TAG, match_id)
            .await
            .map_err(|e| {
                warn!("Could not tag device for match {}: {}", match_id, e);
                NotificationServiceError::from(e)
            })?;
        debug!("Device tagged with {}={}", HOSTED_MATCH_TAG, match_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::push_repository::{MockPushProvider, PushProviderError};

    fn fresh_flag() -> &'static InitOnce {
        Box::leak(Box::new(InitOnce::new()))
    }

    fn service(provider: MockPushProvider, flag: &'static InitOnce) -> NotificationService {
        NotificationService::with_flag(Arc::new(provider), Some("app-1".to_string()), flag)
    }

    #[tokio::test]
    async fn test_initialises_once_across_callers() {
        let mut provider = MockPushProvider::new();
        provider
            .expect_init()
            .withf(|app_id: &str| app_id == "app-1")
            .times(1)
            .returning(|_| Ok(()));
        let flag = fresh_flag();
        let service = service(provider, flag);

        let (first, second) = tokio::join!(
            service.ensure_initialized(),
            service.ensure_initialized()
        );

        assert_eq!(
            [first.unwrap(), second.unwrap()].iter().filter(|did| **did).count(),
            1
        );
        assert!(flag.is_initialized());
        assert!(!service.ensure_initialized().await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_init_can_be_retried() {
        let mut attempts = 0;
        let mut provider = MockPushProvider::new();
        provider.expect_init().times(2).returning(move |_| {
            attempts += 1;
            if attempts == 1 {
                Err(PushProviderError::Init("sdk not ready".to_string()))
            } else {
                Ok(())
            }
        });
        let flag = fresh_flag();
        let service = service(provider, flag);

        assert!(service.ensure_initialized().await.is_err());
        assert!(!flag.is_initialized());
        assert!(service.ensure_initialized().await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_app_id_is_not_configured() {
        let mut provider = MockPushProvider::new();
        provider.expect_init().times(0);
        let service = NotificationService::with_flag(Arc::new(provider), None, fresh_flag());

        assert!(matches!(
            service.ensure_initialized().await,
            Err(NotificationServiceError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_permission_skips_prompt_when_granted() {
        let mut provider = MockPushProvider::new();
        provider.expect_init().returning(|_| Ok(()));
        provider.expect_permission_granted().returning(|| true);
        provider.expect_request_permission().times(0);

        assert!(service(provider, fresh_flag())
            .request_permission()
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_subscribe_to_lobby_tags_hosted_match() {
        let mut provider = MockPushProvider::new();
        provider.expect_init().returning(|_| Ok(()));
        provider
            .expect_add_tag()
            .withf(|key: &str, value: &str| key == "hosted_match_id" && value == "m1")
            .times(1)
            .returning(|_, _| Ok(()));

        service(provider, fresh_flag())
            .subscribe_to_lobby("m1")
            .await
            .unwrap();
    }
}
