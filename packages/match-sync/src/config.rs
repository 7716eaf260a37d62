use std::env;
use std::time::Duration;

/// Connection settings for the hosted backend (REST, procedures and realtime).
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://abc.example.co`
    pub base_url: String,
    /// Public API key sent with every request
    pub anon_key: String,
    /// Signed-in user's access token. Falls back to the anon key when absent.
    pub access_token: Option<String>,
    /// Identity of the signed-in player
    pub player_id: Option<String>,
    /// Explicit realtime endpoint; derived from `base_url` when `None`
    pub realtime_url: Option<String>,
    pub heartbeat_interval: Duration,
    pub join_timeout: Duration,
    /// Buffered pushes per subscription before the transport waits on the reader
    pub feed_capacity: usize,
    /// Push notification application id
    pub push_app_id: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
            access_token: None,
            player_id: None,
            realtime_url: None,
            heartbeat_interval: Duration::from_secs(25),
            join_timeout: Duration::from_secs(10),
            feed_capacity: 64,
            push_app_id: None,
        }
    }
}

impl BackendConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base_url) = env::var("MATCH_BACKEND_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }

        if let Ok(anon_key) = env::var("MATCH_BACKEND_ANON_KEY") {
            config.anon_key = anon_key;
        }

        if let Ok(token) = env::var("MATCH_ACCESS_TOKEN") {
            config.access_token = Some(token);
        }

        if let Ok(player_id) = env::var("MATCH_PLAYER_ID") {
            config.player_id = Some(player_id);
        }

        if let Ok(realtime_url) = env::var("MATCH_REALTIME_URL") {
            config.realtime_url = Some(realtime_url);
        }

        if let Ok(secs) = env::var("MATCH_HEARTBEAT_SECONDS") {
            // The heartbeat timer needs a non-zero period.
            if let Ok(secs) = secs.parse::<u64>() {
                config.heartbeat_interval = Duration::from_secs(secs.max(1));
            }
        }

        if let Ok(secs) = env::var("MATCH_JOIN_TIMEOUT_SECONDS") {
            if let Ok(secs) = secs.parse() {
                config.join_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(capacity) = env::var("MATCH_FEED_CAPACITY") {
            if let Ok(capacity) = capacity.parse::<usize>() {
                config.feed_capacity = capacity.max(1);
            }
        }

        if let Ok(app_id) = env::var("MATCH_PUSH_APP_ID") {
            config.push_app_id = Some(app_id);
        }

        config
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_player_id(mut self, player_id: &str) -> Self {
        self.player_id = Some(player_id.to_string());
        self
    }

    /// Websocket endpoint of the realtime service.
    pub fn realtime_endpoint(&self) -> String {
        if let Some(url) = &self.realtime_url {
            return url.trim_end_matches('/').to_string();
        }

        let base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        };
        format!("{}/realtime/v1", base)
    }

    /// Bearer token for requests made on behalf of the player.
    pub fn bearer_token(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.anon_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BackendConfig::default();

        assert_eq!(config.base_url, "http://localhost:54321");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(25));
        assert_eq!(config.feed_capacity, 64);
        assert!(config.player_id.is_none());
    }

    #[test]
    fn test_realtime_endpoint_is_derived_from_base_url() {
        let config = BackendConfig::default().with_base_url("https://abc.example.co/");
        assert_eq!(config.realtime_endpoint(), "wss://abc.example.co/realtime/v1");

        let config = BackendConfig::default().with_base_url("http://127.0.0.1:54321");
        assert_eq!(config.realtime_endpoint(), "ws://127.0.0.1:54321/realtime/v1");
    }

    #[test]
    fn test_explicit_realtime_endpoint_wins() {
        let config = BackendConfig {
            realtime_url: Some("wss://realtime.example.co/socket/".to_string()),
            ..BackendConfig::default()
        };

        assert_eq!(config.realtime_endpoint(), "wss://realtime.example.co/socket");
    }

    #[tokio::test]
    async fn test_zero_heartbeat_from_env_is_clamped() {
        env::set_var("MATCH_HEARTBEAT_SECONDS", "0");
        let config = BackendConfig::from_env();
        env::remove_var("MATCH_HEARTBEAT_SECONDS");

        assert_eq!(config.heartbeat_interval, Duration::from_secs(1));

        // The realtime task builds its heartbeat timer from this value.
        let period = config.heartbeat_interval;
        let ticker = tokio::spawn(async move {
            let mut heartbeat = tokio::time::interval(period);
            heartbeat.tick().await;
        });
        assert!(ticker.await.is_ok());
    }

    #[test]
    fn test_bearer_falls_back_to_anon_key() {
        let mut config = BackendConfig {
            anon_key: "anon".to_string(),
            ..BackendConfig::default()
        };
        assert_eq!(config.bearer_token(), "anon");

        config.access_token = Some("user-token".to_string());
        assert_eq!(config.bearer_token(), "user-token");
    }
}
