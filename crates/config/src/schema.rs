use {
    felis_common::Mode,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FelisConfig {
    pub telegram: TelegramConfig,
    pub backend: BackendConfig,
    pub relay: RelayConfig,
}

/// Telegram bot credentials and polling behaviour.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Long-polling timeout passed to `getUpdates` (seconds).
    pub poll_timeout_secs: u32,

    /// HTTP client timeout; must exceed the long-polling timeout so the
    /// client doesn't abort the request before Telegram responds.
    pub client_timeout_secs: u64,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("client_timeout_secs", &self.client_timeout_secs)
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            poll_timeout_secs: 30,
            client_timeout_secs: 45,
        }
    }
}

/// Connection to the QnA backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// gRPC endpoint, e.g. `http://ml-service:50051`.
    pub address: String,
    pub connect_timeout_secs: u64,
    /// Total attempts (first try included) for retryable gRPC statuses.
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles on each further attempt.
    pub initial_backoff_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            address: "http://ml-service:50051".into(),
            connect_timeout_secs: 10,
            max_attempts: 3,
            initial_backoff_ms: 100,
        }
    }
}

/// Dispatch, flow timeouts and reply formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Mode assigned to users the relay has not seen yet.
    pub default_mode: Mode,
    /// Number of context chunks requested per retrieval query.
    pub top_k: i32,
    pub query_timeout_secs: u64,
    pub direct_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub admin_timeout_secs: u64,
    /// Per-snippet character budget when sources are shown.
    pub snippet_chars: usize,
    /// Hard cap on a composed reply, in characters.
    pub max_message_chars: usize,
    /// Optional cap on concurrently handled updates. Unset means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_updates: Option<usize>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_mode: Mode::Offline,
            top_k: 2,
            query_timeout_secs: 300,
            direct_timeout_secs: 30,
            upload_timeout_secs: 120,
            admin_timeout_secs: 15,
            snippet_chars: 300,
            max_message_chars: 4000,
            max_concurrent_updates: None,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = FelisConfig::default();
        assert_eq!(cfg.relay.default_mode, Mode::Offline);
        assert_eq!(cfg.relay.top_k, 2);
        assert_eq!(cfg.relay.query_timeout_secs, 300);
        assert_eq!(cfg.relay.max_message_chars, 4000);
        assert_eq!(cfg.backend.max_attempts, 3);
        assert!(cfg.telegram.token.expose_secret().is_empty());
    }

    #[test]
    fn deserialize_partial_toml() {
        let raw = r#"
            [telegram]
            token = "123:ABC"

            [relay]
            default_mode = "online"
            max_concurrent_updates = 5
        "#;
        let cfg: FelisConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.telegram.token.expose_secret(), "123:ABC");
        assert_eq!(cfg.relay.default_mode, Mode::Online);
        assert_eq!(cfg.relay.max_concurrent_updates, Some(5));
        // defaults for unspecified fields
        assert_eq!(cfg.telegram.poll_timeout_secs, 30);
        assert_eq!(cfg.backend.address, "http://ml-service:50051");
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = TelegramConfig {
            token: Secret::new("super-secret".into()),
            ..Default::default()
        };
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("[REDACTED]"));
    }
}
