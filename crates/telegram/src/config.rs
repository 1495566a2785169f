use std::time::Duration;

use {felis_common::Mode, felis_config::RelayConfig};

use crate::format::FormatLimits;

/// Deadlines per flow. Retrieval is minutes-scale, direct answers
/// seconds-scale, administrative calls short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowTimeouts {
    pub query: Duration,
    pub direct: Duration,
    pub upload: Duration,
    pub admin: Duration,
}

/// Runtime settings of the relay, resolved from [`RelayConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    pub default_mode: Mode,
    pub top_k: i32,
    pub timeouts: FlowTimeouts,
    pub format: FormatLimits,
    pub max_concurrent_updates: Option<usize>,
}

impl From<&RelayConfig> for RelaySettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            default_mode: config.default_mode,
            top_k: config.top_k,
            timeouts: FlowTimeouts {
                query: Duration::from_secs(config.query_timeout_secs),
                direct: Duration::from_secs(config.direct_timeout_secs),
                upload: Duration::from_secs(config.upload_timeout_secs),
                admin: Duration::from_secs(config.admin_timeout_secs),
            },
            format: FormatLimits {
                snippet_chars: config.snippet_chars,
                max_message_chars: config.max_message_chars,
            },
            max_concurrent_updates: config.max_concurrent_updates,
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}
