//! Semantic validation of a loaded configuration.
//!
//! Parsing already guarantees the shape; this catches values that parse fine
//! but would make the relay misbehave at runtime (missing credentials, zero
//! timeouts, limits above what Telegram accepts).

use secrecy::ExposeSecret;

use crate::schema::FelisConfig;

/// Telegram rejects messages longer than this.
const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "relay.top_k"
    pub path: &'static str,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn error(&mut self, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            path,
            message: message.into(),
        });
    }

    fn warning(&mut self, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            path,
            message: message.into(),
        });
    }
}

/// Validate a fully loaded config (file + env overrides).
#[must_use]
pub fn validate(config: &FelisConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    let token = config.telegram.token.expose_secret();
    if token.trim().is_empty() {
        result.error(
            "telegram.token",
            "bot token is not set (set TELEGRAM_TOKEN or telegram.token)",
        );
    } else if !token.contains(':') {
        result.warning(
            "telegram.token",
            "token does not look like a BotFather token (<id>:<secret>)",
        );
    }
    if config.telegram.client_timeout_secs <= u64::from(config.telegram.poll_timeout_secs) {
        result.warning(
            "telegram.client_timeout_secs",
            "should exceed poll_timeout_secs or long polls will be cut short",
        );
    }

    let address = config.backend.address.trim();
    if address.is_empty() {
        result.error("backend.address", "backend address is not set");
    } else if !(address.starts_with("http://") || address.starts_with("https://")) {
        result.error(
            "backend.address",
            format!("'{address}' must use the http:// or https:// scheme"),
        );
    }
    if config.backend.max_attempts == 0 {
        result.error("backend.max_attempts", "must be at least 1");
    }

    let relay = &config.relay;
    if relay.top_k <= 0 {
        result.error("relay.top_k", "must be a positive number of chunks");
    }
    for (path, secs) in [
        ("relay.query_timeout_secs", relay.query_timeout_secs),
        ("relay.direct_timeout_secs", relay.direct_timeout_secs),
        ("relay.upload_timeout_secs", relay.upload_timeout_secs),
        ("relay.admin_timeout_secs", relay.admin_timeout_secs),
    ] {
        if secs == 0 {
            result.error(path, "timeout must be greater than zero");
        }
    }
    if relay.direct_timeout_secs > relay.query_timeout_secs {
        result.warning(
            "relay.direct_timeout_secs",
            "direct answers are expected to be faster than retrieval queries",
        );
    }
    if relay.snippet_chars == 0 {
        result.error("relay.snippet_chars", "must be greater than zero");
    }
    if relay.max_message_chars == 0 {
        result.error("relay.max_message_chars", "must be greater than zero");
    } else if relay.max_message_chars > TELEGRAM_MESSAGE_LIMIT {
        result.error(
            "relay.max_message_chars",
            format!("Telegram rejects messages above {TELEGRAM_MESSAGE_LIMIT} characters"),
        );
    }
    if relay.max_concurrent_updates == Some(0) {
        result.error(
            "relay.max_concurrent_updates",
            "a cap of zero would stall every update; remove it to disable the cap",
        );
    }

    result
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use secrecy::Secret;

    use super::*;

    fn valid_config() -> FelisConfig {
        let mut cfg = FelisConfig::default();
        cfg.telegram.token = Secret::new("123:ABC".into());
        cfg
    }

    #[test]
    fn default_with_token_is_clean() {
        let result = validate(&valid_config());
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn missing_token_is_an_error() {
        let result = validate(&FelisConfig::default());
        assert!(result.has_errors());
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "telegram.token" && d.severity == Severity::Error)
        );
    }

    #[test]
    fn odd_token_is_only_a_warning() {
        let mut cfg = valid_config();
        cfg.telegram.token = Secret::new("not-a-token".into());
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
    }

    #[test]
    fn address_without_scheme_is_an_error() {
        let mut cfg = valid_config();
        cfg.backend.address = "ml-service:50051".into();
        assert!(validate(&cfg).has_errors());
    }

    #[test]
    fn zero_timeouts_and_limits_are_errors() {
        let mut cfg = valid_config();
        cfg.relay.query_timeout_secs = 0;
        cfg.relay.direct_timeout_secs = 0;
        cfg.relay.snippet_chars = 0;
        cfg.relay.max_concurrent_updates = Some(0);
        let result = validate(&cfg);
        assert_eq!(result.count(Severity::Error), 4);
    }

    #[test]
    fn message_cap_above_telegram_limit_is_an_error() {
        let mut cfg = valid_config();
        cfg.relay.max_message_chars = 5000;
        let result = validate(&cfg);
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "relay.max_message_chars")
        );
    }

    #[test]
    fn diagnostic_display_includes_path() {
        let result = validate(&FelisConfig::default());
        let rendered = result.diagnostics[0].to_string();
        assert!(rendered.starts_with("error [telegram.token]"));
    }
}
