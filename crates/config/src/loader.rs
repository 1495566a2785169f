use std::path::{Path, PathBuf};

use {
    felis_common::Mode,
    secrecy::Secret,
    tracing::{debug, info},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::FelisConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["felis.toml", "felis.yaml", "felis.yml", "felis.json"];

/// Environment variable holding the Telegram bot token.
pub const ENV_TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
/// Environment variable holding the backend gRPC address.
pub const ENV_GRPC_ADDR: &str = "GRPC_ADDR";
/// Environment variable holding the default user mode.
pub const ENV_DEFAULT_MODE: &str = "FELIS_DEFAULT_MODE";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<FelisConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config, then apply environment overrides.
///
/// Search order:
/// 1. `explicit` when given (must exist)
/// 2. `./felis.{toml,yaml,yml,json}` (project-local)
/// 3. `~/.config/felis/felis.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `FelisConfig::default()` when no file is found. A file that
/// exists but fails to parse is an error, not a silent fallback.
pub fn discover_and_load(explicit: Option<&Path>) -> Result<FelisConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    let mut config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            let cfg = load_config(&path)?;
            info!(path = %path.display(), "config loaded");
            cfg
        },
        None => {
            debug!("no config file found, using defaults");
            FelisConfig::default()
        },
    };

    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Apply `TELEGRAM_TOKEN`, `GRPC_ADDR` and `FELIS_DEFAULT_MODE` on top of the
/// file-based config.
pub fn apply_env_overrides(config: &mut FelisConfig) -> Result<()> {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    config: &mut FelisConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = lookup(ENV_TELEGRAM_TOKEN) {
        config.telegram.token = Secret::new(token.trim().to_string());
    }
    if let Some(addr) = lookup(ENV_GRPC_ADDR) {
        config.backend.address = addr.trim().to_string();
    }
    if let Some(mode) = lookup(ENV_DEFAULT_MODE) {
        config.relay.default_mode = mode.parse::<Mode>()?;
    }

    config.backend.address = normalize_backend_address(&config.backend.address);
    Ok(())
}

/// tonic needs a URI with a scheme; the conventional `host:port` form gets
/// `http://` prepended.
#[must_use]
pub fn normalize_backend_address(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed.is_empty() || trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/felis/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "felis").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> Result<FelisConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}
