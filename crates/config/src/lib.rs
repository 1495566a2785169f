//! Configuration loading, env substitution, env overrides and validation.
//!
//! Config files: `felis.toml`, `felis.yaml`, or `felis.json`
//! Searched in `./` then `~/.config/felis/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw
//! file, then `TELEGRAM_TOKEN`, `GRPC_ADDR` and `FELIS_DEFAULT_MODE` override
//! the parsed values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{
        apply_env_overrides, config_dir, discover_and_load, find_config_file, load_config,
        normalize_backend_address,
    },
    schema::{BackendConfig, FelisConfig, RelayConfig, TelegramConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
