use std::{path::Path, time::Duration};

use {
    anyhow::{Result, bail},
    felis_qna::GrpcQnaClient,
    tracing::info,
};

const HEALTH_DEADLINE: Duration = Duration::from_secs(5);

/// Probe the backend once. An unhealthy backend is an error, so the process
/// exits non-zero.
pub async fn handle_health(config_path: Option<&Path>) -> Result<()> {
    let config = felis_config::discover_and_load(config_path)?;
    let client = GrpcQnaClient::connect_lazy(&config.backend)?;

    match felis_qna::probe(&client, HEALTH_DEADLINE).await {
        Ok(()) => {
            info!(backend = %config.backend.address, "backend healthy");
            println!("ok: backend at {} is healthy", config.backend.address);
            Ok(())
        },
        Err(e) => bail!("backend at {} is unhealthy: {e}", config.backend.address),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn unreachable_backend_is_an_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[backend]\naddress = \"http://127.0.0.1:1\"\nconnect_timeout_secs = 1\nmax_attempts = 1"
        )
        .unwrap();

        let err = handle_health(Some(file.path())).await.unwrap_err();
        assert!(err.to_string().contains("unhealthy"), "{err}");
    }
}
