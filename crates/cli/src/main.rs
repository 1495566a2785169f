mod config_commands;
mod health_commands;

use std::{path::PathBuf, sync::Arc};

use {
    clap::{Parser, Subcommand},
    felis_qna::GrpcQnaClient,
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "felis", about = "Felis: Telegram relay for a document QnA backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to use instead of searching ./ and ~/.config/felis/.
    #[arg(long, global = true, env = "FELIS_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay (default when no subcommand is provided).
    Run,
    /// Check that the QnA backend answers; exits non-zero when it does not.
    Health,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    match cli.command {
        None | Some(Commands::Run) => run(cli.config.as_deref()).await,
        Some(Commands::Health) => health_commands::handle_health(cli.config.as_deref()).await,
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
    }
}

async fn run(config_path: Option<&std::path::Path>) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "felis starting");

    let config = felis_config::discover_and_load(config_path)?;
    let validation = felis_config::validate(&config);
    for diagnostic in &validation.diagnostics {
        match diagnostic.severity {
            felis_config::Severity::Error => error!("{diagnostic}"),
            felis_config::Severity::Warning => warn!("{diagnostic}"),
        }
    }
    if validation.has_errors() {
        anyhow::bail!(
            "invalid configuration ({} error(s)); run `felis config check` for details",
            validation.count(felis_config::Severity::Error)
        );
    }

    info!(
        backend = %config.backend.address,
        default_mode = %config.relay.default_mode,
        max_concurrent_updates = ?config.relay.max_concurrent_updates,
        "configuration loaded"
    );

    let backend = Arc::new(GrpcQnaClient::connect_lazy(&config.backend)?);

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(cancel.clone()));

    felis_telegram::service::run(&config, backend, cancel).await?;
    info!("felis stopped");
    Ok(())
}

async fn shutdown_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                    () = cancel.cancelled() => return,
                }
            },
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("received Ctrl+C, shutting down"),
                    () = cancel.cancelled() => return,
                }
            },
        }
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received Ctrl+C, shutting down"),
            () = cancel.cancelled() => return,
        }
    }

    cancel.cancel();
}
