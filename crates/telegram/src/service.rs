use std::sync::Arc;

use {
    felis_config::FelisConfig,
    felis_qna::QnaBackend,
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use crate::{
    bot,
    config::RelaySettings,
    dispatch::Dispatcher,
    handlers::Relay,
    outbound::TelegramTransport,
    state::UserStateStore,
};

/// Updates buffered between the polling loop and the dispatcher.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Run the relay until `cancel` fires, then wait for running tasks.
///
/// Returns once polling has stopped and every spawned task has finished
/// or timed out.
pub async fn run(
    config: &FelisConfig,
    backend: Arc<dyn QnaBackend>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let bot = bot::build_bot(&config.telegram)?;
    bot::prepare(&bot).await?;

    let settings = RelaySettings::from(&config.relay);
    let store = Arc::new(UserStateStore::new(settings.default_mode));
    let transport = Arc::new(TelegramTransport::new(bot.clone()));
    let relay = Arc::new(Relay::new(transport, backend, Arc::clone(&store), settings.clone()));
    let dispatcher = Dispatcher::new(relay, settings.max_concurrent_updates);

    let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
    let poller = bot::spawn_polling(bot, config.telegram.poll_timeout_secs, tx, cancel.clone());

    dispatcher.run(rx, cancel.clone()).await;

    // The dispatcher may also stop because polling ended on its own.
    cancel.cancel();
    if let Err(e) = poller.await {
        warn!(error = %e, "polling task ended abnormally");
    }

    info!(running = dispatcher.running(), "waiting for running updates to finish");
    dispatcher.drain().await;
    info!(users = store.user_count(), "relay stopped");
    Ok(())
}
