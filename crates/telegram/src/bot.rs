use std::time::Duration;

use {
    felis_config::TelegramConfig,
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, MediaKind, MessageKind, UpdateKind},
    },
    tokio::{sync::mpsc, task::JoinHandle},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    replies,
    update::{Action, DocumentRef, Inbound},
};

const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// File name used when Telegram does not report one.
const FALLBACK_FILE_NAME: &str = "document";

/// Build the bot client.
///
/// The HTTP client timeout must exceed the long-polling timeout so the
/// client doesn't abort the request before Telegram responds.
pub fn build_bot(config: &TelegramConfig) -> anyhow::Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(config.client_timeout_secs))
        .build()?;
    Ok(Bot::with_client(config.token.expose_secret(), client))
}

/// Verify credentials, clear any webhook and register the command list.
/// Returns the bot username.
pub async fn prepare(bot: &Bot) -> anyhow::Result<Option<String>> {
    let me = bot.get_me().await?;
    let username = me.username.clone();

    // Delete any existing webhook so long polling works.
    bot.delete_webhook().send().await?;

    let commands: Vec<BotCommand> = replies::COMMANDS
        .iter()
        .map(|(command, description)| BotCommand::new(*command, *description))
        .collect();
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!(error = %e, "failed to register bot commands");
    }

    info!(username = ?username, "telegram bot connected (webhook cleared)");
    Ok(username)
}

/// Long-poll Telegram and forward each relevant update into `updates`.
///
/// Stops when `cancel` fires, when the receiving side is dropped, or when
/// another instance takes over the token (which also cancels `cancel`).
pub fn spawn_polling(
    bot: Bot,
    poll_timeout_secs: u32,
    updates: mpsc::Sender<Inbound>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("starting telegram polling loop");
        let mut offset: i32 = 0;

        loop {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = bot
                    .get_updates()
                    .offset(offset)
                    .timeout(poll_timeout_secs)
                    .allowed_updates(vec![AllowedUpdate::Message])
                    .send() => result,
            };

            match result {
                Ok(batch) => {
                    debug!(count = batch.len(), "got telegram updates");
                    for update in batch {
                        offset = update.id.as_offset();
                        let UpdateKind::Message(msg) = update.kind else {
                            debug!("ignoring non-message update");
                            continue;
                        };
                        let Some(inbound) = inbound_from_message(&msg) else {
                            debug!(chat_id = msg.chat.id.0, "ignoring message without text or document");
                            continue;
                        };
                        if updates.send(inbound).await.is_err() {
                            info!("update receiver dropped, stopping polling");
                            return;
                        }
                    }
                },
                Err(e) => {
                    if matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) {
                        warn!("telegram polling disabled: another instance is already running with this token");
                        cancel.cancel();
                        break;
                    }

                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(POLL_ERROR_BACKOFF) => {},
                    }
                },
            }
        }

        info!("telegram polling stopped");
    })
}

/// Reduce a Telegram message to what the relay acts on.
///
/// Messages without a sender, or with neither a document nor non-blank
/// text, yield `None`.
pub fn inbound_from_message(msg: &Message) -> Option<Inbound> {
    let user_id = msg.from.as_ref()?.id.0.to_string();
    let chat_id = msg.chat.id.0;

    let action = match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Document(d) => Action::Document(DocumentRef {
                file_id: d.document.file.id.clone(),
                file_name: d
                    .document
                    .file_name
                    .clone()
                    .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string()),
            }),
            MediaKind::Text(t) => Action::parse_text(&t.text)?,
            _ => return None,
        },
        _ => return None,
    };

    Some(Inbound {
        user_id,
        chat_id,
        action,
    })
}
