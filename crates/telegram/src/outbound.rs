use std::{future::Future, time::Duration};

use {
    async_trait::async_trait,
    teloxide::{
        ApiError, RequestError,
        payloads::{EditMessageTextSetters, SendMessageSetters},
        prelude::*,
        types::{ChatId, MessageId, ParseMode},
    },
    tracing::{debug, warn},
};

use crate::{
    Error, Result,
    transport::{ChatTransport, RenderMode},
};

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// [`ChatTransport`] backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
    http: reqwest::Client,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            http: reqwest::Client::new(),
        }
    }

    async fn send_with_fallback(&self, chat_id: ChatId, text: &str) -> Result<MessageId> {
        match self
            .run_with_retry(chat_id, "send message (html)", || {
                let req = self
                    .bot
                    .send_message(chat_id, text)
                    .parse_mode(ParseMode::Html);
                async move { req.await }
            })
            .await
        {
            Ok(message) => Ok(message.id),
            Err(e) => {
                warn!(
                    chat_id = chat_id.0,
                    error = %e,
                    "telegram HTML send failed, retrying as plain text"
                );
                let message = self.send_plain(chat_id, text).await?;
                Ok(message)
            },
        }
    }

    async fn send_plain(&self, chat_id: ChatId, text: &str) -> Result<MessageId> {
        let message = self
            .run_with_retry(chat_id, "send message (plain)", || {
                let req = self.bot.send_message(chat_id, text);
                async move { req.await }
            })
            .await?;
        Ok(message.id)
    }

    async fn edit_with_fallback(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> Result<()> {
        match self
            .run_with_retry(chat_id, "edit message (html)", || {
                let req = self
                    .bot
                    .edit_message_text(chat_id, message_id, text)
                    .parse_mode(ParseMode::Html);
                async move { req.await }
            })
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_message_not_modified_error(&e) => Ok(()),
            Err(e) => {
                warn!(
                    chat_id = chat_id.0,
                    error = %e,
                    "telegram HTML edit failed, retrying as plain text"
                );
                self.edit_plain(chat_id, message_id, text).await
            },
        }
    }

    async fn edit_plain(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> Result<()> {
        match self
            .run_with_retry(chat_id, "edit message (plain)", || {
                let req = self.bot.edit_message_text(chat_id, message_id, text);
                async move { req.await }
            })
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_message_not_modified_error(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn run_with_retry<T, F, Fut>(
        &self,
        chat_id: ChatId,
        operation: &'static str,
        mut request: F,
    ) -> std::result::Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err);
                    };

                    if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            chat_id = chat_id.0,
                            operation,
                            retries,
                            max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err);
                    }

                    retries += 1;
                    warn!(
                        chat_id = chat_id.0,
                        operation,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: i64, text: &str, render: RenderMode) -> Result<i32> {
        let chat_id = ChatId(chat_id);
        let message_id = match render {
            RenderMode::Html => self.send_with_fallback(chat_id, text).await?,
            RenderMode::Plain => self.send_plain(chat_id, text).await?,
        };
        debug!(chat_id = chat_id.0, message_id = message_id.0, "telegram message sent");
        Ok(message_id.0)
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        render: RenderMode,
    ) -> Result<()> {
        let chat_id = ChatId(chat_id);
        let message_id = MessageId(message_id);
        match render {
            RenderMode::Html => self.edit_with_fallback(chat_id, message_id, text).await,
            RenderMode::Plain => self.edit_plain(chat_id, message_id, text).await,
        }
    }

    async fn resolve_file_url(&self, file_id: &str) -> Result<String> {
        let file = self.bot.get_file(file_id).await?;
        // Telegram file URL format: https://api.telegram.org/file/bot<token>/<file_path>
        Ok(format!(
            "https://api.telegram.org/file/bot{}/{}",
            self.bot.token(),
            file.path
        ))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::message(format!(
                "failed to download file: HTTP {}",
                response.status()
            )));
        }
        let data = response.bytes().await?.to_vec();
        Ok(data)
    }
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

fn is_message_not_modified_error(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::MessageNotModified))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_duration_extracts_wait() {
        let err = RequestError::RetryAfter(teloxide::types::Seconds::from_seconds(42));
        assert_eq!(retry_after_duration(&err), Some(Duration::from_secs(42)));
    }

    #[test]
    fn retry_after_duration_ignores_other_errors() {
        let err = RequestError::Io(std::io::Error::other("boom"));
        assert_eq!(retry_after_duration(&err), None);
    }

    #[test]
    fn is_message_not_modified_error_detects_variant() {
        let err = RequestError::Api(ApiError::MessageNotModified);
        assert!(is_message_not_modified_error(&err));
    }

    #[test]
    fn is_message_not_modified_error_ignores_other_errors() {
        let err = RequestError::Api(ApiError::BotBlocked);
        assert!(!is_message_not_modified_error(&err));
    }

    #[tokio::test]
    async fn download_rejects_unreachable_url() {
        let transport = TelegramTransport::new(Bot::new("123:test-token"));
        let result = transport.download("http://127.0.0.1:1/file").await;
        assert!(result.is_err());
    }
}
