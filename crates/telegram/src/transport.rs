use async_trait::async_trait;

use crate::Result;

/// How Telegram should interpret outgoing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Plain,
    Html,
}

/// Outgoing side of the chat platform, as the relay flows use it.
///
/// [`crate::outbound::TelegramTransport`] is the production implementation;
/// tests substitute an in-memory one.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a new message and return its message id.
    async fn send_text(&self, chat_id: i64, text: &str, render: RenderMode) -> Result<i32>;

    /// Replace the text of a message sent earlier.
    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        render: RenderMode,
    ) -> Result<()>;

    /// Turn a file reference into a URL the file can be downloaded from.
    async fn resolve_file_url(&self, file_id: &str) -> Result<String>;

    /// Fetch the bytes behind a URL from [`ChatTransport::resolve_file_url`].
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}
