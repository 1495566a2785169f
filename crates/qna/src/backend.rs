use std::time::Duration;

use {async_trait::async_trait, felis_common::Mode};

use crate::{Result, types::QueryResult};

/// User id sent with direct (online) queries, which carry no per-user context.
pub const DIRECT_QUERY_USER_ID: &str = "direct";

/// User id used by [`probe`]; the backend keeps no documents for it.
pub const HEALTH_CHECK_USER_ID: &str = "health_check";

/// Request/response operations offered by the QnA backend.
///
/// Every call takes the deadline the caller is willing to wait; the
/// implementation must give up once it has elapsed.
#[async_trait]
pub trait QnaBackend: Send + Sync {
    /// Store a document for `user_id`; returns the backend document id.
    async fn upload_document(
        &self,
        user_id: &str,
        filename: &str,
        data: Vec<u8>,
        deadline: Duration,
    ) -> Result<String>;

    /// Retrieval-augmented question over the user's documents.
    async fn query(
        &self,
        user_id: &str,
        question: &str,
        top_k: i32,
        deadline: Duration,
    ) -> Result<QueryResult>;

    /// Ask the model directly, without retrieval. May return an empty answer.
    async fn direct_query(&self, question: &str, deadline: Duration) -> Result<String>;

    /// Titles of the documents stored for `user_id`.
    async fn list_documents(&self, user_id: &str, deadline: Duration) -> Result<Vec<String>>;

    /// Remove every document stored for `user_id`.
    async fn clear_documents(&self, user_id: &str, deadline: Duration) -> Result<()>;

    /// Switch the backend answering mode.
    async fn set_mode(&self, mode: Mode, deadline: Duration) -> Result<()>;
}

/// Issue a minimal retrieval query to check the backend answers at all.
///
/// An empty answer still counts as healthy; only a failed call does not.
pub async fn probe(backend: &dyn QnaBackend, deadline: Duration) -> Result<()> {
    backend
        .query(HEALTH_CHECK_USER_ID, "test", 1, deadline)
        .await
        .map(|_| ())
}
