use std::time::Duration;

use {
    async_trait::async_trait,
    felis_common::Mode,
    felis_config::BackendConfig,
    tonic::{
        Code, Status,
        client::Grpc,
        transport::{Channel, Endpoint},
    },
    tracing::{debug, warn},
};

use crate::{
    Error, Result,
    backend::{DIRECT_QUERY_USER_ID, QnaBackend},
    proto::{self, paths},
    types::QueryResult,
};

/// Exponential backoff for transient gRPC failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
        }
    }
}

impl From<&BackendConfig> for RetryPolicy {
    fn from(config: &BackendConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `retry` (1-based): `initial * 2^(retry-1)`.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(factor)
    }

    /// Statuses worth another attempt: the request most likely never reached
    /// a healthy server.
    #[must_use]
    pub fn is_retryable(code: Code) -> bool {
        matches!(code, Code::Unavailable | Code::ResourceExhausted)
    }
}

/// [`QnaBackend`] over a tonic channel to the `fm.QnA` service.
#[derive(Clone)]
pub struct GrpcQnaClient {
    inner: Grpc<Channel>,
    retry: RetryPolicy,
}

impl GrpcQnaClient {
    pub fn new(channel: Channel, retry: RetryPolicy) -> Self {
        Self {
            inner: Grpc::new(channel),
            retry,
        }
    }

    /// Build a client whose channel connects on first use.
    ///
    /// Must be called inside a tokio runtime.
    pub fn connect_lazy(config: &BackendConfig) -> Result<Self> {
        let endpoint = Endpoint::from_shared(config.address.clone())
            .map_err(|e| Error::InvalidAddress {
                address: config.address.clone(),
                reason: e.to_string(),
            })?
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .tcp_keepalive(Some(Duration::from_secs(60)));

        debug!(address = %config.address, "backend channel configured (lazy connect)");
        Ok(Self::new(endpoint.connect_lazy(), RetryPolicy::from(config)))
    }

    async fn unary<Req, Resp>(
        &self,
        method: &'static str,
        path: &'static str,
        message: Req,
        deadline: Duration,
    ) -> Result<Resp>
    where
        Req: prost::Message + Clone + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let attempts = async {
            let mut attempt = 1u32;
            loop {
                match self.unary_once(path, message.clone(), deadline).await {
                    Ok(resp) => return Ok(resp),
                    Err(status) => {
                        let code = status.code();
                        if attempt >= self.retry.max_attempts || !RetryPolicy::is_retryable(code) {
                            return Err(Error::Status(status));
                        }
                        let wait = self.retry.backoff(attempt);
                        warn!(
                            method,
                            attempt,
                            max_attempts = self.retry.max_attempts,
                            backoff = ?wait,
                            ?code,
                            "transient backend failure, retrying"
                        );
                        tokio::time::sleep(wait).await;
                        attempt += 1;
                    },
                }
            }
        };

        match tokio::time::timeout(deadline, attempts).await {
            Ok(result) => result,
            Err(_) => Err(Error::DeadlineExceeded {
                method,
                timeout_ms: deadline.as_millis(),
            }),
        }
    }

    async fn unary_once<Req, Resp>(
        &self,
        path: &'static str,
        message: Req,
        deadline: Duration,
    ) -> std::result::Result<Resp, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = self.inner.clone();
        grpc.ready()
            .await
            .map_err(|e| Status::unavailable(format!("backend channel not ready: {e}")))?;

        let mut request = tonic::Request::new(message);
        request.set_timeout(deadline);
        let codec = tonic_prost::ProstCodec::<Req, Resp>::default();
        let path = http::uri::PathAndQuery::from_static(path);

        grpc.unary(request, path, codec)
            .await
            .map(tonic::Response::into_inner)
    }
}

#[async_trait]
impl QnaBackend for GrpcQnaClient {
    async fn upload_document(
        &self,
        user_id: &str,
        filename: &str,
        data: Vec<u8>,
        deadline: Duration,
    ) -> Result<String> {
        let req = proto::UploadDocRequest {
            user_id: user_id.to_string(),
            title: filename.to_string(),
            file_bytes: data,
            filename: filename.to_string(),
        };
        let resp: proto::UploadDocResponse = self
            .unary("UploadDocument", paths::UPLOAD_DOCUMENT, req, deadline)
            .await?;
        debug!(user_id, doc_id = %resp.doc_id, status = %resp.status, "document uploaded");
        Ok(resp.doc_id)
    }

    async fn query(
        &self,
        user_id: &str,
        question: &str,
        top_k: i32,
        deadline: Duration,
    ) -> Result<QueryResult> {
        let req = proto::QueryRequest {
            user_id: user_id.to_string(),
            question: question.to_string(),
            top_k,
        };
        let resp: proto::QueryResponse = self.unary("Query", paths::QUERY, req, deadline).await?;
        Ok(QueryResult::from(resp))
    }

    async fn direct_query(&self, question: &str, deadline: Duration) -> Result<String> {
        let req = proto::QueryRequest {
            user_id: DIRECT_QUERY_USER_ID.to_string(),
            question: question.to_string(),
            top_k: 0,
        };
        let resp: proto::QueryResponse = self
            .unary("DirectQuery", paths::DIRECT_QUERY, req, deadline)
            .await?;
        Ok(resp.answer)
    }

    async fn list_documents(&self, user_id: &str, deadline: Duration) -> Result<Vec<String>> {
        let req = proto::ListDocsRequest {
            user_id: user_id.to_string(),
        };
        let resp: proto::ListDocsResponse = self
            .unary("ListDocuments", paths::LIST_DOCUMENTS, req, deadline)
            .await?;
        Ok(resp.titles)
    }

    async fn clear_documents(&self, user_id: &str, deadline: Duration) -> Result<()> {
        let req = proto::ClearDocsRequest {
            user_id: user_id.to_string(),
        };
        let _: proto::ClearDocsResponse = self
            .unary("ClearDocuments", paths::CLEAR_DOCUMENTS, req, deadline)
            .await?;
        Ok(())
    }

    async fn set_mode(&self, mode: Mode, deadline: Duration) -> Result<()> {
        let req = proto::SetModeRequest {
            mode: mode.as_str().to_string(),
        };
        let _: proto::SetModeResponse = self
            .unary("SetMode", paths::SET_MODE, req, deadline)
            .await?;
        Ok(())
    }
}
