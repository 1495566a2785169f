//! Client for the QnA backend (`fm.QnA` gRPC service).
//!
//! [`QnaBackend`] is the seam the relay talks to; [`GrpcQnaClient`] is the
//! production implementation over a tonic channel. Retry of transient gRPC
//! failures lives here, never in per-request relay logic.

pub mod backend;
pub mod error;
pub mod grpc;
pub mod proto;
pub mod types;

pub use {
    backend::{DIRECT_QUERY_USER_ID, HEALTH_CHECK_USER_ID, QnaBackend, probe},
    error::{Error, Result},
    grpc::{GrpcQnaClient, RetryPolicy},
    types::{ContextSnippet, QueryResult},
};
