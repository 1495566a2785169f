use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("backend returned {}: {}", .0.code(), .0.message())]
    Status(#[from] tonic::Status),

    #[error(transparent)]
    Transport(#[from] tonic::transport::Error),

    #[error("invalid backend address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("backend call {method} exceeded its {timeout_ms} ms deadline")]
    DeadlineExceeded {
        method: &'static str,
        timeout_ms: u128,
    },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    /// The gRPC status code, when the failure came from the backend.
    #[must_use]
    pub fn code(&self) -> Option<tonic::Code> {
        match self {
            Self::Status(status) => Some(status.code()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
