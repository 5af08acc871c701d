//! Completion error types

use thiserror::Error;

/// Errors raised by a completion backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// The request could not be delivered
    #[error("Network error: {0}")]
    Network(String),

    /// The backend rejected the request
    #[error("{backend} API error: {message}")]
    Api { backend: String, message: String },

    /// The backend answered with something unusable
    #[error("Invalid response from {backend}: {message}")]
    InvalidResponse { backend: String, message: String },

    /// A streamed response failed part way through
    #[error("Stream error: {0}")]
    Stream(String),
}

impl CompletionError {
    pub fn api(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn invalid_response(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

pub type CompletionResult<T> = Result<T, CompletionError>;
