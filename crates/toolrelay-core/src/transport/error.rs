//! Transport error types

use thiserror::Error;

/// Errors raised by a transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server side was already bound
    #[error("Transport is already bound")]
    AlreadyBound,

    /// A client tried to connect before the server side was bound
    #[error("Transport is not bound yet")]
    NotReady,

    /// A second client tried to connect
    #[error("A client is already connected")]
    AlreadyConnected,

    /// The channel was closed by either side
    #[error("Transport is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(String),

    /// A frame could not be encoded
    #[error("Frame encoding error: {0}")]
    Codec(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

pub type TransportResult<T> = Result<T, TransportError>;
