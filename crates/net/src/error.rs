//! Network error types

use std::io;

use crate::protocol::ErrorKind;

/// Network result type
pub type Result<T> = std::result::Result<T, Error>;

/// Network errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    /// Framing broke; the connection cannot continue
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A well-framed payload that did not parse
    #[error("Malformed message: {0}")]
    Decode(String),

    #[error(transparent)]
    Core(#[from] roombook_core::Error),

    /// The server answered with an error
    #[error("{kind:?}: {message}")]
    Remote { kind: ErrorKind, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// Error kind reported by the server, if any
    pub fn remote_kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Remote { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
