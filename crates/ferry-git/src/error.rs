//! Git transport error types.

use thiserror::Error;

/// Errors raised while encoding, decoding or transferring git data.
#[derive(Debug, Error)]
pub enum GitError {
    /// Malformed pack file.
    #[error("invalid pack file: {0}")]
    InvalidPack(String),

    /// Malformed pkt-line stream.
    #[error("invalid pkt-line: {0}")]
    InvalidPktLine(String),

    /// The remote answered with something the protocol does not allow.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The remote refused the credentials (HTTP 401 or 403).
    #[error("authentication rejected by {0}")]
    Unauthorized(String),

    /// The remote answered with an unexpected HTTP status.
    #[error("HTTP {status} from {url}")]
    Http {
        /// Response status code.
        status: u16,
        /// Request URL, without credentials.
        url: String,
    },

    /// The request never completed (DNS, TLS, connection reset, timeout).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The remote sent an error on side-band channel 3 or an `ERR` line.
    #[error("remote error: {0}")]
    Remote(String),

    /// The remote did not accept one or more ref updates.
    #[error("push rejected: {0}")]
    PushRejected(String),

    /// The operation was canceled by the caller.
    #[error("operation canceled")]
    Canceled,

    /// Object storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] ferry_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    /// True for failures caused by rejected credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}
