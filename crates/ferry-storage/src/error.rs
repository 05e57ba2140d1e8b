//! Storage error types.

use thiserror::Error;

/// Errors raised by the in-memory object and reference stores.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No object with the given id is stored.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// No reference with the given name exists.
    #[error("reference not found: {0}")]
    RefNotFound(String),

    /// Object bytes or an object id could not be decoded.
    #[error("invalid object: {0}")]
    InvalidObject(String),

    /// A reference could not be resolved or renamed.
    #[error("invalid reference: {0}")]
    InvalidRef(String),
}
