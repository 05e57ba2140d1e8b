//! In-memory git storage for Ferry.
//!
//! Content-addressed objects, references and the [`Repository`] a migration
//! clones into before pushing everything to the destination.

mod error;
mod object;
mod refs;
mod store;

pub use error::StorageError;
pub use object::{GitObject, ObjectId, ObjectType};
pub use refs::{RefStore, Reference, BRANCH_PREFIX, TAG_PREFIX};
pub use store::{ObjectStore, Repository};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
