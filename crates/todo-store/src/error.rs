use std::path::PathBuf;

use crate::types::ItemId;

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Save or delete targeted an id the store does not hold.
    #[error("unknown id: {0}")]
    NotFound(ItemId),

    /// Create targeted an id the store already holds.
    #[error("id already exists: {0}")]
    AlreadyExists(ItemId),

    /// The id cannot be used by this backend.
    #[error("invalid id {id:?}: {reason}")]
    InvalidId { id: ItemId, reason: &'static str },

    /// Another owner holds the backend lock.
    #[error("not the owner of {}: locked by {holder}", path.display())]
    NotOwner { path: PathBuf, holder: String },

    /// Persisted content is not what the backend expects.
    #[error("corrupted content {name:?}: {reason}")]
    Corrupt { name: String, reason: String },

    /// The store was closed and can no longer be used.
    #[error("store is closed")]
    Closed,

    /// The backend cannot serve the request right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
