use std::fmt;

use thiserror::Error;

/// Coarse classification of failures across the workspace.
///
/// Callers branch on the kind (e.g. to pick a response code) instead of
/// matching on error strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The id is absent from the cache or the backend.
    NotFound,
    /// Duplicate create, assign-when-assigned, ambiguous merge ownership.
    Conflict,
    /// Operation attempted on a finalized or not-yet-assigned todo.
    InvalidState,
    /// I/O, connectivity, lock contention, corrupt persisted content.
    Backend,
    /// A blob does not parse as a valid todo.
    Decode,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not-found",
            Self::Conflict => "conflict",
            Self::InvalidState => "invalid-state",
            Self::Backend => "backend",
            Self::Decode => "decode",
        };
        f.write_str(s)
    }
}

/// Rejected lifecycle transitions.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TodoError {
    #[error("todo already assigned")]
    AlreadyAssigned,

    #[error("todo not assigned")]
    NotAssigned,

    #[error("todo finalized")]
    Finalized,

    #[error("can't merge todos with different assignees: {first:?} and {second:?}")]
    AssigneeConflict { first: String, second: String },
}

impl TodoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyAssigned | Self::AssigneeConflict { .. } => ErrorKind::Conflict,
            Self::NotAssigned | Self::Finalized => ErrorKind::InvalidState,
        }
    }
}

/// Failure to encode or decode the canonical form of a todo.
#[derive(Debug, Error)]
#[error("todo codec error: {0}")]
pub struct CodecError(#[from] serde_json::Error);

impl CodecError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Decode
    }
}
