use todo_model::{CodecError, ErrorKind, TodoError};
use todo_store::{ItemId, StoreError};

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("todo not found: {0}")]
    NotFound(ItemId),

    #[error("cannot store a todo under the null id")]
    NullId,

    #[error("cannot merge todo {0} with itself")]
    SelfMerge(ItemId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("cannot decode todo {id}: {source}")]
    Decode {
        id: ItemId,
        #[source]
        source: CodecError,
    },

    #[error("cannot encode todo: {0}")]
    Encode(#[source] CodecError),

    #[error(transparent)]
    Transition(#[from] TodoError),

    #[error("ledger lock poisoned")]
    Poisoned,

    #[error("deadline passed before the store was called")]
    DeadlineExceeded,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NullId | Self::SelfMerge(_) => ErrorKind::InvalidState,
            Self::Store(e) => match e {
                StoreError::NotFound(_) => ErrorKind::NotFound,
                StoreError::AlreadyExists(_) => ErrorKind::Conflict,
                _ => ErrorKind::Backend,
            },
            Self::Decode { .. } | Self::Encode(_) => ErrorKind::Decode,
            Self::Transition(e) => e.kind(),
            Self::Poisoned | Self::DeadlineExceeded => ErrorKind::Backend,
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn store_errors_keep_their_category() {
        let id = ItemId::from("1");
        assert_eq!(
            LedgerError::from(StoreError::NotFound(id.clone())).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            LedgerError::from(StoreError::AlreadyExists(id)).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            LedgerError::from(StoreError::NotOwner {
                path: PathBuf::from("/data"),
                holder: "pid 7".into()
            })
            .kind(),
            ErrorKind::Backend
        );
        assert_eq!(
            LedgerError::from(StoreError::Corrupt {
                name: "x".into(),
                reason: "dir".into()
            })
            .kind(),
            ErrorKind::Backend
        );
    }

    #[test]
    fn transition_errors_pass_through() {
        let err = LedgerError::from(TodoError::Finalized);
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.to_string(), "todo finalized");
    }
}
