use std::sync::Arc;

use crate::error::StoreResult;
use crate::types::{ItemId, StoredItem};

/// Durable key/blob persistence backend.
///
/// All implementations must satisfy these invariants:
/// - `create` fails with `AlreadyExists` if the id is present.
/// - `save` and `delete` fail with `NotFound` if the id is absent.
/// - No operation silently succeeds on a constraint violation.
/// - After `close`, the store is unusable.
/// - The store never interprets blob contents.
pub trait BlobStore: Send + Sync {
    /// Every id/blob pair held by the store.
    fn load_all(&self) -> StoreResult<Vec<StoredItem>>;

    /// Store a new record under a caller-chosen id.
    fn create(&self, id: &ItemId, blob: &[u8]) -> StoreResult<()>;

    /// Overwrite an existing record.
    fn save(&self, id: &ItemId, blob: &[u8]) -> StoreResult<()>;

    /// Remove an existing record.
    fn delete(&self, id: &ItemId) -> StoreResult<()>;

    /// Release backend resources.
    fn close(&self) -> StoreResult<()>;
}

impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    fn load_all(&self) -> StoreResult<Vec<StoredItem>> {
        (**self).load_all()
    }

    fn create(&self, id: &ItemId, blob: &[u8]) -> StoreResult<()> {
        (**self).create(id, blob)
    }

    fn save(&self, id: &ItemId, blob: &[u8]) -> StoreResult<()> {
        (**self).save(id, blob)
    }

    fn delete(&self, id: &ItemId) -> StoreResult<()> {
        (**self).delete(id)
    }

    fn close(&self) -> StoreResult<()> {
        (**self).close()
    }
}

impl<T: BlobStore + ?Sized> BlobStore for Box<T> {
    fn load_all(&self) -> StoreResult<Vec<StoredItem>> {
        (**self).load_all()
    }

    fn create(&self, id: &ItemId, blob: &[u8]) -> StoreResult<()> {
        (**self).create(id, blob)
    }

    fn save(&self, id: &ItemId, blob: &[u8]) -> StoreResult<()> {
        (**self).save(id, blob)
    }

    fn delete(&self, id: &ItemId) -> StoreResult<()> {
        (**self).delete(id)
    }

    fn close(&self) -> StoreResult<()> {
        (**self).close()
    }
}
