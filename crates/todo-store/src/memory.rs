use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;
use crate::types::{Blob, ItemId, StoredItem};

/// In-memory, HashMap-based blob store.
///
/// Volatile: everything is lost when the store is dropped. Intended for
/// tests, demos, and embedding. All blobs are held behind a `RwLock` and
/// cloned on the way in and out.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<ItemId, Blob>>,
    closed: AtomicBool,
}

impl InMemoryBlobStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    /// Create a store pre-populated with the given items.
    pub fn with_items(items: impl IntoIterator<Item = StoredItem>) -> Self {
        let blobs = items.into_iter().map(|item| (item.id, item.blob)).collect();
        Self {
            blobs: RwLock::new(blobs),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The blob held for `id`, if any.
    pub fn get(&self, id: &ItemId) -> Option<Blob> {
        self.blobs.read().ok()?.get(id).cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<ItemId, Blob>>> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        self.blobs
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<ItemId, Blob>>> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        self.blobs
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn load_all(&self) -> StoreResult<Vec<StoredItem>> {
        let map = self.read()?;
        Ok(map
            .iter()
            .map(|(id, blob)| StoredItem::new(id.clone(), blob.clone()))
            .collect())
    }

    fn create(&self, id: &ItemId, blob: &[u8]) -> StoreResult<()> {
        if id.is_null() {
            return Err(StoreError::InvalidId {
                id: id.clone(),
                reason: "null id",
            });
        }
        let mut map = self.write()?;
        if map.contains_key(id) {
            return Err(StoreError::AlreadyExists(id.clone()));
        }
        map.insert(id.clone(), blob.to_vec());
        Ok(())
    }

    fn save(&self, id: &ItemId, blob: &[u8]) -> StoreResult<()> {
        let mut map = self.write()?;
        match map.get_mut(id) {
            Some(slot) => {
                *slot = blob.to_vec();
                Ok(())
            }
            None => Err(StoreError::NotFound(id.clone())),
        }
    }

    fn delete(&self, id: &ItemId) -> StoreResult<()> {
        let mut map = self.write()?;
        map.remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn close(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("item_count", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
