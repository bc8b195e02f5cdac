use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque serialized record.
pub type Blob = Vec<u8>;

/// Opaque token naming a stored record. Comparable only for equality.
///
/// The empty token is the null id: "not yet assigned". It appears in create
/// requests and is never stored.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// A fresh, time-ordered id (UUID v7).
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub const fn null() -> Self {
        Self(String::new())
    }

    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An id bound to its blob, as returned by [`BlobStore::load_all`](crate::BlobStore::load_all).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredItem {
    pub id: ItemId,
    pub blob: Blob,
}

impl StoredItem {
    pub fn new(id: impl Into<ItemId>, blob: impl Into<Blob>) -> Self {
        Self {
            id: id.into(),
            blob: blob.into(),
        }
    }
}
