//! Durable blob storage for the Todo Ledger.
//!
//! A store persists opaque blobs under caller-chosen [`ItemId`]s. It never
//! interprets the bytes; decoding is the ledger's business.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`InMemoryBlobStore`] -- `HashMap`-based volatile store for tests and embedding
//! - [`FsDirStore`] -- one file per record in a directory, single-owner locked
//!
//! # Contract
//!
//! 1. `create` fails if the id exists; `save` and `delete` fail if it does not.
//! 2. Constraint violations are typed errors, never silent successes.
//! 3. After `close`, every operation fails with [`StoreError::Closed`].
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fsdir;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use fsdir::FsDirStore;
pub use memory::InMemoryBlobStore;
pub use traits::BlobStore;
pub use types::{Blob, ItemId, StoredItem};
