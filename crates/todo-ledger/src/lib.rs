//! Caching ledger for the Todo Ledger.
//!
//! The [`Ledger`] sits between callers and a [`BlobStore`](todo_store::BlobStore).
//! It keeps every record resident in an id→blob cache, hydrated once at
//! construction, and is the only component that touches both the cache and
//! the store.
//!
//! # Consistency rules
//!
//! 1. Reads (`get`, `filter`) are served from the cache only.
//! 2. `set` writes the cache first, then the store; if the store refuses,
//!    the cache entry is restored before the error is returned.
//! 3. `delete` calls the store first and drops the cache entry only on
//!    success.
//! 4. A single ledger-wide lock serializes writers, so a rollback is never
//!    interleaved with another writer's update.
//! 5. A blob that fails to decode aborts the whole scan.
//! 6. Writes made through [`Ledger::within`] check their [`Deadline`] under
//!    the lock, before the store is called; a write is either refused or
//!    carried through to its real outcome.

pub mod deadline;
pub mod error;
pub mod ledger;
pub mod wants;

pub use deadline::Deadline;
pub use error::{LedgerError, LedgerResult};
pub use ledger::{Bounded, Item, Ledger};
