//! Todo entity for the Todo Ledger.
//!
//! This crate holds the pure, backend-agnostic half of the system. Nothing in
//! here touches storage; the ledger and the stores build on top of it.
//!
//! # Key Types
//!
//! - [`Todo`] — the task record and its enforced lifecycle
//! - [`Status`] — closed set of lifecycle states (`pending`, `assigned`,
//!   `completed`, `deleted`)
//! - [`Clock`] — injected time source; [`SystemClock`] in production,
//!   [`ManualClock`] in tests
//! - [`ErrorKind`] — the five error categories shared by every layer
//!
//! # Lifecycle
//!
//! ```text
//! Pending ──assign──▶ Assigned ──complete──▶ Completed
//!    │                   │
//!    └──────delete───────┴──────────────────▶ Deleted
//! ```
//!
//! Status never regresses. Completed and Deleted are terminal.

pub mod clock;
pub mod codec;
pub mod error;
pub mod status;
pub mod todo;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{decode, encode};
pub use error::{CodecError, ErrorKind, TodoError};
pub use status::Status;
pub use todo::{Todo, MERGE_SEPARATOR};
