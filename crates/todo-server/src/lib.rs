//! HTTP server for the Todo Ledger.
//!
//! Exposes the caching ledger as a small JSON API. Every ledger call runs on
//! the blocking pool under a per-request deadline; errors are mapped to HTTP
//! status codes by their [`todo_model::ErrorKind`].

pub mod api;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use api::{ApiItem, ApiTodo, Response, TodoRequest};
pub use config::{BackendKind, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::TodoServer;
pub use state::AppState;
