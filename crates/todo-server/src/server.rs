use std::sync::Arc;

use tokio::net::TcpListener;

use todo_ledger::Ledger;
use todo_store::{FsDirStore, InMemoryBlobStore};

use crate::config::{BackendKind, ServerConfig};
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Todo HTTP server.
pub struct TodoServer {
    config: ServerConfig,
}

impl TodoServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Open the configured backend and hydrate a ledger from it.
    pub fn open_ledger(&self) -> ServerResult<Ledger> {
        let ledger = match self.config.backend {
            BackendKind::Memory => Ledger::new(InMemoryBlobStore::new())?,
            BackendKind::Fsdir => Ledger::new(FsDirStore::open(&self.config.data_dir)?)?,
        };
        tracing::info!(
            backend = ?self.config.backend,
            items = ledger.len()?,
            "ledger hydrated"
        );
        Ok(ledger)
    }

    /// Build the router over an already opened ledger (useful for testing).
    pub fn router(&self, ledger: Arc<Ledger>) -> axum::Router {
        let state = AppState::new(ledger, self.config.request_timeout());
        build_router(state, self.config.max_body_bytes)
    }

    /// Serve until ctrl-c, then close the ledger.
    pub async fn serve(self) -> ServerResult<()> {
        let ledger = Arc::new(self.open_ledger()?);
        let app = self.router(Arc::clone(&ledger));
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("todo server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        match Arc::try_unwrap(ledger) {
            Ok(ledger) => ledger.close()?,
            Err(_) => {
                return Err(ServerError::Internal(
                    "ledger still in use after shutdown".into(),
                ))
            }
        }
        tracing::info!("ledger closed");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
