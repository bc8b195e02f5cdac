use std::sync::Arc;
use std::time::Duration;

use todo_ledger::{Bounded, Deadline, Ledger, LedgerError, LedgerResult};
use todo_model::{Clock, SystemClock};

use crate::error::{ServerError, ServerResult};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    ledger: Arc<Ledger>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl AppState {
    pub fn new(ledger: Arc<Ledger>, timeout: Duration) -> Self {
        Self::with_clock(ledger, Arc::new(SystemClock), timeout)
    }

    pub fn with_clock(ledger: Arc<Ledger>, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        Self {
            ledger,
            clock,
            timeout,
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Run a ledger operation on the blocking pool under the request deadline.
    ///
    /// The deadline is enforced by the ledger before each backend write, so
    /// a request either is refused with [`ServerError::Timeout`] without side
    /// effects, or reports what the store actually did.
    pub async fn run<T, F>(&self, op: F) -> ServerResult<T>
    where
        F: FnOnce(&Bounded<'_>, &dyn Clock) -> LedgerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let ledger = Arc::clone(&self.ledger);
        let clock = Arc::clone(&self.clock);
        let deadline = Deadline::after(self.timeout);
        let task = tokio::task::spawn_blocking(move || op(&ledger.within(deadline), clock.as_ref()));
        match task.await {
            Err(join) => Err(ServerError::Internal(join.to_string())),
            Ok(Err(LedgerError::DeadlineExceeded)) => Err(ServerError::Timeout(self.timeout)),
            Ok(result) => result.map_err(ServerError::from),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("ledger", &self.ledger)
            .field("timeout", &self.timeout)
            .finish()
    }
}
