use std::time::{Duration, Instant};

use crate::error::{LedgerError, LedgerResult};

/// Point in time after which the ledger refuses to start a backend write.
///
/// The check happens under the ledger lock, right before the store is
/// called. A write that has reached the store always runs to completion and
/// reports its real outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// Never expires.
    pub const NONE: Self = Self(None);

    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now().checked_add(timeout))
    }

    pub fn has_passed(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    pub(crate) fn check(&self) -> LedgerResult<()> {
        if self.has_passed() {
            return Err(LedgerError::DeadlineExceeded);
        }
        Ok(())
    }
}
