use std::fmt;

use serde::{Deserialize, Serialize};

/// Processing status of a todo.
///
/// Transitions between statuses are enforced by the [`Todo`](crate::Todo)
/// methods; there is no public way to set a status directly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// In the common backlog, nobody working on it.
    #[default]
    Pending,
    /// Has an assignee; work has begun.
    Assigned,
    /// Completed by its assignee. Terminal.
    Completed,
    /// Soft-deleted, regardless of previous state. Terminal.
    Deleted,
}

impl Status {
    /// Pending or Assigned: the todo can still be manipulated.
    pub fn is_ongoing(self) -> bool {
        matches!(self, Self::Pending | Self::Assigned)
    }

    /// Completed or Deleted.
    pub fn is_final(self) -> bool {
        !self.is_ongoing()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Completed => "completed",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
