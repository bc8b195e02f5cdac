use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::TodoError;
use crate::status::Status;

/// Joins titles and descriptions of merged todos.
pub const MERGE_SEPARATOR: &str = "-";

/// A short-lived task record with an enforced lifecycle.
///
/// Fields are private: the only way to change a todo is through the
/// transition methods, each of which stamps `updated` with the injected
/// clock. Deleting a todo flips its status; it is never physically removed
/// by the model.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Todo {
    title: String,
    assignee: String,
    description: String,
    status: Status,
    updated: DateTime<Utc>,
}

impl Todo {
    /// A fresh pending todo with the given title.
    pub fn new(title: impl Into<String>, clock: &dyn Clock) -> Self {
        Self {
            title: title.into(),
            assignee: String::new(),
            description: String::new(),
            status: Status::Pending,
            updated: clock.now(),
        }
    }

    /// Like [`Todo::new`], with an initial description.
    pub fn with_description(
        title: impl Into<String>,
        description: impl Into<String>,
        clock: &dyn Clock,
    ) -> Self {
        let mut todo = Self::new(title, clock);
        todo.description = description.into();
        todo
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Empty when unassigned.
    pub fn assignee(&self) -> &str {
        &self.assignee
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.updated
    }

    pub fn is_ongoing(&self) -> bool {
        self.status.is_ongoing()
    }

    pub fn is_final(&self) -> bool {
        self.status.is_final()
    }

    /// Replace the description. Repeatable while the todo is ongoing.
    pub fn describe(
        &mut self,
        description: impl Into<String>,
        clock: &dyn Clock,
    ) -> Result<(), TodoError> {
        if !self.is_ongoing() {
            return Err(TodoError::Finalized);
        }
        self.description = description.into();
        self.updated = clock.now();
        Ok(())
    }

    /// Grant an assignee. A todo can be assigned only once.
    pub fn assign(&mut self, assignee: impl Into<String>, clock: &dyn Clock) -> Result<(), TodoError> {
        if !self.is_ongoing() {
            return Err(TodoError::Finalized);
        }
        if !self.assignee.is_empty() {
            return Err(TodoError::AlreadyAssigned);
        }
        self.assignee = assignee.into();
        self.status = Status::Assigned;
        self.updated = clock.now();
        Ok(())
    }

    /// Mark as completed. Only an assigned todo can be completed.
    pub fn complete(&mut self, clock: &dyn Clock) -> Result<(), TodoError> {
        if self.status != Status::Assigned {
            return Err(TodoError::NotAssigned);
        }
        self.status = Status::Completed;
        self.updated = clock.now();
        Ok(())
    }

    /// Soft delete: the status flips to Deleted, the record stays.
    pub fn delete(&mut self, clock: &dyn Clock) -> Result<(), TodoError> {
        if !self.is_ongoing() {
            return Err(TodoError::Finalized);
        }
        self.status = Status::Deleted;
        self.updated = clock.now();
        Ok(())
    }

    /// Combine two ongoing todos into a new value.
    ///
    /// Title and description are joined with [`MERGE_SEPARATOR`]. The
    /// assignee is whichever side has one; two different non-empty assignees
    /// conflict. The result is Assigned if either side is, and carries the
    /// later of the two timestamps. Neither input is modified, and removing
    /// the sources is left to the caller.
    pub fn merge(first: &Todo, second: &Todo) -> Result<Todo, TodoError> {
        if !first.is_ongoing() || !second.is_ongoing() {
            return Err(TodoError::Finalized);
        }
        if !first.assignee.is_empty()
            && !second.assignee.is_empty()
            && first.assignee != second.assignee
        {
            return Err(TodoError::AssigneeConflict {
                first: first.assignee.clone(),
                second: second.assignee.clone(),
            });
        }

        let assignee = if first.assignee.is_empty() {
            second.assignee.clone()
        } else {
            first.assignee.clone()
        };
        let status = if first.status == Status::Assigned || second.status == Status::Assigned {
            Status::Assigned
        } else {
            Status::Pending
        };

        Ok(Todo {
            title: format!("{}{MERGE_SEPARATOR}{}", first.title, second.title),
            assignee,
            description: format!("{}{MERGE_SEPARATOR}{}", first.description, second.description),
            status,
            updated: first.updated.max(second.updated),
        })
    }
}
