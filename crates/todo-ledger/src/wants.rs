//! Stock predicates for [`Ledger::filter`](crate::Ledger::filter).

use todo_model::{Status, Todo};

pub fn all() -> impl Fn(&Todo) -> bool {
    |_| true
}

/// Ongoing todos: the shared backlog.
pub fn backlog() -> impl Fn(&Todo) -> bool {
    |todo| todo.is_ongoing()
}

/// Ongoing todos assigned to `assignee`.
pub fn backlog_of(assignee: impl Into<String>) -> impl Fn(&Todo) -> bool {
    let assignee = assignee.into();
    move |todo| todo.is_ongoing() && todo.assignee() == assignee
}

pub fn completed() -> impl Fn(&Todo) -> bool {
    |todo| todo.status() == Status::Completed
}

pub fn completed_by(assignee: impl Into<String>) -> impl Fn(&Todo) -> bool {
    let assignee = assignee.into();
    move |todo| todo.status() == Status::Completed && todo.assignee() == assignee
}
