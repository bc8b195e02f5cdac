//! JSON wire types for the HTTP API.
//!
//! Every response is wrapped in a [`Response`] envelope:
//!
//! ```json
//! {"status":"success","result":{"items":[{"id":"...","todo":{...}}]}}
//! {"status":"error","error":{"code":404,"text":"todo not found: 42"}}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use todo_ledger::Item;
use todo_model::{Status, Todo};
use todo_store::ItemId;

/// A todo as it appears on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiTodo {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub assignee: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub status: Status,
    pub updated: DateTime<Utc>,
}

impl From<&Todo> for ApiTodo {
    fn from(todo: &Todo) -> Self {
        Self {
            title: todo.title().to_string(),
            assignee: todo.assignee().to_string(),
            description: todo.description().to_string(),
            status: todo.status(),
            updated: todo.last_update(),
        }
    }
}

/// Body of create and update requests.
///
/// Clients may send a full [`ApiTodo`]; fields other than these are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TodoRequest {
    pub title: String,
    pub assignee: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiItem {
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo: Option<ApiTodo>,
}

impl From<&Item> for ApiItem {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            todo: Some(ApiTodo::from(&item.todo)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// HTTP status code.
    pub code: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ApiItem>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ApiResult>,
}

impl Response {
    pub fn items(items: Vec<ApiItem>) -> Self {
        Self {
            status: ResponseStatus::Success,
            error: None,
            result: Some(ApiResult {
                items,
                text: String::new(),
            }),
        }
    }

    pub fn error(code: u16, text: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            error: Some(ApiError {
                code,
                text: text.into(),
            }),
            result: None,
        }
    }
}
