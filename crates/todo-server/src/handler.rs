use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::json;

use todo_ledger::{wants, Item};
use todo_model::{Todo, TodoError};
use todo_store::ItemId;

use crate::api::{ApiItem, ApiTodo, Response, TodoRequest};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

pub async fn index_handler() -> &'static str {
    "Welcome!\n"
}

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "name": "todo-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn list_todos(State(state): State<AppState>) -> ServerResult<Json<Response>> {
    let items = state.run(|ledger, _| ledger.filter(wants::all())).await?;
    Ok(items_response(items))
}

pub async fn create_todo(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<(StatusCode, Json<Response>)> {
    let req = parse_request(&body)?;
    if req.title.trim().is_empty() {
        return Err(ServerError::BadRequest("title is required".into()));
    }
    let item = state
        .run(move |ledger, clock| {
            let todo = Todo::with_description(req.title, req.description.unwrap_or_default(), clock);
            let id = ledger.insert(&todo)?;
            Ok(Item { id, todo })
        })
        .await?;
    tracing::info!(id = %item.id, "created todo");
    Ok((StatusCode::CREATED, single(&item)))
}

pub async fn show_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Response>> {
    let id = ItemId::from(id);
    let item = state
        .run(move |ledger, _| {
            let todo = ledger.get(&id)?;
            Ok(Item { id, todo })
        })
        .await?;
    Ok(single(&item))
}

/// Describe and/or assign.
///
/// Re-sending the current assignee is accepted without touching the todo's
/// assignment, so clients can PUT back the representation they fetched.
pub async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ServerResult<Json<Response>> {
    let req = parse_request(&body)?;
    let id = ItemId::from(id);
    let item = state
        .run(move |ledger, clock| {
            let todo = ledger.update(&id, |todo| {
                if let Some(description) = req.description {
                    todo.describe(description, clock)?;
                }
                match req.assignee {
                    Some(who) if !who.is_empty() && who != todo.assignee() => {
                        todo.assign(who, clock)
                    }
                    _ => Ok(()),
                }
            })?;
            Ok(Item { id, todo })
        })
        .await?;
    tracing::info!(id = %item.id, status = %item.todo.status(), "updated todo");
    Ok(single(&item))
}

pub async fn complete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Response>> {
    transition(state, id, |todo, clock| todo.complete(clock)).await
}

pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Response>> {
    transition(state, id, |todo, clock| todo.delete(clock)).await
}

pub async fn merge_todos(
    State(state): State<AppState>,
    Path((first, second)): Path<(String, String)>,
) -> ServerResult<Json<Response>> {
    let (first, second) = (ItemId::from(first), ItemId::from(second));
    let item = state
        .run(move |ledger, clock| ledger.merge(&first, &second, clock))
        .await?;
    Ok(single(&item))
}

pub async fn backlog(State(state): State<AppState>) -> ServerResult<Json<Response>> {
    let items = state.run(|ledger, _| ledger.filter(wants::backlog())).await?;
    Ok(items_response(items))
}

pub async fn backlog_of(
    State(state): State<AppState>,
    Path(assignee): Path<String>,
) -> ServerResult<Json<Response>> {
    let items = state
        .run(move |ledger, _| ledger.filter(wants::backlog_of(assignee)))
        .await?;
    Ok(items_response(items))
}

pub async fn completed(State(state): State<AppState>) -> ServerResult<Json<Response>> {
    let items = state.run(|ledger, _| ledger.filter(wants::completed())).await?;
    Ok(items_response(items))
}

pub async fn completed_by(
    State(state): State<AppState>,
    Path(assignee): Path<String>,
) -> ServerResult<Json<Response>> {
    let items = state
        .run(move |ledger, _| ledger.filter(wants::completed_by(assignee)))
        .await?;
    Ok(items_response(items))
}

async fn transition<F>(state: AppState, id: String, apply: F) -> ServerResult<Json<Response>>
where
    F: FnOnce(&mut Todo, &dyn todo_model::Clock) -> Result<(), TodoError> + Send + 'static,
{
    let id = ItemId::from(id);
    let item = state
        .run(move |ledger, clock| {
            let todo = ledger.update(&id, |todo| apply(todo, clock))?;
            Ok(Item { id, todo })
        })
        .await?;
    tracing::info!(id = %item.id, status = %item.todo.status(), "todo transitioned");
    Ok(single(&item))
}

fn parse_request(body: &[u8]) -> ServerResult<TodoRequest> {
    if body.is_empty() {
        return Ok(TodoRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| ServerError::BadRequest(e.to_string()))
}

fn single(item: &Item) -> Json<Response> {
    Json(Response::items(vec![ApiItem {
        id: item.id.clone(),
        todo: Some(ApiTodo::from(&item.todo)),
    }]))
}

/// Sorted by id so responses are stable.
fn items_response(mut items: Vec<Item>) -> Json<Response> {
    items.sort_by(|a, b| a.id.cmp(&b.id));
    Json(Response::items(items.iter().map(ApiItem::from).collect()))
}
