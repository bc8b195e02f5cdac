use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all todo endpoints.
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handler::index_handler))
        .route("/v1/health", get(handler::health_handler))
        .route("/todos", get(handler::list_todos).post(handler::create_todo))
        .route(
            "/todos/:id",
            get(handler::show_todo)
                .put(handler::update_todo)
                .delete(handler::delete_todo),
        )
        .route("/todos/:id/complete", post(handler::complete_todo))
        .route("/todos/:first/merge/:second", post(handler::merge_todos))
        .route("/backlog", get(handler::backlog))
        .route("/backlog/:assignee", get(handler::backlog_of))
        .route("/completed", get(handler::completed))
        .route("/completed/:assignee", get(handler::completed_by))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
