// HTTP + WebSocket routes. Every JSON response is an ApiResult envelope.

mod http;
mod ws;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tower_http::cors::{Any, CorsLayer};

use crate::audit_repo::AuditRepo;
use crate::error::StoreError;
use crate::models::ApiResult;
use crate::status_repo::StatusRepo;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) audit_repo: Arc<AuditRepo>,
    pub(crate) status_repo: Arc<StatusRepo>,
    pub(crate) ws_status_connections: Arc<AtomicUsize>,
}

pub fn app(
    audit_repo: Arc<AuditRepo>,
    status_repo: Arc<StatusRepo>,
    ws_status_connections: Arc<AtomicUsize>,
) -> Router {
    let state = AppState {
        audit_repo,
        status_repo,
        ws_status_connections,
    };
    Router::new()
        .route("/", get(|| async { "ServerCraft schema service" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/validate/{kind}", post(http::validate_handler)) // POST /api/validate/:kind
        .route("/api/hierarchy", post(http::hierarchy_handler)) // POST /api/hierarchy
        .route("/api/tasks/transition", post(http::task_transition_handler))
        .route("/api/tasks/progress", post(http::task_progress_handler))
        .route("/api/templates/resolve", post(http::template_resolve_handler))
        .route(
            "/api/terminal/transition",
            post(http::terminal_transition_handler),
        )
        .route(
            "/api/audit",
            get(http::audit_query_handler).post(http::audit_append_handler),
        )
        .route(
            "/api/status",
            get(http::status_list_handler).post(http::status_record_handler),
        )
        .route("/api/status/{server_id}", get(http::status_get_handler))
        .route("/ws/status", get(ws::ws_status)) // WS /ws/status
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

/// 200 for success, 400 for a failure envelope.
impl<T: Serialize> IntoResponse for ApiResult<T> {
    fn into_response(self) -> Response {
        let status = if self.is_success() {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        };
        (status, Json(self)).into_response()
    }
}

/// Rejected input becomes a 400 failure envelope; database trouble a logged 500.
pub(crate) fn store_response<T: Serialize>(result: Result<T, StoreError>) -> Response {
    match result {
        Ok(data) => ApiResult::success(data).into_response(),
        Err(StoreError::Schema(e)) => ApiResult::<T>::failure(e.to_string()).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "store operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResult::<T>::failure("internal storage error"),
            )
                .into_response()
        }
    }
}
