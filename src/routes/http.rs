// JSON handlers: schema operations, audit trail, server status

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

use super::{AppState, store_response};
use crate::error::{SchemaError, SchemaResult};
use crate::hierarchy::{Composition, compose_hierarchy};
use crate::lifecycle::transition_task;
use crate::models::*;
use crate::schema::{EntityKind, parse_entity, resolve_parameters};
use crate::version::{NAME, SCHEMA_VERSION, VERSION};

/// Body of a request, or the reason it could not be read as JSON.
type JsonBody = Result<Json<Value>, JsonRejection>;

fn request_body<T: DeserializeOwned>(body: JsonBody, what: &'static str) -> SchemaResult<T> {
    let Json(raw) = body.map_err(|e| SchemaError::malformed(what, e.body_text()))?;
    serde_json::from_value(raw).map_err(|e| SchemaError::malformed(what, e.to_string()))
}

/// GET /version — service name, version and wire schema revision.
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
        "schema_version": SCHEMA_VERSION,
    }))
}

/// POST /api/validate/{kind} — validate one entity by name and echo it normalized.
pub(super) async fn validate_handler(Path(kind): Path<String>, body: JsonBody) -> ApiResult<Value> {
    let result = kind.parse::<EntityKind>().and_then(|kind| {
        let raw = request_body::<Value>(body, kind.as_str())?;
        kind.validate_raw(raw)
    });
    result.into()
}

#[derive(Deserialize)]
struct HierarchyRequest {
    organization: Value,
    #[serde(default)]
    groups: Vec<Value>,
    #[serde(default)]
    servers: Vec<Value>,
}

/// POST /api/hierarchy — compose an organization tree from flat lists.
pub(super) async fn hierarchy_handler(body: JsonBody) -> ApiResult<Composition> {
    compose_request(body).into()
}

fn compose_request(body: JsonBody) -> SchemaResult<Composition> {
    let req: HierarchyRequest = request_body(body, "hierarchy request")?;
    let org = parse_entity::<Organization>(req.organization)?;
    let groups = req
        .groups
        .into_iter()
        .map(parse_entity::<Group>)
        .collect::<SchemaResult<Vec<_>>>()?;
    let servers = req
        .servers
        .into_iter()
        .map(parse_entity::<Server>)
        .collect::<SchemaResult<Vec<_>>>()?;
    Ok(compose_hierarchy(org, groups, servers))
}

#[derive(Deserialize)]
struct TaskTransitionRequest {
    task: Value,
    status: TaskStatus,
}

/// POST /api/tasks/transition
pub(super) async fn task_transition_handler(body: JsonBody) -> ApiResult<Task> {
    let result = request_body::<TaskTransitionRequest>(body, "task transition request")
        .and_then(|req| {
            let task = parse_entity::<Task>(req.task)?;
            transition_task(task, req.status)
        });
    result.into()
}

#[derive(Deserialize)]
struct TaskProgressRequest {
    task: Value,
    progress: f64,
    #[serde(default)]
    output: String,
}

/// POST /api/tasks/progress
pub(super) async fn task_progress_handler(body: JsonBody) -> ApiResult<Task> {
    let result = request_body::<TaskProgressRequest>(body, "task progress request")
        .and_then(|req| {
            let task = parse_entity::<Task>(req.task)?;
            task.record_progress(req.progress, &req.output)
        });
    result.into()
}

#[derive(Deserialize)]
struct TemplateResolveRequest {
    template: Value,
    #[serde(default)]
    values: BTreeMap<String, String>,
}

/// POST /api/templates/resolve — fill defaults and check supplied parameter values.
pub(super) async fn template_resolve_handler(body: JsonBody) -> ApiResult<BTreeMap<String, String>> {
    let result = request_body::<TemplateResolveRequest>(body, "template resolve request")
        .and_then(|req| {
            let template = parse_entity::<TaskTemplate>(req.template)?;
            resolve_parameters(&template, &req.values)
        });
    result.into()
}

#[derive(Deserialize)]
struct TerminalTransitionRequest {
    session: Value,
    status: TerminalStatus,
}

/// POST /api/terminal/transition
pub(super) async fn terminal_transition_handler(body: JsonBody) -> ApiResult<TerminalSession> {
    let result = request_body::<TerminalTransitionRequest>(body, "terminal transition request")
        .and_then(|req| {
            let session = parse_entity::<TerminalSession>(req.session)?;
            session.transition_to(req.status)
        });
    result.into()
}

/// POST /api/audit — append one immutable audit record.
pub(super) async fn audit_append_handler(
    State(state): State<AppState>,
    body: JsonBody,
) -> Response {
    let log = match request_body::<Value>(body, "audit_log").and_then(parse_entity::<AuditLog>) {
        Ok(log) => log,
        Err(e) => return ApiResult::<AuditLog>::from(Err(e)).into_response(),
    };
    let appended = state.audit_repo.append(&log).await;
    store_response(appended.map(|()| log))
}

/// GET /api/audit?server_id=&action=&result=&start_date=&end_date=&limit=&offset=
pub(super) async fn audit_query_handler(
    State(state): State<AppState>,
    filter: Result<Query<AuditFilter>, QueryRejection>,
) -> Response {
    let filter = match filter {
        Ok(Query(f)) => f,
        Err(e) => {
            return ApiResult::<AuditPage>::from(Err(SchemaError::malformed(
                "audit_filter",
                e.body_text(),
            )))
            .into_response();
        }
    };
    store_response(state.audit_repo.query(&filter).await)
}

/// POST /api/status — record a snapshot; responds with the latest one for that server.
pub(super) async fn status_record_handler(
    State(state): State<AppState>,
    body: JsonBody,
) -> Response {
    let status =
        match request_body::<Value>(body, "server_status").and_then(parse_entity::<ServerStatus>) {
            Ok(s) => s,
            Err(e) => return ApiResult::<ServerStatus>::from(Err(e)).into_response(),
        };
    let server_id = status.server_id.clone();
    let result = match state.status_repo.record(status.clone()).await {
        Ok(_) => Ok(state.status_repo.latest(&server_id).await.unwrap_or(status)),
        Err(e) => Err(e),
    };
    store_response(result)
}

/// GET /api/status — latest snapshot of every known server.
pub(super) async fn status_list_handler(State(state): State<AppState>) -> ApiResult<Vec<ServerStatus>> {
    ApiResult::success(state.status_repo.all().await)
}

/// GET /api/status/{server_id}
pub(super) async fn status_get_handler(
    State(state): State<AppState>,
    Path(server_id): Path<String>,
) -> Response {
    match state.status_repo.latest(&server_id).await {
        Some(status) => ApiResult::success(status).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            ApiResult::<ServerStatus>::failure(format!("no status recorded for server {}", server_id)),
        )
            .into_response(),
    }
}
