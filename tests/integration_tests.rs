// Integration tests: HTTP and WebSocket endpoints

mod common;

use axum_test::TestServer;
use common::*;
use serde_json::{Value, json};
use servercraft::audit_repo::AuditRepo;
use servercraft::config::AppConfig;
use servercraft::db;
use servercraft::models::*;
use servercraft::routes;
use servercraft::status_repo::StatusRepo;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tempfile::TempDir;
use tokio::sync::broadcast;

const TEST_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"

[database]
path = "data/test.db"
max_pool_size = 2

[audit]
default_limit = 10
max_limit = 20

[status]
broadcast_capacity = 10
"#;

/// The TempDir must outlive the server.
async fn test_app() -> (axum::Router, TempDir) {
    let config = AppConfig::load_from_str(TEST_CONFIG).unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    let pool = db::connect(path.to_str().unwrap(), config.database.max_pool_size)
        .await
        .unwrap();
    let audit_repo = Arc::new(AuditRepo::new(pool.clone(), config.audit.clone()));
    audit_repo.init().await.unwrap();
    let (tx, _) = broadcast::channel(config.status.broadcast_capacity);
    let status_repo = Arc::new(StatusRepo::new(pool, tx));
    status_repo.init().await.unwrap();
    let app = routes::app(audit_repo, status_repo, Arc::new(AtomicUsize::new(0)));
    (app, dir)
}

async fn test_server() -> (TestServer, TempDir) {
    let (app, dir) = test_app().await;
    (TestServer::new(app), dir)
}

/// Build TestServer with http_transport (required for WebSocket tests).
async fn test_server_with_http() -> (TestServer, TempDir) {
    let (app, dir) = test_app().await;
    let server = TestServer::builder().http_transport().build(app);
    (server, dir)
}

fn assert_failure(json: &Value) {
    assert_eq!(json["success"], false);
    assert!(json.get("data").is_none());
    assert!(json["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn test_root_endpoint() {
    let (server, _dir) = test_server().await;
    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("ServerCraft schema service");
}

#[tokio::test]
async fn test_version_endpoint() {
    let (server, _dir) = test_server().await;
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(
        json.get("name").and_then(|v| v.as_str()),
        Some("servercraft")
    );
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
    assert_eq!(json["schema_version"], 1);
}

#[tokio::test]
async fn test_validate_endpoint_accepts_and_normalizes() {
    let (server, _dir) = test_server().await;
    let mut raw = serde_json::to_value(server_fixture()).unwrap();
    raw["labels"] = json!(["web", "prod", "web"]);
    let response = server.post("/api/validate/server").json(&raw).await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["success"], true);
    assert!(json.get("error").is_none());
    assert_eq!(json["data"]["labels"], json!(["prod", "web"]));
}

fn server_fixture() -> Server {
    common::server("s1", "g1")
}

#[tokio::test]
async fn test_validate_endpoint_rejects_bad_port_and_unknown_kind() {
    let (server, _dir) = test_server().await;
    let mut raw = serde_json::to_value(server_fixture()).unwrap();
    raw["port"] = json!(70000);
    let response = server.post("/api/validate/server").json(&raw).await;
    response.assert_status_bad_request();
    assert_failure(&response.json());

    let response = server.post("/api/validate/widget").json(&json!({})).await;
    response.assert_status_bad_request();
    let json: Value = response.json();
    assert_failure(&json);
    assert!(json["error"].as_str().unwrap().contains("widget"));
}

#[tokio::test]
async fn test_validate_endpoint_requires_every_field() {
    let (server, _dir) = test_server().await;
    let mut raw = serde_json::to_value(server_fixture()).unwrap();
    raw.as_object_mut().unwrap().remove("labels");
    let response = server.post("/api/validate/server").json(&raw).await;
    response.assert_status_bad_request();
    let json: Value = response.json();
    assert_failure(&json);
    assert!(json["error"].as_str().unwrap().contains("labels"));
}

#[tokio::test]
async fn test_malformed_body_is_a_failure_envelope() {
    let (server, _dir) = test_server().await;
    let response = server
        .post("/api/tasks/transition")
        .text("{not json")
        .await;
    response.assert_status_bad_request();
    assert_failure(&response.json());
}

#[tokio::test]
async fn test_hierarchy_endpoint() {
    let (server, _dir) = test_server().await;
    let body = json!({
        "organization": org("o1"),
        "groups": [group("g1", "o1")],
        "servers": [common::server("s1", "g1"), common::server("s2", "missing")],
    });
    let response = server.post("/api/hierarchy").json(&body).await;
    response.assert_status_ok();
    let json: Value = response.json();
    let data = &json["data"];
    assert_eq!(data["organization"]["groups"][0]["servers"][0]["id"], "s1");
    assert_eq!(data["unattached_servers"][0]["id"], "s2");
    assert_eq!(data["unattached_groups"], json!([]));
}

#[tokio::test]
async fn test_task_transition_endpoint() {
    let (server, _dir) = test_server().await;
    let body = json!({ "task": task("t1", TaskStatus::Running), "status": "completed" });
    let response = server.post("/api/tasks/transition").json(&body).await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["data"]["status"], "completed");
    assert!(json["data"]["completed_at"].is_string());

    let body = json!({ "task": task("t1", TaskStatus::Pending), "status": "completed" });
    let response = server.post("/api/tasks/transition").json(&body).await;
    response.assert_status_bad_request();
    let json: Value = response.json();
    assert_failure(&json);
    assert!(json["error"].as_str().unwrap().contains("pending -> completed"));
}

#[tokio::test]
async fn test_task_progress_endpoint() {
    let (server, _dir) = test_server().await;
    let body = json!({ "task": task("t1", TaskStatus::Running), "progress": 40.0, "output": "ok\n" });
    let response = server.post("/api/tasks/progress").json(&body).await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["data"]["progress"], 40.0);
    assert_eq!(json["data"]["output"], "ok\n");
}

#[tokio::test]
async fn test_template_resolve_endpoint() {
    let (server, _dir) = test_server().await;
    let template = json!({
        "id": "tpl-restart",
        "name": "Restart service",
        "description": "Restarts a systemd unit",
        "category": "maintenance",
        "parameters": [
            { "name": "unit", "type": "string", "required": true, "description": "" },
            { "name": "mode", "type": "select", "required": false,
              "options": ["fast", "safe"], "default": "safe", "description": "" }
        ]
    });
    let body = json!({ "template": template, "values": { "unit": "nginx" } });
    let response = server.post("/api/templates/resolve").json(&body).await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["data"], json!({ "mode": "safe", "unit": "nginx" }));

    let body = json!({ "template": template, "values": {} });
    let response = server.post("/api/templates/resolve").json(&body).await;
    response.assert_status_bad_request();
    assert_failure(&response.json());
}

#[tokio::test]
async fn test_terminal_transition_endpoint() {
    let (server, _dir) = test_server().await;
    let body = json!({ "session": session("x1", TerminalStatus::Connecting), "status": "connected" });
    let response = server.post("/api/terminal/transition").json(&body).await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["data"]["status"], "connected");

    let body = json!({ "session": session("x1", TerminalStatus::Error), "status": "connected" });
    let response = server.post("/api/terminal/transition").json(&body).await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_audit_append_and_query() {
    let (server, _dir) = test_server().await;
    let logs = [
        audit("a1", "s1", "restart", AuditResult::Success, "2024-05-01T09:00:00Z"),
        audit("a2", "s2", "deploy", AuditResult::Failure, "2024-05-02T09:00:00Z"),
        audit("a3", "s1", "deploy", AuditResult::Success, "2024-05-03T09:00:00Z"),
    ];
    for log in &logs {
        let response = server.post("/api/audit").json(log).await;
        response.assert_status_ok();
        let json: Value = response.json();
        assert_eq!(json["data"]["id"], log.id.as_str());
    }

    let response = server.get("/api/audit").add_query_param("server_id", "s1").await;
    response.assert_status_ok();
    let page: ApiResult<AuditPage> = response.json();
    let page = page.into_result().unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.limit, 10);
    assert_eq!(page.items[0].id, "a3");

    let response = server
        .get("/api/audit")
        .add_query_param("result", "failure")
        .await;
    let page: ApiResult<AuditPage> = response.json();
    assert_eq!(page.into_result().unwrap().items[0].id, "a2");

    let response = server.get("/api/audit").add_query_param("limit", "500").await;
    let page: ApiResult<AuditPage> = response.json();
    assert_eq!(page.into_result().unwrap().limit, 20);
}

#[tokio::test]
async fn test_audit_inverted_range_returns_zero_results() {
    let (server, _dir) = test_server().await;
    let log = audit("a1", "s1", "restart", AuditResult::Success, "2024-05-02T09:00:00Z");
    server.post("/api/audit").json(&log).await.assert_status_ok();
    let response = server
        .get("/api/audit")
        .add_query_param("start_date", "2024-05-03")
        .add_query_param("end_date", "2024-05-01")
        .await;
    response.assert_status_ok();
    let page: ApiResult<AuditPage> = response.json();
    let page = page.into_result().unwrap();
    assert_eq!(page.total, 0);
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn test_audit_rejects_duplicate_and_bad_query() {
    let (server, _dir) = test_server().await;
    let log = audit("a1", "s1", "restart", AuditResult::Success, T0);
    server.post("/api/audit").json(&log).await.assert_status_ok();
    let response = server.post("/api/audit").json(&log).await;
    response.assert_status_bad_request();
    assert_failure(&response.json());

    let response = server
        .get("/api/audit")
        .add_query_param("result", "partial")
        .await;
    response.assert_status_bad_request();
    assert_failure(&response.json());
}

#[tokio::test]
async fn test_status_record_list_and_get() {
    let (server, _dir) = test_server().await;
    server
        .post("/api/status")
        .json(&status("s1", 90.0, T1))
        .await
        .assert_status_ok();
    // an older snapshot is answered with the stored latest one
    let response = server.post("/api/status").json(&status("s1", 10.0, T0)).await;
    response.assert_status_ok();
    let latest: ApiResult<ServerStatus> = response.json();
    assert_eq!(latest.into_result().unwrap().cpu_percent, 90.0);

    server
        .post("/api/status")
        .json(&status("s2", 20.0, T0))
        .await
        .assert_status_ok();

    let response = server.get("/api/status").await;
    let all: ApiResult<Vec<ServerStatus>> = response.json();
    assert_eq!(all.into_result().unwrap().len(), 2);

    let response = server.get("/api/status/s2").await;
    response.assert_status_ok();
    let one: ApiResult<ServerStatus> = response.json();
    assert_eq!(one.into_result().unwrap().server_id, "s2");

    let response = server.get("/api/status/s9").await;
    response.assert_status_not_found();
    assert_failure(&response.json());
}

#[tokio::test]
async fn test_status_rejects_out_of_range_values() {
    let (server, _dir) = test_server().await;
    let mut raw = serde_json::to_value(status("s1", 10.0, T0)).unwrap();
    raw["disk_percent"] = json!(101.0);
    let response = server.post("/api/status").json(&raw).await;
    response.assert_status_bad_request();
    assert_failure(&response.json());
}

// --- WebSocket message tests (require http_transport + ws feature) ---
// Receive until we get valid JSON (server may send Ping first).

async fn receive_first_json_text<T: serde::de::DeserializeOwned>(
    ws: &mut axum_test::TestWebSocket,
) -> T {
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(3);
    loop {
        let text = ws.receive_text().await;
        if let Ok(v) = serde_json::from_str::<T>(&text) {
            return v;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for JSON"
        );
    }
}

#[tokio::test]
async fn test_ws_status_sends_snapshot_then_updates() {
    let (server, _dir) = test_server_with_http().await;
    server
        .post("/api/status")
        .json(&status("s1", 10.0, T0))
        .await
        .assert_status_ok();

    let mut ws = server
        .get_websocket("/ws/status")
        .await
        .into_websocket()
        .await;
    let welcome: Value = receive_first_json_text(&mut ws).await;
    assert_eq!(welcome["type"], "snapshot");
    assert_eq!(welcome["statuses"][0]["server_id"], "s1");

    server
        .post("/api/status")
        .json(&status("s1", 55.0, T1))
        .await
        .assert_status_ok();
    let update: ServerStatus = receive_first_json_text(&mut ws).await;
    assert_eq!(update.cpu_percent, 55.0);
    assert_eq!(update.timestamp, T1);
}
