// WebSocket /ws/status: current snapshot on connect, then every newer ServerStatus as it lands

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::ServerStatus;
use crate::status_repo::StatusRepo;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Decrements the ws_status connection count on drop (connect = +1, drop = -1).
struct WsStatusGuard(Arc<AtomicUsize>);

impl Drop for WsStatusGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

pub(super) async fn ws_status(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let repo = state.status_repo.clone();
    let conn_count = state.ws_status_connections.clone();
    ws.on_upgrade(move |socket| async move {
        // Subscribe before reading the snapshot so nothing recorded in between is lost.
        let mut rx = repo.subscribe();
        if let Err(e) = stream_status(socket, &mut rx, &repo, conn_count).await {
            tracing::info!("Status stream error: {}", e);
        }
    })
}

/// false when the client is gone or too slow to take the message.
async fn send_text(socket: &mut WebSocket, json: String) -> bool {
    matches!(
        timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await,
        Ok(Ok(()))
    )
}

async fn stream_status(
    mut socket: WebSocket,
    rx: &mut broadcast::Receiver<ServerStatus>,
    repo: &StatusRepo,
    conn_count: Arc<AtomicUsize>,
) -> anyhow::Result<()> {
    let connected = conn_count.fetch_add(1, Ordering::Relaxed) + 1;
    let _guard = WsStatusGuard(conn_count);
    tracing::info!(connections = connected, "Client connected to status stream");

    let welcome = serde_json::json!({ "type": "snapshot", "statuses": repo.all().await });
    if !send_text(&mut socket, serde_json::to_string(&welcome)?).await {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(status) => {
                        let json = serde_json::to_string(&status)?;
                        if !send_text(&mut socket, json).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("WebSocket /ws/status client lagged, skipped {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if !matches!(r, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
    tracing::info!("Client left status stream");
    Ok(())
}
