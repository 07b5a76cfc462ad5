// Latest-known ServerStatus per server. One row per server in SQLite (replaced on every
// newer snapshot), mirrored in memory and fanned out to live subscribers.
// Writers are serialized by `record_lock`; the `latest` map is only locked for the
// lookup and the swap, never across a database write.

mod blob;

use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, instrument, warn};

use crate::error::{SchemaError, StoreResult};
use crate::models::ServerStatus;
use crate::schema::{Validate, parse_timestamp};

pub struct StatusRepo {
    pool: SqlitePool,
    latest: RwLock<HashMap<String, ServerStatus>>,
    record_lock: Mutex<()>,
    tx: broadcast::Sender<ServerStatus>,
}

impl StatusRepo {
    pub fn new(pool: SqlitePool, tx: broadcast::Sender<ServerStatus>) -> Self {
        Self {
            pool,
            latest: RwLock::new(HashMap::new()),
            record_lock: Mutex::new(()),
            tx,
        }
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS server_status (
                server_id TEXT PRIMARY KEY,
                observed_at_ms INTEGER NOT NULL,
                data BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Loads persisted snapshots into memory. Returns how many were loaded.
    #[instrument(skip(self), fields(repo = "status", operation = "load"))]
    pub async fn load(&self) -> anyhow::Result<usize> {
        let rows = sqlx::query("SELECT server_id, data FROM server_status")
            .fetch_all(&self.pool)
            .await?;
        let mut latest = self.latest.write().await;
        for row in rows {
            let server_id: String = row.try_get("server_id")?;
            let data: Vec<u8> = row.try_get("data")?;
            match blob::decode(&data) {
                Ok(Some(status)) => {
                    latest.insert(server_id, status);
                }
                Ok(None) => debug!(%server_id, "status blob has unknown layout, skipping"),
                Err(e) => warn!(%server_id, error = %e, "status blob corrupt, skipping"),
            }
        }
        Ok(latest.len())
    }

    /// Validates and stores `status` if it is not older than the stored snapshot for the
    /// same server. Returns whether it became the latest one.
    #[instrument(skip(self, status), fields(repo = "status", operation = "record", server_id = %status.server_id))]
    pub async fn record(&self, status: ServerStatus) -> StoreResult<bool> {
        status.validate()?;
        let observed = observed_ms(&status)?;

        let _order = self.record_lock.lock().await;
        let current_ms = self
            .latest
            .read()
            .await
            .get(&status.server_id)
            .and_then(|current| parse_timestamp(&current.timestamp))
            .map(|t| t.timestamp_millis());
        if current_ms.is_some_and(|c| c > observed) {
            debug!("older snapshot ignored");
            return Ok(false);
        }

        let data = blob::encode(&status)?;
        sqlx::query(
            "INSERT OR REPLACE INTO server_status (server_id, observed_at_ms, data) VALUES ($1, $2, $3)",
        )
        .bind(&status.server_id)
        .bind(observed)
        .bind(&data)
        .execute(&self.pool)
        .await?;

        self.latest
            .write()
            .await
            .insert(status.server_id.clone(), status.clone());

        // No subscribers is fine; the snapshot is still the latest known.
        let _ = self.tx.send(status);
        Ok(true)
    }

    pub async fn latest(&self, server_id: &str) -> Option<ServerStatus> {
        self.latest.read().await.get(server_id).cloned()
    }

    /// All latest snapshots, ordered by server id.
    pub async fn all(&self) -> Vec<ServerStatus> {
        let mut out: Vec<ServerStatus> = self.latest.read().await.values().cloned().collect();
        out.sort_by(|a, b| a.server_id.cmp(&b.server_id));
        out
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerStatus> {
        self.tx.subscribe()
    }
}

fn observed_ms(status: &ServerStatus) -> StoreResult<i64> {
    parse_timestamp(&status.timestamp)
        .map(|t| t.timestamp_millis())
        .ok_or_else(|| {
            SchemaError::validation(ServerStatus::ENTITY, "timestamp is not a timestamp").into()
        })
}
