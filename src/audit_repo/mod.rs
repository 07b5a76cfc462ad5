// SQLite audit trail. Append-only: rows are never updated or deleted, enforced by triggers.

use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::instrument;

use crate::config::AuditConfig;
use crate::db;
use crate::error::{SchemaError, StoreError, StoreResult};
use crate::models::{AuditFilter, AuditLog, AuditPage, AuditResult};
use crate::schema::{Validate, parse_end_bound, parse_timestamp};

pub struct AuditRepo {
    pool: SqlitePool,
    limits: AuditConfig,
}

/// Filter with dates parsed and paging resolved against the configured limits.
#[derive(Debug, Clone)]
struct ResolvedFilter {
    server_id: Option<String>,
    action: Option<String>,
    result: Option<AuditResult>,
    start_ms: Option<i64>,
    end_ms: Option<i64>,
    limit: u32,
    offset: u32,
}

impl ResolvedFilter {
    fn is_empty_range(&self) -> bool {
        matches!((self.start_ms, self.end_ms), (Some(s), Some(e)) if s > e)
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");
        if let Some(server_id) = &self.server_id {
            qb.push(" AND server_id = ").push_bind(server_id.clone());
        }
        if let Some(action) = &self.action {
            qb.push(" AND action = ").push_bind(action.clone());
        }
        if let Some(result) = self.result {
            qb.push(" AND result = ").push_bind(result.as_str());
        }
        if let Some(start) = self.start_ms {
            qb.push(" AND created_at_ms >= ").push_bind(start);
        }
        if let Some(end) = self.end_ms {
            qb.push(" AND created_at_ms <= ").push_bind(end);
        }
    }
}

impl AuditRepo {
    pub async fn connect(path: &str, max_pool_size: u32, limits: AuditConfig) -> anyhow::Result<Self> {
        let pool = db::connect(path, max_pool_size).await?;
        Ok(Self::new(pool, limits))
    }

    /// Uses an already-open pool (one database file shared by every store).
    pub fn new(pool: SqlitePool, limits: AuditConfig) -> Self {
        Self { pool, limits }
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audit_log (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                server_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                action TEXT NOT NULL,
                details TEXT NOT NULL,
                result TEXT NOT NULL CHECK (result IN ('success', 'failure')),
                created_at TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_audit_server_created ON audit_log(server_id, created_at_ms)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_created ON audit_log(created_at_ms)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TRIGGER IF NOT EXISTS audit_log_no_update BEFORE UPDATE ON audit_log
             BEGIN SELECT RAISE(ABORT, 'audit_log is append-only'); END",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TRIGGER IF NOT EXISTS audit_log_no_delete BEFORE DELETE ON audit_log
             BEGIN SELECT RAISE(ABORT, 'audit_log is append-only'); END",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Validates and appends one record. A record id can only be written once.
    #[instrument(skip(self, log), fields(repo = "audit", operation = "append", audit_id = %log.id))]
    pub async fn append(&self, log: &AuditLog) -> StoreResult<()> {
        log.validate()?;
        let created_ms = parse_timestamp(&log.created_at)
            .map(|dt| dt.timestamp_millis())
            .ok_or_else(|| SchemaError::validation(AuditLog::ENTITY, "created_at is not a timestamp"))?;

        let r = sqlx::query(
            "INSERT INTO audit_log (id, server_id, user_id, action, details, result, created_at, created_at_ms)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&log.id)
        .bind(&log.server_id)
        .bind(&log.user_id)
        .bind(&log.action)
        .bind(&log.details)
        .bind(log.result.as_str())
        .bind(&log.created_at)
        .bind(created_ms)
        .execute(&self.pool)
        .await;

        match r {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(SchemaError::validation(
                    AuditLog::ENTITY,
                    format!("duplicate id {:?}; audit records are immutable", log.id),
                )
                .into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<AuditLog>> {
        let row = sqlx::query(
            "SELECT id, server_id, user_id, action, details, result, created_at FROM audit_log WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(parse_audit_row).transpose()
    }

    /// Newest first (then most recently appended first). An inverted date range matches nothing.
    #[instrument(skip(self), fields(repo = "audit", operation = "query"))]
    pub async fn query(&self, filter: &AuditFilter) -> StoreResult<AuditPage> {
        let resolved = self.resolve(filter)?;
        if resolved.is_empty_range() {
            return Ok(AuditPage {
                total: 0,
                limit: resolved.limit,
                offset: resolved.offset,
                items: vec![],
            });
        }

        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM audit_log");
        resolved.push_where(&mut count_qb);
        let total: i64 = count_qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, server_id, user_id, action, details, result, created_at FROM audit_log",
        );
        resolved.push_where(&mut qb);
        qb.push(" ORDER BY created_at_ms DESC, seq DESC LIMIT ")
            .push_bind(resolved.limit as i64)
            .push(" OFFSET ")
            .push_bind(resolved.offset as i64);

        let mut items = Vec::with_capacity(resolved.limit.min(64) as usize);
        let mut rows = qb.build().fetch(&self.pool);
        while let Some(row) = rows.try_next().await? {
            items.push(parse_audit_row(&row)?);
        }

        Ok(AuditPage {
            total: total.max(0) as u64,
            limit: resolved.limit,
            offset: resolved.offset,
            items,
        })
    }

    fn resolve(&self, filter: &AuditFilter) -> StoreResult<ResolvedFilter> {
        filter.validate()?;
        let start_ms = filter
            .start_date
            .as_deref()
            .and_then(parse_timestamp)
            .map(|dt: DateTime<Utc>| dt.timestamp_millis());
        let end_ms = filter
            .end_date
            .as_deref()
            .and_then(parse_end_bound)
            .map(|dt: DateTime<Utc>| dt.timestamp_millis());
        let limit = filter
            .limit
            .unwrap_or(self.limits.default_limit)
            .min(self.limits.max_limit);
        Ok(ResolvedFilter {
            server_id: filter.server_id.clone(),
            action: filter.action.clone(),
            result: filter.result,
            start_ms,
            end_ms,
            limit,
            offset: filter.offset.unwrap_or(0),
        })
    }
}

fn parse_audit_row(row: &SqliteRow) -> StoreResult<AuditLog> {
    let result: String = row.try_get("result")?;
    let result = AuditResult::parse(&result)
        .ok_or_else(|| StoreError::Encoding(format!("unknown audit result {:?}", result)))?;
    Ok(AuditLog {
        id: row.try_get("id")?,
        server_id: row.try_get("server_id")?,
        user_id: row.try_get("user_id")?,
        action: row.try_get("action")?,
        details: row.try_get("details")?,
        result,
        created_at: row.try_get("created_at")?,
    })
}
