//! Embedded-SQL storage engine.
//!
//! Grounded in the teacher's `db.rs` (`PgPoolOptions::new().connect_lazy`)
//! and `services/alarm_engine/mod.rs` (`sqlx::query_as` / `FromRow`) —
//! generalized from `PgPool` to `SqlitePool` since this engine stands in for
//! the spec's "embedded SQL" backend rather than a networked database.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePoolOptions, SqliteQueryResult};
use sqlx::{FromRow, Row, SqlitePool};
use std::collections::HashMap;
use std::time::Duration;

use super::{EngineError, EngineResult, Item, Order, Sample, StorageEngine, Tenant};

pub struct SqliteEngine {
    pool: SqlitePool,
}

impl SqliteEngine {
    /// `url` is a `sqlx` sqlite connection string, e.g. `sqlite::memory:` or
    /// `sqlite:///var/lib/mohawk/metrics.db?mode=rwc`.
    pub async fn open(url: &str) -> EngineResult<Self> {
        // A private in-memory database is per-connection; pooling more than
        // one connection against `:memory:` would silently scatter writes
        // across unrelated empty databases.
        let max_connections = if url.contains(":memory:") { 1 } else { 10 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(8))
            .connect(url)
            .await
            .map_err(|err| EngineError::InitFailed(err.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                tenant TEXT NOT NULL,
                id TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '{}',
                PRIMARY KEY (tenant, id)
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|err| EngineError::InitFailed(err.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS samples (
                tenant TEXT NOT NULL,
                id TEXT NOT NULL,
                ts INTEGER NOT NULL,
                value REAL NOT NULL,
                seq INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|err| EngineError::InitFailed(err.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS samples_lookup ON samples (tenant, id, ts)",
        )
        .execute(&pool)
        .await
        .map_err(|err| EngineError::InitFailed(err.to_string()))?;

        Ok(Self { pool })
    }

    async fn exec(&self, query: sqlx::query::Query<'_, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'_>>) -> EngineResult<SqliteQueryResult> {
        query
            .execute(&self.pool)
            .await
            .map_err(|err| EngineError::Io(err.into()))
    }
}

#[derive(FromRow)]
struct ItemRow {
    id: String,
    tags: String,
}

#[derive(FromRow)]
struct SampleRow {
    ts: i64,
    value: f64,
}

#[async_trait]
impl StorageEngine for SqliteEngine {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn get_tenants(&self) -> EngineResult<Vec<Tenant>> {
        let rows = sqlx::query("SELECT DISTINCT tenant FROM items ORDER BY tenant")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| EngineError::Io(err.into()))?;
        Ok(rows
            .into_iter()
            .map(|row| row.get::<String, _>("tenant"))
            .collect())
    }

    async fn get_item_list(
        &self,
        tenant: &str,
        tags: &HashMap<String, String>,
    ) -> EngineResult<Vec<Item>> {
        let rows: Vec<ItemRow> = sqlx::query_as("SELECT id, tags FROM items WHERE tenant = ? ORDER BY id")
            .bind(tenant)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| EngineError::Io(err.into()))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let item_tags: HashMap<String, String> =
                serde_json::from_str(&row.tags).unwrap_or_default();
            if crate::tags::matches(&item_tags, tags) {
                items.push(Item {
                    id: row.id,
                    tags: item_tags,
                });
            }
        }
        Ok(items)
    }

    async fn get_raw_data(
        &self,
        tenant: &str,
        id: &str,
        end: i64,
        start: i64,
        limit: i64,
        order: Order,
    ) -> EngineResult<Vec<Sample>> {
        let order_sql = match order {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        };
        // `seq` is the monotonic insertion counter, so ties on `ts` fall
        // back to insertion order (ASC) / reversed insertion order (DESC),
        // matching spec §4.3's "Ordering & ties".
        let sql = format!(
            "SELECT ts, value FROM samples WHERE tenant = ? AND id = ? AND ts >= ? AND ts < ? \
             ORDER BY ts {order_sql}, seq {order_sql} LIMIT ?"
        );
        let rows: Vec<SampleRow> = sqlx::query_as(&sql)
            .bind(tenant)
            .bind(id)
            .bind(start)
            .bind(end)
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await
            .map_err(|err| EngineError::Io(err.into()))?;

        Ok(rows
            .into_iter()
            .map(|row| Sample {
                timestamp: row.ts,
                value: row.value,
            })
            .collect())
    }

    async fn post_raw_data(
        &self,
        tenant: &str,
        id: &str,
        timestamp: i64,
        value: f64,
    ) -> EngineResult<()> {
        let _ = Sample::new(timestamp, value)?;

        self.exec(
            sqlx::query("INSERT INTO items (tenant, id, tags) VALUES (?, ?, '{}') ON CONFLICT(tenant, id) DO NOTHING")
                .bind(tenant)
                .bind(id),
        )
        .await?;

        let next_seq: (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM samples WHERE tenant = ? AND id = ?",
        )
        .bind(tenant)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| EngineError::Io(err.into()))?;

        self.exec(
            sqlx::query("INSERT INTO samples (tenant, id, ts, value, seq) VALUES (?, ?, ?, ?, ?)")
                .bind(tenant)
                .bind(id)
                .bind(timestamp)
                .bind(value)
                .bind(next_seq.0),
        )
        .await?;
        Ok(())
    }

    async fn put_tags(
        &self,
        tenant: &str,
        id: &str,
        tags: HashMap<String, String>,
    ) -> EngineResult<()> {
        let existing: Option<(String,)> =
            sqlx::query_as("SELECT tags FROM items WHERE tenant = ? AND id = ?")
                .bind(tenant)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|err| EngineError::Io(err.into()))?;

        let mut merged: HashMap<String, String> = existing
            .and_then(|(raw,)| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        merged.extend(tags);

        let serialized = serde_json::to_string(&merged).map_err(|err| EngineError::Io(err.into()))?;
        self.exec(
            sqlx::query(
                "INSERT INTO items (tenant, id, tags) VALUES (?, ?, ?) \
                 ON CONFLICT(tenant, id) DO UPDATE SET tags = excluded.tags",
            )
            .bind(tenant)
            .bind(id)
            .bind(serialized),
        )
        .await?;
        Ok(())
    }

    async fn delete_tags(&self, tenant: &str, id: &str, keys: &[String]) -> EngineResult<()> {
        let existing: Option<(String,)> =
            sqlx::query_as("SELECT tags FROM items WHERE tenant = ? AND id = ?")
                .bind(tenant)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|err| EngineError::Io(err.into()))?;

        let Some((raw,)) = existing else {
            return Ok(());
        };
        let mut tags: HashMap<String, String> = serde_json::from_str(&raw).unwrap_or_default();
        for key in keys {
            tags.remove(key);
        }
        let serialized = serde_json::to_string(&tags).map_err(|err| EngineError::Io(err.into()))?;
        self.exec(
            sqlx::query("UPDATE items SET tags = ? WHERE tenant = ? AND id = ?")
                .bind(serialized)
                .bind(tenant)
                .bind(id),
        )
        .await?;
        Ok(())
    }

    async fn delete_data(&self, tenant: &str, id: &str, end: i64, start: i64) -> EngineResult<()> {
        if start >= end {
            return Err(EngineError::Io(anyhow::anyhow!(
                "delete range must satisfy start < end"
            )));
        }
        self.exec(
            sqlx::query("DELETE FROM samples WHERE tenant = ? AND id = ? AND ts >= ? AND ts < ?")
                .bind(tenant)
                .bind(id)
                .bind(start)
                .bind(end),
        )
        .await?;
        Ok(())
    }
}
