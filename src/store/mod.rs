// SQLite Persistence Layer
//
// One writer (the indexer) and any number of read-only connections (the
// API). WAL keeps readers and the writer out of each other's way; all
// mutation for a height happens in a single transaction, so readers observe
// either the whole height or none of it.

mod schema;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Reserved meta keys.
pub const META_CHAIN_ID: &str = "chain_id";
pub const META_LAST_INDEXED: &str = "last_indexed_height";

/// Sort direction for paginated reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    /// Case-insensitive parse; anything unrecognized takes the caller's
    /// endpoint default.
    pub fn parse_or(raw: Option<&str>, default: Order) -> Order {
        match raw.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
            Some("asc") => Order::Asc,
            Some("desc") => Order::Desc,
            _ => default,
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// Where a stored event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    BeginBlock,
    EndBlock,
    FinalizeBlock,
    Tx,
}

impl EventSource {
    pub fn as_str(self) -> &'static str {
        match self {
            EventSource::BeginBlock => "begin_block",
            EventSource::EndBlock => "end_block",
            EventSource::FinalizeBlock => "finalize_block",
            EventSource::Tx => "tx",
        }
    }
}

/// Block row handed to `write_height`.
#[derive(Debug, Clone)]
pub struct BlockRow {
    pub height: i64,
    pub time: Option<String>,
    pub proposer_address: Option<String>,
    pub block_id_hash: Option<String>,
    pub tx_count: i64,
    /// Verbatim `/block` document.
    pub block_json: String,
    /// Verbatim `/block_results` document.
    pub results_json: String,
}

/// Transaction row handed to `write_height`.
#[derive(Debug, Clone)]
pub struct TxRow {
    pub tx_hash: String,
    pub tx_index: i64,
    pub code: Option<i64>,
    pub gas_wanted: Option<i64>,
    pub gas_used: Option<i64>,
    pub tx_b64: String,
    pub raw_log: Option<String>,
    pub events_json: String,
}

/// Event row handed to `write_height`, in final intra-height write order.
/// `event_index` is assigned by the indexer from a per-height counter.
#[derive(Debug, Clone)]
pub struct EventRow {
    pub tx_hash: Option<String>,
    pub source: EventSource,
    pub event_index: i64,
    pub event_type: Option<String>,
    pub attributes_json: String,
}

/// Block list item: metadata columns only, raw payloads omitted.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BlockSummary {
    pub height: i64,
    pub time: Option<String>,
    pub proposer_address: Option<String>,
    pub block_id_hash: Option<String>,
    pub tx_count: i64,
    pub indexed_at: String,
}

/// Single block with the verbatim RPC payloads.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BlockDetail {
    pub height: i64,
    pub time: Option<String>,
    pub proposer_address: Option<String>,
    pub block_id_hash: Option<String>,
    pub tx_count: i64,
    pub block_json: String,
    pub results_json: String,
    pub indexed_at: String,
}

/// Transaction list item, joined with the parent block time.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TxSummary {
    pub tx_hash: String,
    pub height: i64,
    pub tx_index: i64,
    pub code: Option<i64>,
    pub gas_wanted: Option<i64>,
    pub gas_used: Option<i64>,
    pub raw_log: Option<String>,
    pub indexed_at: String,
    pub block_time: Option<String>,
}

/// Single transaction with raw bytes and events.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TxDetail {
    pub tx_hash: String,
    pub height: i64,
    pub tx_index: i64,
    pub code: Option<i64>,
    pub gas_wanted: Option<i64>,
    pub gas_used: Option<i64>,
    pub tx_b64: Option<String>,
    pub raw_log: Option<String>,
    pub events_json: String,
    pub indexed_at: String,
    pub block_time: Option<String>,
}

/// Stored event as served by the API; `attributes_json` stays a string.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoredEvent {
    pub id: i64,
    pub height: i64,
    pub tx_hash: Option<String>,
    pub source: String,
    pub event_index: i64,
    pub event_type: Option<String>,
    pub attributes_json: String,
}

/// AND-composed filters for the events listing.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub height: Option<i64>,
    pub tx_hash: Option<String>,
    pub event_type: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
    path: String,
}

impl Store {
    /// Open (or create) the database at `path` as the single writer and run
    /// the idempotent schema migration.
    pub async fn open(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Config(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;
        let store = Self { pool, path: path.to_string() };
        store.migrate().await?;
        Ok(store)
    }

    /// Open an existing database for the API. Connections are read-only
    /// (enforced at open) and the migration never runs here.
    pub async fn open_read_only(path: &str) -> Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .busy_timeout(Duration::from_secs(15));
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(opts)
            .await?;
        Ok(Self { pool, path: path.to_string() })
    }

    /// In-memory database. All data is lost on drop; meant for tests and
    /// ephemeral tooling.
    pub async fn in_memory() -> Result<Self> {
        let opts = SqliteConnectOptions::new().filename(":memory:");
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .connect_with(opts)
            .await?;
        let store = Self { pool, path: ":memory:".to_string() };
        store.migrate().await?;
        Ok(store)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        for stmt in schema::SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    // ========== Meta ==========

    pub async fn meta_get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM meta WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    pub async fn meta_set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO meta(key, value) VALUES(?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Checkpoint read; unparseable values count as absent.
    pub async fn last_indexed_height(&self) -> Result<Option<i64>> {
        Ok(self
            .meta_get(META_LAST_INDEXED)
            .await?
            .and_then(|v| v.parse().ok()))
    }

    /// Advance the checkpoint. Clamped so it never moves backwards: a
    /// `--start-height` replay of an already-indexed height rewrites the
    /// rows but leaves the checkpoint where it was.
    pub async fn set_last_indexed_height(&self, height: i64) -> Result<()> {
        let current = self.last_indexed_height().await?.unwrap_or(0);
        self.meta_set(META_LAST_INDEXED, &current.max(height).to_string())
            .await
    }

    // ========== Write path ==========

    /// Commit every row for a height in one transaction. Prior rows for the
    /// height are replaced wholesale, so reprocessing is idempotent.
    pub async fn write_height(
        &self,
        block: &BlockRow,
        txs: &[TxRow],
        events: &[EventRow],
    ) -> Result<()> {
        let indexed_at = now_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT OR REPLACE INTO blocks
               (height, time, proposer_address, block_id_hash, tx_count,
                block_json, results_json, indexed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(block.height)
        .bind(&block.time)
        .bind(&block.proposer_address)
        .bind(&block.block_id_hash)
        .bind(block.tx_count)
        .bind(&block.block_json)
        .bind(&block.results_json)
        .bind(&indexed_at)
        .execute(&mut *tx)
        .await?;

        // Clear any existing children for this height (reindex-safe).
        sqlx::query("DELETE FROM events WHERE height = ?")
            .bind(block.height)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM txs WHERE height = ?")
            .bind(block.height)
            .execute(&mut *tx)
            .await?;

        for row in txs {
            sqlx::query(
                "INSERT OR REPLACE INTO txs
                   (tx_hash, height, tx_index, code, gas_wanted, gas_used,
                    tx_b64, raw_log, events_json, indexed_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&row.tx_hash)
            .bind(block.height)
            .bind(row.tx_index)
            .bind(row.code)
            .bind(row.gas_wanted)
            .bind(row.gas_used)
            .bind(&row.tx_b64)
            .bind(&row.raw_log)
            .bind(&row.events_json)
            .bind(&indexed_at)
            .execute(&mut *tx)
            .await?;
        }

        // Insertion order defines the surrogate id, which readers rely on
        // for the stable intra-height sequence.
        for ev in events {
            sqlx::query(
                "INSERT INTO events
                   (height, tx_hash, source, event_index, event_type, attributes_json)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(block.height)
            .bind(&ev.tx_hash)
            .bind(ev.source.as_str())
            .bind(ev.event_index)
            .bind(&ev.event_type)
            .bind(&ev.attributes_json)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // ========== Read path ==========

    pub async fn blocks(
        &self,
        limit: i64,
        offset: i64,
        order: Order,
    ) -> Result<(i64, Vec<BlockSummary>)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM blocks")
            .fetch_one(&self.pool)
            .await?;
        let sql = format!(
            "SELECT height, time, proposer_address, block_id_hash, tx_count, indexed_at
             FROM blocks ORDER BY height {} LIMIT ? OFFSET ?",
            order.as_sql()
        );
        let items = sqlx::query_as::<_, BlockSummary>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok((total, items))
    }

    pub async fn block(&self, height: i64) -> Result<Option<BlockDetail>> {
        let row = sqlx::query_as::<_, BlockDetail>(
            "SELECT height, time, proposer_address, block_id_hash, tx_count,
                    block_json, results_json, indexed_at
             FROM blocks WHERE height = ?",
        )
        .bind(height)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn tx(&self, tx_hash: &str) -> Result<Option<TxDetail>> {
        let row = sqlx::query_as::<_, TxDetail>(
            "SELECT t.tx_hash, t.height, t.tx_index, t.code, t.gas_wanted,
                    t.gas_used, t.tx_b64, t.raw_log, t.events_json, t.indexed_at,
                    b.time AS block_time
             FROM txs t LEFT JOIN blocks b ON b.height = t.height
             WHERE t.tx_hash = ?",
        )
        .bind(tx_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn txs(
        &self,
        limit: i64,
        offset: i64,
        order: Order,
        height: Option<i64>,
    ) -> Result<(i64, Vec<TxSummary>)> {
        let where_sql = if height.is_some() { " WHERE t.height = ?" } else { "" };

        let count_sql = format!("SELECT COUNT(1) FROM txs t{}", where_sql);
        let mut count_query = sqlx::query_scalar(&count_sql);
        if let Some(h) = height {
            count_query = count_query.bind(h);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?;

        // Stable ordering: height in the requested direction, tx_index
        // ascending within each height on the descending scan.
        let tx_index_dir = match order {
            Order::Desc => "ASC",
            Order::Asc => "DESC",
        };
        let sql = format!(
            "SELECT t.tx_hash, t.height, t.tx_index, t.code, t.gas_wanted,
                    t.gas_used, t.raw_log, t.indexed_at, b.time AS block_time
             FROM txs t LEFT JOIN blocks b ON b.height = t.height{}
             ORDER BY t.height {}, t.tx_index {} LIMIT ? OFFSET ?",
            where_sql,
            order.as_sql(),
            tx_index_dir
        );
        let mut query = sqlx::query_as::<_, TxSummary>(&sql);
        if let Some(h) = height {
            query = query.bind(h);
        }
        let items = query.bind(limit).bind(offset).fetch_all(&self.pool).await?;
        Ok((total, items))
    }

    pub async fn events(
        &self,
        limit: i64,
        offset: i64,
        order: Order,
        filter: &EventFilter,
    ) -> Result<(i64, Vec<StoredEvent>)> {
        let mut clauses: Vec<&str> = Vec::new();
        if filter.height.is_some() {
            clauses.push("height = ?");
        }
        if filter.tx_hash.is_some() {
            clauses.push("tx_hash = ?");
        }
        if filter.event_type.is_some() {
            clauses.push("event_type = ?");
        }
        if filter.source.is_some() {
            clauses.push("source = ?");
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(1) FROM events{}", where_sql);
        let mut count_query = sqlx::query_scalar(&count_sql);
        if let Some(h) = filter.height {
            count_query = count_query.bind(h);
        }
        if let Some(hash) = &filter.tx_hash {
            count_query = count_query.bind(hash);
        }
        if let Some(ty) = &filter.event_type {
            count_query = count_query.bind(ty);
        }
        if let Some(src) = &filter.source {
            count_query = count_query.bind(src);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?;

        let sql = format!(
            "SELECT id, height, tx_hash, source, event_index, event_type, attributes_json
             FROM events{} ORDER BY id {} LIMIT ? OFFSET ?",
            where_sql,
            order.as_sql()
        );
        let mut query = sqlx::query_as::<_, StoredEvent>(&sql);
        if let Some(h) = filter.height {
            query = query.bind(h);
        }
        if let Some(hash) = &filter.tx_hash {
            query = query.bind(hash);
        }
        if let Some(ty) = &filter.event_type {
            query = query.bind(ty);
        }
        if let Some(src) = &filter.source {
            query = query.bind(src);
        }
        let items = query.bind(limit).bind(offset).fetch_all(&self.pool).await?;
        Ok((total, items))
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
