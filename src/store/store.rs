use crate::store::error::StoreResult;
use crate::store::types::Message;
use chrono::Utc;
use metrics::counter;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::time::Duration;

/// Durable, capacity-bounded message table.
///
/// Backed by SQLite; `id` is the primary key and the dedup key. The
/// capacity bound is enforced inside [`MessageStore::insert`] so the
/// table never exceeds `max_messages` even under bursty origination.
pub struct MessageStore {
    pool: SqlitePool,
    max_messages: i64,
}

impl MessageStore {
    /// Open (or create) a message store at the given SQLite URL.
    pub async fn new(db_url: &str, max_messages: i64) -> StoreResult<Self> {
        // One connection: keeps insert-then-trim serialized and makes
        // `sqlite::memory:` behave as a single database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(db_url)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                sender TEXT NOT NULL,
                payload TEXT NOT NULL,
                lat REAL NOT NULL,
                lng REAL NOT NULL,
                ttl INTEGER NOT NULL,
                hops INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                delivered INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_created ON messages(created_at)")
            .execute(&pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_delivered ON messages(delivered)")
            .execute(&pool)
            .await?;

        Ok(Self { pool, max_messages })
    }

    /// Create a store backed by an in-memory database (for testing).
    pub async fn new_in_memory(max_messages: i64) -> StoreResult<Self> {
        Self::new("sqlite::memory:", max_messages).await
    }

    /// Insert a message unless its id is already present.
    ///
    /// Returns `true` iff a new row was written. A concurrent insert race
    /// on the same id resolves to exactly one winner at the database.
    /// Writing a new row may evict the oldest surplus rows to keep the
    /// table within capacity.
    pub async fn insert(&self, message: &Message) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO messages
            (id, sender, payload, lat, lng, ttl, hops, created_at, delivered)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(&message.id)
        .bind(&message.sender)
        .bind(&message.payload)
        .bind(message.lat)
        .bind(message.lng)
        .bind(message.ttl as i64)
        .bind(message.hops as i64)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        self.trim_surplus().await?;
        Ok(true)
    }

    /// Delete the oldest-by-`created_at` rows above the capacity bound.
    async fn trim_surplus(&self) -> StoreResult<()> {
        let count = self.count().await?;
        if count <= self.max_messages {
            return Ok(());
        }

        let surplus = count - self.max_messages;
        let result = sqlx::query(
            r#"
            DELETE FROM messages WHERE id IN
            (SELECT id FROM messages ORDER BY created_at ASC LIMIT ?)
            "#,
        )
        .bind(surplus)
        .execute(&self.pool)
        .await?;

        counter!("driftmesh_messages_evicted_total").increment(result.rows_affected());
        tracing::debug!(evicted = result.rows_affected(), "trimmed surplus messages");
        Ok(())
    }

    /// Whether a message with this id is stored.
    pub async fn exists(&self, id: &str) -> StoreResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM messages WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count > 0)
    }

    /// Non-delivered, non-expired messages, oldest first.
    ///
    /// Expired rows are filtered here as well so a stale expiry sweep can
    /// never leak one into a sync batch.
    pub async fn pending(&self, limit: i64) -> StoreResult<Vec<Message>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM messages
            WHERE delivered = 0 AND hops < ttl
            ORDER BY created_at ASC LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_message).collect()
    }

    /// All messages, newest first, for read-back/UI.
    pub async fn recent(&self, limit: i64) -> StoreResult<Vec<Message>> {
        let rows = sqlx::query("SELECT * FROM messages ORDER BY created_at DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_message).collect()
    }

    /// Flag a message as handed to the consuming application.
    ///
    /// Idempotent; an unknown id is a no-op.
    pub async fn mark_delivered(&self, id: &str) -> StoreResult<()> {
        sqlx::query("UPDATE messages SET delivered = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete every row whose hop budget is spent. Returns rows deleted.
    pub async fn purge_expired(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE hops >= ttl")
            .execute(&self.pool)
            .await?;

        counter!("driftmesh_messages_purged_total").increment(result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Delete rows older than `max_age`. Returns rows deleted.
    pub async fn purge_older_than(&self, max_age: Duration) -> StoreResult<u64> {
        let cutoff = Utc::now().timestamp_millis() - max_age.as_millis() as i64;
        let result = sqlx::query("DELETE FROM messages WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        counter!("driftmesh_messages_purged_total").increment(result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Total stored rows.
    pub async fn count(&self) -> StoreResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM messages")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("count")?)
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> StoreResult<Message> {
    Ok(Message {
        id: row.try_get("id")?,
        sender: row.try_get("sender")?,
        payload: row.try_get("payload")?,
        lat: row.try_get("lat")?,
        lng: row.try_get("lng")?,
        ttl: row.try_get::<i64, _>("ttl")? as u32,
        hops: row.try_get::<i64, _>("hops")? as u32,
        created_at: row.try_get("created_at")?,
        delivered: row.try_get::<i64, _>("delivered")? != 0,
    })
}
