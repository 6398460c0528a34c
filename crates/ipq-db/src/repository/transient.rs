//! # Transient Repository
//!
//! Expiring key/value rows. Backs the per-role rule snapshots.
//!
//! Expiry is stored as epoch milliseconds. Expired rows are deleted when
//! read, or in bulk by [`TransientRepository::purge_expired`].

use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

#[derive(Debug, sqlx::FromRow)]
struct TransientRow {
    value: String,
    expires_at: i64,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Repository for the `transients` table.
#[derive(Debug, Clone)]
pub struct TransientRepository {
    pool: SqlitePool,
}

impl TransientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransientRepository { pool }
    }

    /// Live value under `key`.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let row = sqlx::query_as::<_, TransientRow>(
            "SELECT value, expires_at FROM transients WHERE key = ?1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) if row.expires_at > now_millis() => Ok(Some(row.value)),
            Some(_) => {
                debug!(key = %key, "Transient expired");
                self.delete(key).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Stores `value` under `key` for `ttl`.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> DbResult<()> {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now_millis().saturating_add(ttl_millis);

        sqlx::query(
            r#"
            INSERT INTO transients (key, value, expires_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        debug!(key = %key, ttl_secs = ttl.as_secs(), "Transient stored");
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM transients WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Deletes every expired row.
    ///
    /// ## Returns
    /// Number of rows removed.
    pub async fn purge_expired(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM transients WHERE expires_at <= ?1")
            .bind(now_millis())
            .execute(&self.pool)
            .await?;

        debug!(removed = result.rows_affected(), "Purged expired transients");
        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
