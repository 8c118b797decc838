//! Repository for the evaluation work queue.
//!
//! A durable key/value table with per-row expiry: `put`, `list`, `get`,
//! `delete`. Expired rows are invisible to `list`/`get`/`depth` and are
//! physically removed by [`WorkQueue::purge_expired`] at the start of each
//! classifier run.

use crate::db::{errors::Result, models::WorkItem};
use crate::types::abbrev;
use chrono::Utc;
use sqlx::PgPool;
use std::time::Duration;
use tracing::instrument;

pub struct WorkQueue;

impl WorkQueue {
    /// Enqueue a payload under `key` with a time-to-live. Re-putting an
    /// existing key refreshes both payload and expiry.
    #[instrument(skip(pool, payload), fields(query_id = %abbrev(key)), err)]
    pub async fn put(pool: &PgPool, key: &str, payload: &serde_json::Value, ttl: Duration) -> Result<()> {
        let expires_at = Utc::now() + chrono::Duration::from_std(ttl).map_err(|e| anyhow::anyhow!("queue ttl out of range: {e}"))?;

        sqlx::query(
            r#"
            INSERT INTO evaluation_queue (query_id, payload, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (query_id) DO UPDATE
                SET payload = EXCLUDED.payload,
                    expires_at = EXCLUDED.expires_at,
                    enqueued_at = NOW()
            "#,
        )
        .bind(key)
        .bind(payload)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Up to `limit` unexpired items, oldest first.
    #[instrument(skip(pool), fields(limit), err)]
    pub async fn list(pool: &PgPool, limit: i64) -> Result<Vec<WorkItem>> {
        let items = sqlx::query_as::<_, WorkItem>(
            r#"
            SELECT query_id, payload, enqueued_at, expires_at
            FROM evaluation_queue
            WHERE expires_at > NOW()
            ORDER BY enqueued_at, query_id
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(items)
    }

    #[instrument(skip(pool), fields(query_id = %abbrev(key)), err)]
    pub async fn get(pool: &PgPool, key: &str) -> Result<Option<WorkItem>> {
        let item = sqlx::query_as::<_, WorkItem>(
            r#"
            SELECT query_id, payload, enqueued_at, expires_at
            FROM evaluation_queue
            WHERE query_id = $1 AND expires_at > NOW()
            "#,
        )
        .bind(key)
        .fetch_optional(pool)
        .await?;

        Ok(item)
    }

    /// Returns whether a row was deleted. Deleting an already-removed key is
    /// a no-op, which is what makes overlapping classifier runs safe.
    #[instrument(skip(pool), fields(query_id = %abbrev(key)), err)]
    pub async fn delete(pool: &PgPool, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM evaluation_queue WHERE query_id = $1")
            .bind(key)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Drop all expired rows; returns how many were removed.
    #[instrument(skip(pool), err)]
    pub async fn purge_expired(pool: &PgPool) -> Result<u64> {
        let result = sqlx::query("DELETE FROM evaluation_queue WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Number of unexpired items awaiting classification.
    #[instrument(skip(pool), err)]
    pub async fn depth(pool: &PgPool) -> Result<i64> {
        let depth: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM evaluation_queue WHERE expires_at > NOW()")
            .fetch_one(pool)
            .await?;

        Ok(depth)
    }
}
