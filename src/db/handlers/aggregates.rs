//! Repositories for the rollup tables.
//!
//! Counter increments use atomic `ON CONFLICT ... DO UPDATE` upserts. The
//! unique-session recount and the customer-insight running mean are
//! read-then-write sequences driven by [`crate::aggregates`]; concurrent
//! writers in the same bucket can race there, which the design accepts.

use crate::db::{
    errors::Result,
    models::{CustomerInsight, HourlyStat, LlmUsageStat, ModelCallEvent},
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

pub struct HourlyStats;

impl HourlyStats {
    /// Count one query against its store-hour, creating the bucket row on
    /// first sighting.
    #[instrument(skip(pool), fields(store_id, %bucket), err)]
    pub async fn increment_queries(pool: &PgPool, store_id: &str, bucket: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO hourly_stats (store_id, hour_bucket, total_queries)
            VALUES ($1, $2, 1)
            ON CONFLICT (store_id, hour_bucket) DO UPDATE
                SET total_queries = hourly_stats.total_queries + 1
            "#,
        )
        .bind(store_id)
        .bind(bucket)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Distinct sessions seen in this store-hour's query events. The caller
    /// writes the result back with [`HourlyStats::set_unique_sessions`].
    #[instrument(skip(pool), fields(store_id, %bucket), err)]
    pub async fn count_distinct_sessions(pool: &PgPool, store_id: &str, bucket: DateTime<Utc>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT session_id) FROM query_events
            WHERE store_id = $1
              AND session_id IS NOT NULL
              AND created_at >= $2
              AND created_at < $2 + INTERVAL '1 hour'
            "#,
        )
        .bind(store_id)
        .bind(bucket)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    #[instrument(skip(pool), fields(store_id, %bucket, count), err)]
    pub async fn set_unique_sessions(pool: &PgPool, store_id: &str, bucket: DateTime<Utc>, count: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE hourly_stats SET unique_sessions = $3
            WHERE store_id = $1 AND hour_bucket = $2
            "#,
        )
        .bind(store_id)
        .bind(bucket)
        .bind(count)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Fold an outcome's success/failure/latency/cost into its store-hour.
    #[instrument(skip(pool), fields(store_id, %bucket), err)]
    pub async fn apply_outcome(
        pool: &PgPool,
        store_id: &str,
        bucket: DateTime<Utc>,
        success: bool,
        failure: bool,
        latency_ms: i64,
        cost_usd: f64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO hourly_stats
                (store_id, hour_bucket, success_count, failure_count, total_latency_ms, total_cost_usd)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (store_id, hour_bucket) DO UPDATE
                SET success_count = hourly_stats.success_count + EXCLUDED.success_count,
                    failure_count = hourly_stats.failure_count + EXCLUDED.failure_count,
                    total_latency_ms = hourly_stats.total_latency_ms + EXCLUDED.total_latency_ms,
                    total_cost_usd = hourly_stats.total_cost_usd + EXCLUDED.total_cost_usd
            "#,
        )
        .bind(store_id)
        .bind(bucket)
        .bind(success as i64)
        .bind(failure as i64)
        .bind(latency_ms)
        .bind(cost_usd)
        .execute(pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(pool), fields(store_id), err)]
    pub async fn list(
        pool: &PgPool,
        store_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<HourlyStat>> {
        let stats = sqlx::query_as::<_, HourlyStat>(
            r#"
            SELECT store_id, hour_bucket, total_queries, success_count, failure_count,
                   total_latency_ms, total_cost_usd, unique_sessions
            FROM hourly_stats
            WHERE store_id = $1
              AND ($2::timestamptz IS NULL OR hour_bucket >= $2)
              AND ($3::timestamptz IS NULL OR hour_bucket <= $3)
            ORDER BY hour_bucket
            "#,
        )
        .bind(store_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

        Ok(stats)
    }

    #[instrument(skip(pool), fields(store_id, %bucket), err)]
    pub async fn get(pool: &PgPool, store_id: &str, bucket: DateTime<Utc>) -> Result<Option<HourlyStat>> {
        let stat = sqlx::query_as::<_, HourlyStat>(
            r#"
            SELECT store_id, hour_bucket, total_queries, success_count, failure_count,
                   total_latency_ms, total_cost_usd, unique_sessions
            FROM hourly_stats
            WHERE store_id = $1 AND hour_bucket = $2
            "#,
        )
        .bind(store_id)
        .bind(bucket)
        .fetch_optional(pool)
        .await?;

        Ok(stat)
    }
}

pub struct LlmUsage;

impl LlmUsage {
    /// Fold one model call into its model-hour usage row. The error counter
    /// derives from the presence of an error message.
    #[instrument(skip(pool, call), fields(%bucket, model = %call.model_name), err)]
    pub async fn record_call(pool: &PgPool, bucket: DateTime<Utc>, call: &ModelCallEvent) -> Result<()> {
        let total_tokens = i64::from(call.tokens_prompt) + i64::from(call.tokens_completion);
        let is_error = call.error_message.is_some();

        sqlx::query(
            r#"
            INSERT INTO llm_usage_hourly
                (hour_bucket, model_name, call_count, total_tokens, total_cost_usd, total_latency_ms, error_count)
            VALUES ($1, $2, 1, $3, $4, $5, $6)
            ON CONFLICT (hour_bucket, model_name) DO UPDATE
                SET call_count = llm_usage_hourly.call_count + 1,
                    total_tokens = llm_usage_hourly.total_tokens + EXCLUDED.total_tokens,
                    total_cost_usd = llm_usage_hourly.total_cost_usd + EXCLUDED.total_cost_usd,
                    total_latency_ms = llm_usage_hourly.total_latency_ms + EXCLUDED.total_latency_ms,
                    error_count = llm_usage_hourly.error_count + EXCLUDED.error_count
            "#,
        )
        .bind(bucket)
        .bind(&call.model_name)
        .bind(total_tokens)
        .bind(call.cost_usd)
        .bind(call.latency_ms)
        .bind(is_error as i64)
        .execute(pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(pool), err)]
    pub async fn list(pool: &PgPool, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Result<Vec<LlmUsageStat>> {
        let stats = sqlx::query_as::<_, LlmUsageStat>(
            r#"
            SELECT hour_bucket, model_name, call_count, total_tokens, total_cost_usd,
                   total_latency_ms, error_count
            FROM llm_usage_hourly
            WHERE ($1::timestamptz IS NULL OR hour_bucket >= $1)
              AND ($2::timestamptz IS NULL OR hour_bucket <= $2)
            ORDER BY hour_bucket, model_name
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

        Ok(stats)
    }
}

pub struct CustomerInsights;

impl CustomerInsights {
    #[instrument(skip(pool), fields(customer_id), err)]
    pub async fn get(pool: &PgPool, customer_id: &str) -> Result<Option<CustomerInsight>> {
        let insight = sqlx::query_as::<_, CustomerInsight>(
            r#"
            SELECT customer_id, total_interactions, total_cost_usd, avg_latency_ms,
                   satisfaction_score, updated_at
            FROM customer_insights
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(pool)
        .await?;

        Ok(insight)
    }

    /// Write back a recomputed insight row; inserts on first sighting.
    #[instrument(skip(pool), fields(customer_id, total_interactions, avg_latency_ms), err)]
    pub async fn upsert(
        pool: &PgPool,
        customer_id: &str,
        total_interactions: i64,
        total_cost_usd: f64,
        avg_latency_ms: f64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customer_insights
                (customer_id, total_interactions, total_cost_usd, avg_latency_ms, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (customer_id) DO UPDATE
                SET total_interactions = EXCLUDED.total_interactions,
                    total_cost_usd = EXCLUDED.total_cost_usd,
                    avg_latency_ms = EXCLUDED.avg_latency_ms,
                    updated_at = NOW()
            "#,
        )
        .bind(customer_id)
        .bind(total_interactions)
        .bind(total_cost_usd)
        .bind(avg_latency_ms)
        .execute(pool)
        .await?;

        Ok(())
    }
}
