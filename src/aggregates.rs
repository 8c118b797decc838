//! Aggregate maintenance driven by event ingestion.
//!
//! Each accepted event triggers one maintenance pass here, run on a detached
//! task after the raw event is durable. Counter bumps are atomic upserts; the
//! unique-session recount and the customer running mean are read-then-write
//! and can drop an update under concurrent ingestion for the same key, which
//! the rollups tolerate (they are monitoring data, not billing).

use crate::db::handlers::{CustomerInsights, Events, HourlyStats, LlmUsage};
use crate::db::models::{ModelCallEvent, OutcomeEvent, QueryEvent};
use crate::errors::Result;
use crate::types::{abbrev, hour_bucket};
use sqlx::PgPool;
use tracing::instrument;

#[derive(Clone)]
pub struct AggregateMaintainer {
    pool: PgPool,
}

impl AggregateMaintainer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fold a new query into its store-hour bucket and refresh the bucket's
    /// distinct-session count.
    #[instrument(skip(self, query), fields(query_id = %abbrev(&query.id), store_id = %query.store_id), err)]
    pub async fn record_query(&self, query: &QueryEvent) -> Result<()> {
        let bucket = hour_bucket(query.created_at);
        HourlyStats::increment_queries(&self.pool, &query.store_id, bucket).await?;

        let sessions = HourlyStats::count_distinct_sessions(&self.pool, &query.store_id, bucket).await?;
        HourlyStats::set_unique_sessions(&self.pool, &query.store_id, bucket, sessions).await?;

        Ok(())
    }

    /// Fold an outcome into the bucket of its query's creation hour. The
    /// success and failure counters are independent: an outcome can bump
    /// both, either, or neither.
    #[instrument(skip(self, outcome), fields(query_id = %abbrev(&outcome.query_id)), err)]
    pub async fn record_outcome(&self, outcome: &OutcomeEvent) -> Result<()> {
        let query = Events::get_query(&self.pool, &outcome.query_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("outcome for unknown query {}", outcome.query_id))?;

        HourlyStats::apply_outcome(
            &self.pool,
            &query.store_id,
            hour_bucket(query.created_at),
            outcome.action_success,
            outcome.error_flag,
            outcome.latency_ms,
            outcome.cost_usd.unwrap_or(0.0),
        )
        .await?;

        Ok(())
    }

    /// Fold a model call into per-model usage and, when the call carries a
    /// customer id, into that customer's running insight.
    #[instrument(skip(self, call), fields(call_id = %abbrev(&call.call_id), model = %call.model_name), err)]
    pub async fn record_llm_call(&self, call: &ModelCallEvent) -> Result<()> {
        LlmUsage::record_call(&self.pool, hour_bucket(call.called_at), call).await?;

        if let Some(customer_id) = &call.customer_id {
            let (interactions, cost, avg_latency) = match CustomerInsights::get(&self.pool, customer_id).await? {
                Some(insight) => (
                    insight.total_interactions + 1,
                    insight.total_cost_usd + call.cost_usd,
                    running_mean(insight.avg_latency_ms, insight.total_interactions, call.latency_ms),
                ),
                None => (1, call.cost_usd, call.latency_ms as f64),
            };

            CustomerInsights::upsert(&self.pool, customer_id, interactions, cost, avg_latency).await?;
        }

        Ok(())
    }
}

/// Extend a mean over `count` samples with one more observation.
fn running_mean(mean: f64, count: i64, sample: i64) -> f64 {
    (mean * count as f64 + sample as f64) / (count + 1) as f64
}
