//! Rollup table records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Per-store, per-hour interaction counters.
///
/// Counters only ever grow, with one exception: `unique_sessions` is
/// recomputed from scratch on every update rather than incremented. There is
/// no finalization signal; consumers must treat any bucket as possibly still
/// mutating.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HourlyStat {
    pub store_id: String,
    pub hour_bucket: DateTime<Utc>,
    pub total_queries: i64,
    pub success_count: i64,
    pub failure_count: i64,
    pub total_latency_ms: i64,
    pub total_cost_usd: f64,
    pub unique_sessions: i64,
}

/// Per-model, per-hour LLM usage counters.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LlmUsageStat {
    pub hour_bucket: DateTime<Utc>,
    pub model_name: String,
    pub call_count: i64,
    pub total_tokens: i64,
    pub total_cost_usd: f64,
    pub total_latency_ms: i64,
    pub error_count: i64,
}

/// Running per-customer totals, created on first sighting.
///
/// `avg_latency_ms` is a running weighted mean maintained from the prior
/// mean and count, never summed independently.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInsight {
    pub customer_id: String,
    pub total_interactions: i64,
    pub total_cost_usd: f64,
    pub avg_latency_ms: f64,
    pub satisfaction_score: Option<f64>,
    pub updated_at: DateTime<Utc>,
}
