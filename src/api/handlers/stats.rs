//! Read-only reporting endpoints: parameterized reads over the rollup
//! tables, plus the work-queue depth gauge.

use crate::db::handlers::{CustomerInsights, HourlyStats, LlmUsage, WorkQueue};
use crate::db::models::{CustomerInsight, HourlyStat, LlmUsageStat};
use crate::errors::Error;
use crate::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize)]
pub struct HourlyQuery {
    store_id: String,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct UsageQuery {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct QueueDepth {
    pub depth: i64,
}

// GET /stats/hourly?store_id=...&from=...&to=... - per-store hourly rollups
#[utoipa::path(
    get,
    path = "/stats/hourly",
    params(
        ("store_id" = String, Query, description = "Store to report on"),
        ("from" = Option<DateTime<Utc>>, Query, description = "Inclusive lower bucket bound"),
        ("to" = Option<DateTime<Utc>>, Query, description = "Inclusive upper bucket bound"),
    ),
    responses((status = 200, body = Vec<HourlyStat>)),
    tag = "stats"
)]
pub async fn hourly(
    State(state): State<AppState>,
    Query(query): Query<HourlyQuery>,
) -> Result<Json<Vec<HourlyStat>>, Error> {
    let stats = HourlyStats::list(&state.db, &query.store_id, query.from, query.to).await?;
    Ok(Json(stats))
}

// GET /stats/llm-usage?from=...&to=... - per-model hourly usage
#[utoipa::path(
    get,
    path = "/stats/llm-usage",
    params(
        ("from" = Option<DateTime<Utc>>, Query, description = "Inclusive lower bucket bound"),
        ("to" = Option<DateTime<Utc>>, Query, description = "Inclusive upper bucket bound"),
    ),
    responses((status = 200, body = Vec<LlmUsageStat>)),
    tag = "stats"
)]
pub async fn llm_usage(
    State(state): State<AppState>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<Vec<LlmUsageStat>>, Error> {
    let stats = LlmUsage::list(&state.db, query.from, query.to).await?;
    Ok(Json(stats))
}

// GET /customers/:customer_id/insight - running per-customer totals
#[utoipa::path(
    get,
    path = "/customers/{customer_id}/insight",
    params(("customer_id" = String, Path, description = "Customer id")),
    responses(
        (status = 200, body = CustomerInsight),
        (status = 404, description = "No model calls recorded for this customer"),
    ),
    tag = "stats"
)]
pub async fn customer_insight(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Result<Json<CustomerInsight>, Error> {
    let insight = CustomerInsights::get(&state.db, &customer_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "customer insight".to_string(),
            id: customer_id,
        })?;
    Ok(Json(insight))
}

// GET /queue/depth - unexpired items awaiting classification
#[utoipa::path(
    get,
    path = "/queue/depth",
    responses((status = 200, body = QueueDepth)),
    tag = "stats"
)]
pub async fn queue_depth(State(state): State<AppState>) -> Result<Json<QueueDepth>, Error> {
    let depth = WorkQueue::depth(&state.db).await?;
    Ok(Json(QueueDepth { depth }))
}
