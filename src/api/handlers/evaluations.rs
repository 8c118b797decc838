//! Evaluation results: listing, manual review, and training-data export.

use crate::api::models::HumanReviewRequest;
use crate::db::handlers::{Events, Evaluations};
use crate::db::models::{Evaluation, QualityLabel};
use crate::errors::Error;
use crate::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

const DEFAULT_LIST_LIMIT: i64 = 50;
const EXPORT_LIMIT: i64 = 10_000;

#[derive(Deserialize)]
pub struct EvaluationsQuery {
    label: Option<QualityLabel>,
    limit: Option<i64>,
}

// GET /evaluations?label=BAD&limit=50 - most recent evaluations
#[utoipa::path(
    get,
    path = "/evaluations",
    params(
        ("label" = Option<QualityLabel>, Query, description = "Filter by label"),
        ("limit" = Option<i64>, Query, description = "Max rows, default 50"),
    ),
    responses((status = 200, body = Vec<Evaluation>)),
    tag = "evaluations"
)]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<EvaluationsQuery>,
) -> Result<Json<Vec<Evaluation>>, Error> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 1_000);
    let evaluations = Evaluations::list_recent(&state.db, query.label, limit).await?;
    Ok(Json(evaluations))
}

// POST /evaluations/:query_id - record a human verdict, replacing any prior result
#[utoipa::path(
    post,
    path = "/evaluations/{query_id}",
    params(("query_id" = String, Path, description = "Query to review")),
    request_body = HumanReviewRequest,
    responses(
        (status = 200, body = Evaluation),
        (status = 404, description = "No such query"),
    ),
    tag = "evaluations"
)]
pub async fn review(
    State(state): State<AppState>,
    Path(query_id): Path<String>,
    Json(request): Json<HumanReviewRequest>,
) -> Result<Json<Evaluation>, Error> {
    if Events::get_query(&state.db, &query_id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "query".to_string(),
            id: query_id,
        });
    }

    let evaluation = Evaluations::upsert_human(&state.db, &query_id, &request.into_verdict()).await?;
    Ok(Json(evaluation))
}

// GET /export/evaluations - labeled examples as JSONL, one object per line
#[utoipa::path(
    get,
    path = "/export/evaluations",
    responses((status = 200, description = "JSONL export of labeled interactions", body = String)),
    tag = "evaluations"
)]
pub async fn export(State(state): State<AppState>) -> Result<Response, Error> {
    let examples = Evaluations::export_labeled(&state.db, EXPORT_LIMIT).await?;

    let mut body = String::new();
    for example in &examples {
        let line = serde_json::to_string(example).map_err(|e| anyhow::anyhow!("export serialization: {e}"))?;
        body.push_str(&line);
        body.push('\n');
    }

    Ok(([(header::CONTENT_TYPE, "application/x-ndjson")], body).into_response())
}
