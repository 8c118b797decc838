//! The ingestion gateway.
//!
//! One endpoint accepts all three event types. The synchronous persist is
//! the only step that can fail the request; queue enqueue and aggregate
//! updates run on a detached task after the response is sent, and their
//! failures are logged and swallowed, never retried.

use crate::aggregates::AggregateMaintainer;
use crate::api::models::{IngestEvent, IngestResponse};
use crate::db::handlers::{Events, WorkQueue};
use crate::db::models::QueryEvent;
use crate::errors::Error;
use crate::types::abbrev;
use crate::AppState;
use axum::{Json, extract::State};
use std::time::Duration;
use tracing::warn;

// POST /ingest - persist one tagged event and kick off its side-effects
#[utoipa::path(
    post,
    path = "/ingest",
    request_body = IngestEvent,
    responses(
        (status = 200, description = "Event persisted", body = IngestResponse),
        (status = 400, description = "Malformed or unrecognized event"),
        (status = 409, description = "Duplicate outcome for this query"),
    ),
    tag = "ingest"
)]
pub async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<IngestResponse>, Error> {
    // Deserialized by hand so an unknown `type` is a 400, not a 422
    let event: IngestEvent = serde_json::from_value(body).map_err(|e| Error::BadRequest {
        message: format!("malformed or unrecognized event: {e}"),
    })?;

    match event {
        IngestEvent::Query(payload) => {
            let query = payload.into_event()?;
            Events::insert_query(&state.db, &query).await?;

            let id = query.id.clone();
            spawn_query_side_effects(state.db.clone(), query, state.config.classifier.queue_ttl);
            Ok(Json(IngestResponse { id }))
        }
        IngestEvent::Outcome(payload) => {
            let outcome = payload.into_event();
            Events::insert_outcome(&state.db, &outcome).await?;

            let id = outcome.query_id.clone();
            let maintainer = AggregateMaintainer::new(state.db.clone());
            tokio::spawn(async move {
                if let Err(error) = maintainer.record_outcome(&outcome).await {
                    warn!(query_id = %abbrev(&outcome.query_id), %error, "failed to fold outcome into hourly stats");
                }
            });
            Ok(Json(IngestResponse { id }))
        }
        IngestEvent::LlmCall(payload) => {
            let call = payload.into_event()?;
            Events::insert_model_call(&state.db, &call).await?;

            let id = call.call_id.clone();
            let maintainer = AggregateMaintainer::new(state.db.clone());
            tokio::spawn(async move {
                if let Err(error) = maintainer.record_llm_call(&call).await {
                    warn!(call_id = %abbrev(&call.call_id), %error, "failed to fold model call into usage stats");
                }
            });
            Ok(Json(IngestResponse { id }))
        }
    }
}

/// Enqueue classification work and update hourly stats for a stored query.
/// Best-effort: each failure is logged and the rest still runs.
fn spawn_query_side_effects(pool: sqlx::PgPool, query: QueryEvent, queue_ttl: Duration) {
    tokio::spawn(async move {
        match serde_json::to_value(&query) {
            Ok(snapshot) => {
                if let Err(error) = WorkQueue::put(&pool, &query.id, &snapshot, queue_ttl).await {
                    warn!(query_id = %abbrev(&query.id), %error, "failed to enqueue classification work");
                }
            }
            Err(error) => {
                warn!(query_id = %abbrev(&query.id), %error, "failed to snapshot query for the work queue");
            }
        }

        if let Err(error) = AggregateMaintainer::new(pool).record_query(&query).await {
            warn!(query_id = %abbrev(&query.id), %error, "failed to update hourly stats");
        }
    });
}
