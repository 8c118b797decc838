//! Axum route handlers.

pub mod evaluations;
pub mod ingest;
pub mod stats;

// GET /healthz - liveness probe
#[utoipa::path(
    get,
    path = "/healthz",
    responses((status = 200, description = "Service is up", body = String)),
    tag = "system"
)]
pub async fn healthz() -> &'static str {
    "OK"
}
