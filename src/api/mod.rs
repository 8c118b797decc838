//! HTTP surface of the service.
//!
//! - **[`handlers`]**: axum route handlers (ingest, stats, evaluations, health)
//! - **[`models`]**: request/response shapes for the wire, separate from the
//!   stored row structs in [`crate::db::models`]
//!
//! The ingestion body is a `type`-tagged JSON object; everything else is
//! plain parameterized reads plus the human-review upsert. All endpoints
//! carry utoipa annotations and are served in the OpenAPI document at
//! `/api-docs/openapi.json`.

pub mod handlers;
pub mod models;
