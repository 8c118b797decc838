//! Evaluation work-queue records.

use crate::types::QueryId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A pending-classification item: the query id plus a snapshot of the
/// QueryEvent taken at ingestion time. Data-loss-tolerant by design; a row
/// that expires before processing is dropped silently.
#[derive(Debug, Clone, FromRow)]
pub struct WorkItem {
    pub query_id: QueryId,
    pub payload: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
