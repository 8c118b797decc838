//! Raw interaction event records.
//!
//! All three event types are immutable once stored. These structs are also
//! the wire shape used in work-queue payload snapshots, so they keep the
//! caller-facing camelCase field names.

use crate::types::{CallId, QueryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A single user query handled by the assistant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryEvent {
    pub id: QueryId,
    pub store_id: String,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub query_text: String,
    /// Speech-to-text confidence in [0, 1]; absent for typed queries
    pub transcription_confidence: Option<f64>,
    pub intent: Option<String>,
    /// Whether the query was answered on the fast (non-LLM) path
    pub fast_path: bool,
}

/// The recorded result of handling a query. At most one per query.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeEvent {
    pub query_id: QueryId,
    pub answer_text: Option<String>,
    pub model_name: Option<String>,
    pub latency_ms: i64,
    pub tokens_prompt: Option<i32>,
    pub tokens_completion: Option<i32>,
    pub cost_usd: Option<f64>,
    pub action_taken: Option<String>,
    pub action_success: bool,
    pub error_flag: bool,
    pub tool_calls: Option<serde_json::Value>,
}

/// Audit record for one upstream LLM call. Many-to-one with a query.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelCallEvent {
    pub call_id: CallId,
    pub query_id: Option<QueryId>,
    pub customer_id: Option<String>,
    pub session_id: Option<String>,
    pub called_at: DateTime<Utc>,
    pub model_name: String,
    pub provider: String,
    pub prompt_text: String,
    pub completion_text: Option<String>,
    pub tokens_prompt: i32,
    pub tokens_completion: i32,
    pub latency_ms: i64,
    pub cost_usd: f64,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i32>,
    pub error_message: Option<String>,
}
