//! Wire shapes for the HTTP surface.
//!
//! Ingestion payloads are deliberately separate from the stored row structs:
//! callers may omit ids and timestamps, which the gateway fills in, and
//! client timestamps arrive as epoch milliseconds rather than RFC 3339.

use crate::db::models::{ModelCallEvent, OutcomeEvent, QualityLabel, QueryEvent, Verdict};
use crate::errors::Error;
use crate::types::{new_call_id, new_query_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One inbound event, discriminated by its `type` field.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestEvent {
    Query(QueryIngest),
    Outcome(OutcomeIngest),
    LlmCall(LlmCallIngest),
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryIngest {
    /// Caller-supplied id; minted server-side when absent
    pub id: Option<String>,
    pub store_id: String,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    /// Client-side creation time, epoch milliseconds; defaults to arrival time
    pub created_at: Option<i64>,
    pub query_text: String,
    pub transcription_confidence: Option<f64>,
    pub intent: Option<String>,
    #[serde(default)]
    pub fast_path: bool,
}

impl QueryIngest {
    pub fn into_event(self) -> Result<QueryEvent, Error> {
        Ok(QueryEvent {
            id: self.id.unwrap_or_else(new_query_id),
            store_id: self.store_id,
            session_id: self.session_id,
            user_id: self.user_id,
            created_at: timestamp_from_millis(self.created_at)?,
            query_text: self.query_text,
            transcription_confidence: self.transcription_confidence,
            intent: self.intent,
            fast_path: self.fast_path,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeIngest {
    pub query_id: String,
    pub answer_text: Option<String>,
    pub model_name: Option<String>,
    pub latency_ms: i64,
    pub tokens_prompt: Option<i32>,
    pub tokens_completion: Option<i32>,
    pub cost_usd: Option<f64>,
    pub action_taken: Option<String>,
    #[serde(default)]
    pub action_success: bool,
    #[serde(default)]
    pub error_flag: bool,
    pub tool_calls: Option<serde_json::Value>,
}

impl OutcomeIngest {
    pub fn into_event(self) -> OutcomeEvent {
        OutcomeEvent {
            query_id: self.query_id,
            answer_text: self.answer_text,
            model_name: self.model_name,
            latency_ms: self.latency_ms,
            tokens_prompt: self.tokens_prompt,
            tokens_completion: self.tokens_completion,
            cost_usd: self.cost_usd,
            action_taken: self.action_taken,
            action_success: self.action_success,
            error_flag: self.error_flag,
            tool_calls: self.tool_calls,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LlmCallIngest {
    /// Caller-supplied call id; minted server-side when absent
    pub call_id: Option<String>,
    pub query_id: Option<String>,
    pub customer_id: Option<String>,
    pub session_id: Option<String>,
    /// Call time, epoch milliseconds; defaults to arrival time
    pub timestamp: Option<i64>,
    pub model_name: String,
    pub provider: String,
    pub prompt_text: String,
    pub completion_text: Option<String>,
    #[serde(default)]
    pub tokens_prompt: i32,
    #[serde(default)]
    pub tokens_completion: i32,
    pub latency_ms: i64,
    #[serde(default)]
    pub cost_usd: f64,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i32>,
    pub error_message: Option<String>,
}

impl LlmCallIngest {
    pub fn into_event(self) -> Result<ModelCallEvent, Error> {
        Ok(ModelCallEvent {
            call_id: self.call_id.unwrap_or_else(new_call_id),
            query_id: self.query_id,
            customer_id: self.customer_id,
            session_id: self.session_id,
            called_at: timestamp_from_millis(self.timestamp)?,
            model_name: self.model_name,
            provider: self.provider,
            prompt_text: self.prompt_text,
            completion_text: self.completion_text,
            tokens_prompt: self.tokens_prompt,
            tokens_completion: self.tokens_completion,
            latency_ms: self.latency_ms,
            cost_usd: self.cost_usd,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            error_message: self.error_message,
        })
    }
}

/// Id of the event the gateway persisted.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    pub id: String,
}

/// Body of the manual-review upsert.
#[derive(Debug, Deserialize, ToSchema)]
pub struct HumanReviewRequest {
    pub label: QualityLabel,
    /// Defaults to `manual_review`
    pub reason: Option<String>,
    /// Defaults to 1.0
    pub confidence: Option<f64>,
}

impl HumanReviewRequest {
    pub fn into_verdict(self) -> Verdict {
        Verdict::new(
            self.label,
            self.reason.unwrap_or_else(|| "manual_review".to_string()),
            self.confidence.unwrap_or(1.0).clamp(0.0, 1.0),
        )
    }
}

fn timestamp_from_millis(millis: Option<i64>) -> Result<DateTime<Utc>, Error> {
    match millis {
        None => Ok(Utc::now()),
        Some(ms) => DateTime::from_timestamp_millis(ms).ok_or_else(|| Error::BadRequest {
            message: format!("timestamp out of range: {ms}"),
        }),
    }
}
