//! Shared fixtures for unit and database tests.

use crate::db::models::{ModelCallEvent, OutcomeEvent, QueryEvent};
use chrono::Utc;

/// A plain typed query with no confidence score, not on the fast path.
pub fn query_event(id: &str, store_id: &str, text: &str) -> QueryEvent {
    QueryEvent {
        id: id.to_string(),
        store_id: store_id.to_string(),
        session_id: None,
        user_id: None,
        created_at: Utc::now(),
        query_text: text.to_string(),
        transcription_confidence: None,
        intent: None,
        fast_path: false,
    }
}

/// An unremarkable outcome: no action, no error, no answer.
pub fn outcome_for(query_id: &str, latency_ms: i64) -> OutcomeEvent {
    OutcomeEvent {
        query_id: query_id.to_string(),
        answer_text: None,
        model_name: None,
        latency_ms,
        tokens_prompt: None,
        tokens_completion: None,
        cost_usd: None,
        action_taken: None,
        action_success: false,
        error_flag: false,
        tool_calls: None,
    }
}

/// A successful model call with modest token counts and no customer id.
pub fn model_call(call_id: &str, model_name: &str) -> ModelCallEvent {
    ModelCallEvent {
        call_id: call_id.to_string(),
        query_id: None,
        customer_id: None,
        session_id: None,
        called_at: Utc::now(),
        model_name: model_name.to_string(),
        provider: "openai".to_string(),
        prompt_text: "What is the weather like today?".to_string(),
        completion_text: Some("Sunny with a high of 21.".to_string()),
        tokens_prompt: 12,
        tokens_completion: 9,
        latency_ms: 250,
        cost_usd: 0.001,
        temperature: None,
        max_tokens: None,
        error_message: None,
    }
}
