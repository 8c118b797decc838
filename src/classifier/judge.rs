//! External quality-model client (the model tier's collaborator).
//!
//! Sends an OpenAI-style chat completion request asking for a single JSON
//! judgment and parses `{label, reason, confidence}` out of the completion.
//! The call is bounded by the configured hard timeout; the caller converts
//! any [`JudgeError`] into the terminal REVIEW fallback, so nothing here
//! retries.

use crate::config::JudgeConfig;
use crate::db::models::{OutcomeEvent, QualityLabel, QueryEvent, Verdict};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::instrument;
use url::Url;

#[derive(Error, Debug)]
pub enum JudgeError {
    /// Transport-level failure, including the hard timeout
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    /// Non-2xx response from the quality model API
    #[error("quality model returned HTTP {0}")]
    Status(StatusCode),

    /// Response body did not contain a parseable judgment
    #[error("malformed judgment: {0}")]
    Malformed(String),
}

/// What the model is asked to return inside the completion text.
#[derive(Debug, Deserialize)]
struct Judgment {
    label: String,
    reason: String,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

const SYSTEM_PROMPT: &str = "You judge the quality of a voice/text assistant interaction. \
    Reply with a single JSON object: {\"label\": \"GOOD\"|\"REVIEW\"|\"BAD\", \
    \"reason\": \"<short_snake_case_code>\", \"confidence\": <0.0-1.0>}. No other text.";

pub struct QualityJudge {
    client: Client,
    api_url: Url,
    api_key: String,
    model: String,
}

impl QualityJudge {
    pub fn new(config: &JudgeConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Request a judgment for one interaction.
    #[instrument(skip_all, fields(query_id = %crate::types::abbrev(&query.id)), err)]
    pub async fn judge(&self, query: &QueryEvent, outcome: Option<&OutcomeEvent>) -> Result<Verdict, JudgeError> {
        let url = format!("{}/chat/completions", self.api_url.as_str().trim_end_matches('/'));
        let payload = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(query, outcome) },
            ],
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(JudgeError::Status(status));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .ok_or_else(|| JudgeError::Malformed("empty completion".to_string()))?;

        parse_judgment(content)
    }
}

/// Assemble the interaction summary the model judges.
fn build_prompt(query: &QueryEvent, outcome: Option<&OutcomeEvent>) -> String {
    let mut prompt = format!("User query: {}\n", query.query_text);

    if let Some(intent) = &query.intent {
        prompt.push_str(&format!("Detected intent: {intent}\n"));
    }

    match outcome {
        Some(outcome) => {
            if let Some(answer) = &outcome.answer_text {
                prompt.push_str(&format!("Assistant answer: {answer}\n"));
            }
            if let Some(action) = &outcome.action_taken {
                prompt.push_str(&format!("Action taken: {action} (success: {})\n", outcome.action_success));
            }
        }
        None => prompt.push_str("No outcome recorded yet.\n"),
    }

    prompt
}

/// Parse `{label, reason, confidence}` from the completion text. Tolerates
/// models that wrap the object in prose or code fences by slicing the first
/// balanced-looking object.
fn parse_judgment(content: &str) -> Result<Verdict, JudgeError> {
    let trimmed = content.trim();
    let candidate = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => return Err(JudgeError::Malformed(format!("no JSON object in: {trimmed:.60}"))),
    };

    let judgment: Judgment = serde_json::from_str(candidate).map_err(|e| JudgeError::Malformed(e.to_string()))?;

    let label = judgment
        .label
        .parse::<QualityLabel>()
        .map_err(JudgeError::Malformed)?;

    Ok(Verdict::new(label, judgment.reason, judgment.confidence.clamp(0.0, 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::query_event;
    use std::time::Duration;
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn judge_config(server_url: &str, timeout: Duration) -> JudgeConfig {
        JudgeConfig {
            api_url: server_url.parse().unwrap(),
            api_key: "test-key".to_string(),
            model: "judge-1".to_string(),
            timeout,
        }
    }

    fn chat_body(content: &str) -> serde_json::Value {
        json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] })
    }

    #[tokio::test]
    async fn parses_a_well_formed_judgment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(bearer_token("test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
                r#"{"label": "GOOD", "reason": "helpful_answer", "confidence": 0.82}"#,
            )))
            .mount(&server)
            .await;

        let judge = QualityJudge::new(&judge_config(&server.uri(), Duration::from_secs(5))).unwrap();
        let verdict = judge.judge(&query_event("q-1", "s1", "weather"), None).await.unwrap();

        assert_eq!(verdict.label, QualityLabel::Good);
        assert_eq!(verdict.reason, "helpful_answer");
        assert_eq!(verdict.confidence, 0.82);
    }

    #[tokio::test]
    async fn tolerates_code_fences_around_the_judgment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
                "```json\n{\"label\": \"bad\", \"reason\": \"wrong_answer\", \"confidence\": 1.4}\n```",
            )))
            .mount(&server)
            .await;

        let judge = QualityJudge::new(&judge_config(&server.uri(), Duration::from_secs(5))).unwrap();
        let verdict = judge.judge(&query_event("q-1", "s1", "weather"), None).await.unwrap();

        assert_eq!(verdict.label, QualityLabel::Bad);
        // Confidence is clamped into [0, 1]
        assert_eq!(verdict.confidence, 1.0);
    }

    #[tokio::test]
    async fn non_2xx_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let judge = QualityJudge::new(&judge_config(&server.uri(), Duration::from_secs(5))).unwrap();
        let err = judge.judge(&query_event("q-1", "s1", "weather"), None).await.unwrap_err();

        assert!(matches!(err, JudgeError::Status(StatusCode::SERVICE_UNAVAILABLE)));
    }

    #[tokio::test]
    async fn malformed_content_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("I think it went fine!")))
            .mount(&server)
            .await;

        let judge = QualityJudge::new(&judge_config(&server.uri(), Duration::from_secs(5))).unwrap();
        let err = judge.judge(&query_event("q-1", "s1", "weather"), None).await.unwrap_err();

        assert!(matches!(err, JudgeError::Malformed(_)));
    }

    #[tokio::test]
    async fn slow_responses_hit_the_hard_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_body(r#"{"label": "GOOD", "reason": "x", "confidence": 0.9}"#))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let judge = QualityJudge::new(&judge_config(&server.uri(), Duration::from_millis(50))).unwrap();
        let err = judge.judge(&query_event("q-1", "s1", "weather"), None).await.unwrap_err();

        match err {
            JudgeError::Request(e) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
