//! Quality labels and classification results.

use crate::types::QueryId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Quality label assigned to an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityLabel {
    Good,
    Review,
    Bad,
}

impl QualityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLabel::Good => "GOOD",
            QualityLabel::Review => "REVIEW",
            QualityLabel::Bad => "BAD",
        }
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GOOD" => Ok(QualityLabel::Good),
            "REVIEW" => Ok(QualityLabel::Review),
            "BAD" => Ok(QualityLabel::Bad),
            other => Err(format!("unknown quality label: {other}")),
        }
    }
}

/// Who produced an evaluation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EvaluatedBy {
    Auto,
    Human,
}

impl EvaluatedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluatedBy::Auto => "auto",
            EvaluatedBy::Human => "human",
        }
    }
}

impl FromStr for EvaluatedBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(EvaluatedBy::Auto),
            "human" => Ok(EvaluatedBy::Human),
            other => Err(format!("unknown evaluator: {other}")),
        }
    }
}

/// A (label, reason, confidence) judgment before it is written.
///
/// Produced by the rule tiers and the external judge alike; the reason is a
/// short code such as `extreme_latency` or `llm_evaluation_failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Verdict {
    pub label: QualityLabel,
    pub reason: String,
    pub confidence: f64,
}

impl Verdict {
    pub fn new(label: QualityLabel, reason: impl Into<String>, confidence: f64) -> Self {
        Self {
            label,
            reason: reason.into(),
            confidence,
        }
    }
}

/// The current evaluation result for a query.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub query_id: QueryId,
    pub label: QualityLabel,
    pub reason: String,
    pub confidence_score: f64,
    pub evaluated_at: DateTime<Utc>,
    pub evaluated_by: EvaluatedBy,
}

/// One line of the training-data export: query joined with its outcome and
/// evaluation.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabeledExample {
    pub query_id: QueryId,
    pub store_id: String,
    pub query_text: String,
    pub intent: Option<String>,
    pub answer_text: Option<String>,
    pub action_taken: Option<String>,
    pub action_success: Option<bool>,
    pub label: String,
    pub reason: String,
    pub confidence_score: f64,
    pub evaluated_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_text() {
        for label in [QualityLabel::Good, QualityLabel::Review, QualityLabel::Bad] {
            assert_eq!(label.as_str().parse::<QualityLabel>().unwrap(), label);
        }
        assert!("MEDIOCRE".parse::<QualityLabel>().is_err());
    }

    #[test]
    fn label_parsing_is_case_insensitive() {
        assert_eq!("good".parse::<QualityLabel>().unwrap(), QualityLabel::Good);
        assert_eq!("Review".parse::<QualityLabel>().unwrap(), QualityLabel::Review);
    }

    #[test]
    fn labels_serialize_uppercase() {
        assert_eq!(serde_json::to_string(&QualityLabel::Bad).unwrap(), "\"BAD\"");
        assert_eq!(serde_json::to_string(&EvaluatedBy::Human).unwrap(), "\"human\"");
    }
}
