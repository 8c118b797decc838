//! Deterministic classification tiers.
//!
//! Each tier is a pure function over its event, evaluated as an ordered
//! first-match-wins rule list returning an optional [`Verdict`]. No tier
//! ever calls out of process; the external judge is the classifier's last
//! resort, not a rule.

use crate::db::models::{OutcomeEvent, QualityLabel, QueryEvent, Verdict};

// Reason codes, shared with tests and the export surface.
pub const VERY_LOW_TRANSCRIPTION_CONFIDENCE: &str = "very_low_transcription_confidence";
pub const QUERY_TOO_SHORT: &str = "query_too_short";
pub const LOW_TRANSCRIPTION_CONFIDENCE: &str = "low_transcription_confidence";
pub const HIGH_CONFIDENCE_FAST_PATH: &str = "high_confidence_fast_path";
pub const ERROR_OCCURRED: &str = "error_occurred";
pub const EXTREME_LATENCY: &str = "extreme_latency";
pub const HIGH_LATENCY: &str = "high_latency";
pub const ACTION_FAILED: &str = "action_failed";
pub const SUCCESSFUL_FAST_ACTION: &str = "successful_fast_action";
pub const LLM_EVALUATION_FAILED: &str = "llm_evaluation_failed";
pub const NO_EVALUATION_CRITERIA_MET: &str = "no_evaluation_criteria_met";

/// Tier 1: fast heuristics over the query event alone.
pub fn heuristic_tier(query: &QueryEvent) -> Option<Verdict> {
    if let Some(confidence) = query.transcription_confidence
        && confidence < 0.5
    {
        return Some(Verdict::new(QualityLabel::Bad, VERY_LOW_TRANSCRIPTION_CONFIDENCE, 0.9));
    }

    if query.query_text.chars().count() < 3 {
        return Some(Verdict::new(QualityLabel::Bad, QUERY_TOO_SHORT, 0.9));
    }

    if let Some(confidence) = query.transcription_confidence
        && confidence < 0.8
    {
        return Some(Verdict::new(QualityLabel::Review, LOW_TRANSCRIPTION_CONFIDENCE, 0.7));
    }

    if query.fast_path
        && let Some(confidence) = query.transcription_confidence
        && confidence > 0.95
    {
        return Some(Verdict::new(QualityLabel::Good, HIGH_CONFIDENCE_FAST_PATH, 0.8));
    }

    None
}

/// Tier 2: rules over the recorded outcome, when one exists.
pub fn outcome_tier(outcome: &OutcomeEvent) -> Option<Verdict> {
    if outcome.error_flag {
        return Some(Verdict::new(QualityLabel::Bad, ERROR_OCCURRED, 0.95));
    }

    if outcome.latency_ms > 10_000 {
        return Some(Verdict::new(QualityLabel::Bad, EXTREME_LATENCY, 0.9));
    }

    if outcome.latency_ms > 8_000 {
        return Some(Verdict::new(QualityLabel::Review, HIGH_LATENCY, 0.8));
    }

    if !outcome.action_success && outcome.action_taken.is_some() {
        return Some(Verdict::new(QualityLabel::Review, ACTION_FAILED, 0.8));
    }

    if outcome.action_success && outcome.latency_ms < 5_000 {
        return Some(Verdict::new(QualityLabel::Good, SUCCESSFUL_FAST_ACTION, 0.85));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{outcome_for, query_event};

    fn query_with_confidence(confidence: Option<f64>, text: &str, fast_path: bool) -> QueryEvent {
        let mut query = query_event("q-1", "s1", text);
        query.transcription_confidence = confidence;
        query.fast_path = fast_path;
        query
    }

    #[test]
    fn very_low_confidence_is_bad_regardless_of_anything_else() {
        // Even a fast-path query with plenty of text
        let query = query_with_confidence(Some(0.3), "turn on the living room lights", true);
        let verdict = heuristic_tier(&query).unwrap();
        assert_eq!(verdict.label, QualityLabel::Bad);
        assert_eq!(verdict.reason, VERY_LOW_TRANSCRIPTION_CONFIDENCE);
        assert_eq!(verdict.confidence, 0.9);
    }

    #[test]
    fn short_query_is_bad() {
        let query = query_with_confidence(None, "hm", false);
        let verdict = heuristic_tier(&query).unwrap();
        assert_eq!(verdict.label, QualityLabel::Bad);
        assert_eq!(verdict.reason, QUERY_TOO_SHORT);
    }

    #[test]
    fn short_query_loses_to_very_low_confidence() {
        // Priority order: confidence < 0.5 fires before the length rule
        let query = query_with_confidence(Some(0.4), "hm", false);
        assert_eq!(heuristic_tier(&query).unwrap().reason, VERY_LOW_TRANSCRIPTION_CONFIDENCE);
    }

    #[test]
    fn middling_confidence_needs_review() {
        let query = query_with_confidence(Some(0.7), "what's the weather", false);
        let verdict = heuristic_tier(&query).unwrap();
        assert_eq!(verdict.label, QualityLabel::Review);
        assert_eq!(verdict.reason, LOW_TRANSCRIPTION_CONFIDENCE);
        assert_eq!(verdict.confidence, 0.7);
    }

    #[test]
    fn confident_fast_path_is_good() {
        let query = query_with_confidence(Some(0.97), "what time is it", true);
        let verdict = heuristic_tier(&query).unwrap();
        assert_eq!(verdict.label, QualityLabel::Good);
        assert_eq!(verdict.reason, HIGH_CONFIDENCE_FAST_PATH);
        assert_eq!(verdict.confidence, 0.8);
    }

    #[test]
    fn fast_path_without_confidence_does_not_match() {
        // fastPath alone is not enough; the GOOD rule needs a confidence
        // reading above 0.95.
        let query = query_with_confidence(None, "play some music", true);
        assert!(heuristic_tier(&query).is_none());
    }

    #[test]
    fn unremarkable_query_matches_nothing() {
        let query = query_with_confidence(Some(0.9), "set a timer for ten minutes", false);
        assert!(heuristic_tier(&query).is_none());
    }

    #[test]
    fn error_flag_wins_over_everything() {
        let mut outcome = outcome_for("q-1", 12_000);
        outcome.error_flag = true;
        let verdict = outcome_tier(&outcome).unwrap();
        assert_eq!(verdict.label, QualityLabel::Bad);
        assert_eq!(verdict.reason, ERROR_OCCURRED);
        assert_eq!(verdict.confidence, 0.95);
    }

    #[test]
    fn extreme_latency_is_bad() {
        let outcome = outcome_for("q-1", 12_000);
        let verdict = outcome_tier(&outcome).unwrap();
        assert_eq!(verdict.label, QualityLabel::Bad);
        assert_eq!(verdict.reason, EXTREME_LATENCY);
        assert_eq!(verdict.confidence, 0.9);
    }

    #[test]
    fn high_latency_needs_review() {
        let outcome = outcome_for("q-1", 9_000);
        let verdict = outcome_tier(&outcome).unwrap();
        assert_eq!(verdict.label, QualityLabel::Review);
        assert_eq!(verdict.reason, HIGH_LATENCY);
    }

    #[test]
    fn failed_action_needs_review() {
        let mut outcome = outcome_for("q-1", 2_000);
        outcome.action_taken = Some("set_thermostat".to_string());
        outcome.action_success = false;
        let verdict = outcome_tier(&outcome).unwrap();
        assert_eq!(verdict.label, QualityLabel::Review);
        assert_eq!(verdict.reason, ACTION_FAILED);
    }

    #[test]
    fn successful_fast_action_is_good() {
        let mut outcome = outcome_for("q-1", 2_000);
        outcome.action_taken = Some("set_thermostat".to_string());
        outcome.action_success = true;
        let verdict = outcome_tier(&outcome).unwrap();
        assert_eq!(verdict.label, QualityLabel::Good);
        assert_eq!(verdict.reason, SUCCESSFUL_FAST_ACTION);
        assert_eq!(verdict.confidence, 0.85);
    }

    #[test]
    fn successful_but_slow_action_matches_nothing() {
        let mut outcome = outcome_for("q-1", 6_000);
        outcome.action_success = true;
        assert!(outcome_tier(&outcome).is_none());
    }

    #[test]
    fn no_action_and_moderate_latency_matches_nothing() {
        let outcome = outcome_for("q-1", 3_000);
        assert!(outcome_tier(&outcome).is_none());
    }
}
