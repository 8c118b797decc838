//! Repository for evaluation results.
//!
//! Writes are idempotent upserts keyed by query id. An automatic verdict
//! replaces a prior automatic verdict but never a human one; a human verdict
//! replaces anything.

use crate::db::{
    errors::{DbError, Result},
    models::{EvaluatedBy, Evaluation, LabeledExample, QualityLabel, Verdict},
};
use crate::types::abbrev;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::instrument;

/// Raw row; label/evaluated_by are TEXT in the schema.
#[derive(FromRow)]
struct EvaluationRow {
    query_id: String,
    label: String,
    reason: String,
    confidence_score: f64,
    evaluated_at: DateTime<Utc>,
    evaluated_by: String,
}

impl TryFrom<EvaluationRow> for Evaluation {
    type Error = DbError;

    fn try_from(row: EvaluationRow) -> Result<Self> {
        Ok(Evaluation {
            query_id: row.query_id,
            label: row.label.parse::<QualityLabel>().map_err(|e| DbError::Other(anyhow::anyhow!(e)))?,
            reason: row.reason,
            confidence_score: row.confidence_score,
            evaluated_at: row.evaluated_at,
            evaluated_by: row
                .evaluated_by
                .parse::<EvaluatedBy>()
                .map_err(|e| DbError::Other(anyhow::anyhow!(e)))?,
        })
    }
}

const SELECT_COLUMNS: &str = "query_id, label, reason, confidence_score, evaluated_at, evaluated_by";

pub struct Evaluations;

impl Evaluations {
    /// Upsert an automatic verdict. No-op when a human verdict already
    /// exists for the query.
    #[instrument(skip(pool, verdict), fields(query_id = %abbrev(query_id), label = %verdict.label), err)]
    pub async fn upsert_auto(pool: &PgPool, query_id: &str, verdict: &Verdict) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO evaluation_results (query_id, label, reason, confidence_score, evaluated_at, evaluated_by)
            VALUES ($1, $2, $3, $4, NOW(), 'auto')
            ON CONFLICT (query_id) DO UPDATE
                SET label = EXCLUDED.label,
                    reason = EXCLUDED.reason,
                    confidence_score = EXCLUDED.confidence_score,
                    evaluated_at = EXCLUDED.evaluated_at
                WHERE evaluation_results.evaluated_by = 'auto'
            "#,
        )
        .bind(query_id)
        .bind(verdict.label.as_str())
        .bind(&verdict.reason)
        .bind(verdict.confidence)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Upsert a human verdict, replacing any prior result.
    #[instrument(skip(pool, verdict), fields(query_id = %abbrev(query_id), label = %verdict.label), err)]
    pub async fn upsert_human(pool: &PgPool, query_id: &str, verdict: &Verdict) -> Result<Evaluation> {
        let row = sqlx::query_as::<_, EvaluationRow>(
            r#"
            INSERT INTO evaluation_results (query_id, label, reason, confidence_score, evaluated_at, evaluated_by)
            VALUES ($1, $2, $3, $4, NOW(), 'human')
            ON CONFLICT (query_id) DO UPDATE
                SET label = EXCLUDED.label,
                    reason = EXCLUDED.reason,
                    confidence_score = EXCLUDED.confidence_score,
                    evaluated_at = EXCLUDED.evaluated_at,
                    evaluated_by = 'human'
            RETURNING query_id, label, reason, confidence_score, evaluated_at, evaluated_by
            "#,
        )
        .bind(query_id)
        .bind(verdict.label.as_str())
        .bind(&verdict.reason)
        .bind(verdict.confidence)
        .fetch_one(pool)
        .await?;

        row.try_into()
    }

    #[instrument(skip(pool), fields(query_id = %abbrev(query_id)), err)]
    pub async fn get(pool: &PgPool, query_id: &str) -> Result<Option<Evaluation>> {
        let row = sqlx::query_as::<_, EvaluationRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM evaluation_results WHERE query_id = $1"
        ))
        .bind(query_id)
        .fetch_optional(pool)
        .await?;

        row.map(Evaluation::try_from).transpose()
    }

    /// Most recent evaluations, optionally filtered by label.
    #[instrument(skip(pool), fields(limit), err)]
    pub async fn list_recent(pool: &PgPool, label: Option<QualityLabel>, limit: i64) -> Result<Vec<Evaluation>> {
        let rows = match label {
            Some(label) => {
                sqlx::query_as::<_, EvaluationRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM evaluation_results
                     WHERE label = $1 ORDER BY evaluated_at DESC LIMIT $2"
                ))
                .bind(label.as_str())
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, EvaluationRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM evaluation_results
                     ORDER BY evaluated_at DESC LIMIT $1"
                ))
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
        };

        rows.into_iter().map(Evaluation::try_from).collect()
    }

    /// Labeled queries joined with their outcome, for training-data export.
    #[instrument(skip(pool), fields(limit), err)]
    pub async fn export_labeled(pool: &PgPool, limit: i64) -> Result<Vec<LabeledExample>> {
        let rows = sqlx::query_as::<_, LabeledExample>(
            r#"
            SELECT q.id AS query_id, q.store_id, q.query_text, q.intent,
                   o.answer_text, o.action_taken, o.action_success,
                   e.label, e.reason, e.confidence_score, e.evaluated_by
            FROM evaluation_results e
            JOIN query_events q ON q.id = e.query_id
            LEFT JOIN outcome_events o ON o.query_id = e.query_id
            ORDER BY q.id
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}
