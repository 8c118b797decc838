//! Repository for raw interaction events.
//!
//! Events are write-once: there are no update paths. A second outcome for
//! the same query violates the primary key and surfaces as
//! [`DbError::UniqueViolation`], which the gateway maps to a 409.

use crate::db::{
    errors::Result,
    models::{ModelCallEvent, OutcomeEvent, QueryEvent},
};
use crate::types::abbrev;
use sqlx::PgPool;
use tracing::instrument;

pub struct Events;

impl Events {
    #[instrument(skip(pool, event), fields(query_id = %abbrev(&event.id), store_id = %event.store_id), err)]
    pub async fn insert_query(pool: &PgPool, event: &QueryEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO query_events
                (id, store_id, session_id, user_id, created_at, query_text,
                 transcription_confidence, intent, fast_path)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&event.id)
        .bind(&event.store_id)
        .bind(&event.session_id)
        .bind(&event.user_id)
        .bind(event.created_at)
        .bind(&event.query_text)
        .bind(event.transcription_confidence)
        .bind(&event.intent)
        .bind(event.fast_path)
        .execute(pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(pool), fields(query_id = %abbrev(id)), err)]
    pub async fn get_query(pool: &PgPool, id: &str) -> Result<Option<QueryEvent>> {
        let event = sqlx::query_as::<_, QueryEvent>(
            r#"
            SELECT id, store_id, session_id, user_id, created_at, query_text,
                   transcription_confidence, intent, fast_path
            FROM query_events WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(event)
    }

    #[instrument(skip(pool, event), fields(query_id = %abbrev(&event.query_id)), err)]
    pub async fn insert_outcome(pool: &PgPool, event: &OutcomeEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO outcome_events
                (query_id, answer_text, model_name, latency_ms, tokens_prompt,
                 tokens_completion, cost_usd, action_taken, action_success,
                 error_flag, tool_calls)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&event.query_id)
        .bind(&event.answer_text)
        .bind(&event.model_name)
        .bind(event.latency_ms)
        .bind(event.tokens_prompt)
        .bind(event.tokens_completion)
        .bind(event.cost_usd)
        .bind(&event.action_taken)
        .bind(event.action_success)
        .bind(event.error_flag)
        .bind(&event.tool_calls)
        .execute(pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(pool), fields(query_id = %abbrev(query_id)), err)]
    pub async fn get_outcome(pool: &PgPool, query_id: &str) -> Result<Option<OutcomeEvent>> {
        let event = sqlx::query_as::<_, OutcomeEvent>(
            r#"
            SELECT query_id, answer_text, model_name, latency_ms, tokens_prompt,
                   tokens_completion, cost_usd, action_taken, action_success,
                   error_flag, tool_calls
            FROM outcome_events WHERE query_id = $1
            "#,
        )
        .bind(query_id)
        .fetch_optional(pool)
        .await?;

        Ok(event)
    }

    #[instrument(skip(pool, event), fields(call_id = %abbrev(&event.call_id), model = %event.model_name), err)]
    pub async fn insert_model_call(pool: &PgPool, event: &ModelCallEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO model_call_events
                (call_id, query_id, customer_id, session_id, called_at,
                 model_name, provider, prompt_text, completion_text,
                 tokens_prompt, tokens_completion, latency_ms, cost_usd,
                 temperature, max_tokens, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(&event.call_id)
        .bind(&event.query_id)
        .bind(&event.customer_id)
        .bind(&event.session_id)
        .bind(event.called_at)
        .bind(&event.model_name)
        .bind(&event.provider)
        .bind(&event.prompt_text)
        .bind(&event.completion_text)
        .bind(event.tokens_prompt)
        .bind(event.tokens_completion)
        .bind(event.latency_ms)
        .bind(event.cost_usd)
        .bind(event.temperature)
        .bind(event.max_tokens)
        .bind(&event.error_message)
        .execute(pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(pool), fields(call_id = %abbrev(call_id)), err)]
    pub async fn get_model_call(pool: &PgPool, call_id: &str) -> Result<Option<ModelCallEvent>> {
        let event = sqlx::query_as::<_, ModelCallEvent>(
            r#"
            SELECT call_id, query_id, customer_id, session_id, called_at,
                   model_name, provider, prompt_text, completion_text,
                   tokens_prompt, tokens_completion, latency_ms, cost_usd,
                   temperature, max_tokens, error_message
            FROM model_call_events WHERE call_id = $1
            "#,
        )
        .bind(call_id)
        .fetch_optional(pool)
        .await?;

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::errors::DbError;
    use crate::test_utils::{outcome_for, query_event};

    #[sqlx::test]
    #[test_log::test]
    async fn query_events_round_trip(pool: PgPool) {
        let event = query_event("q-1", "s1", "turn the lights off");
        Events::insert_query(&pool, &event).await.unwrap();

        let fetched = Events::get_query(&pool, "q-1").await.unwrap().unwrap();
        assert_eq!(fetched.store_id, "s1");
        assert_eq!(fetched.query_text, "turn the lights off");
        assert!(!fetched.fast_path);

        assert!(Events::get_query(&pool, "missing").await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn second_outcome_for_a_query_is_a_unique_violation(pool: PgPool) {
        let event = query_event("q-1", "s1", "play some jazz");
        Events::insert_query(&pool, &event).await.unwrap();

        let outcome = outcome_for("q-1", 1200);
        Events::insert_outcome(&pool, &outcome).await.unwrap();

        let err = Events::insert_outcome(&pool, &outcome).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn outcome_requires_existing_query(pool: PgPool) {
        let outcome = outcome_for("no-such-query", 800);
        let err = Events::insert_outcome(&pool, &outcome).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
