//! Batch quality classification.
//!
//! The [`BatchClassifier`] drains the evaluation work queue on a schedule and
//! writes one automatic verdict per item. Classification walks three tiers in
//! order and stops at the first answer:
//!
//! 1. heuristics over the query event itself ([`rules::heuristic_tier`])
//! 2. rules over the stored outcome, if one exists ([`rules::outcome_tier`])
//! 3. the external quality model ([`judge::QualityJudge`]), when configured
//!
//! A query that falls through every tier is marked REVIEW so a human sees it.
//! Item failures are logged and the item stays queued for the next run; the
//! queue TTL bounds how long a poison item can linger.

pub mod judge;
pub mod rules;
mod scheduler;

pub use judge::QualityJudge;
pub use scheduler::run_daemon;

use crate::config::ClassifierConfig;
use crate::db::handlers::{Events, Evaluations, WorkQueue};
use crate::db::models::{QualityLabel, QueryEvent, Verdict, WorkItem};
use crate::errors::Result;
use crate::types::abbrev;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

/// Outcome of a single classifier run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    /// Expired items purged before processing
    pub purged: u64,
    /// Items classified and removed from the queue
    pub classified: usize,
    /// Items that errored and remain queued
    pub failed: usize,
}

pub struct BatchClassifier {
    pool: PgPool,
    batch_size: i64,
    judge: Option<QualityJudge>,
}

impl BatchClassifier {
    pub fn new(pool: PgPool, config: &ClassifierConfig, judge: Option<QualityJudge>) -> Self {
        Self {
            pool,
            batch_size: config.batch_size,
            judge,
        }
    }

    /// Purge expired work, then classify up to one batch of pending items.
    #[instrument(skip(self), err)]
    pub async fn run_once(&self) -> Result<RunSummary> {
        let mut summary = RunSummary {
            purged: WorkQueue::purge_expired(&self.pool).await?,
            ..Default::default()
        };

        let items = WorkQueue::list(&self.pool, self.batch_size).await?;
        for item in items {
            match self.process_item(&item).await {
                Ok(()) => summary.classified += 1,
                Err(error) => {
                    // Leave the item queued; it retries next run until it expires
                    warn!(query_id = %abbrev(&item.query_id), %error, "failed to classify queue item");
                    summary.failed += 1;
                }
            }
        }

        debug!(
            purged = summary.purged,
            classified = summary.classified,
            failed = summary.failed,
            "classifier run complete"
        );
        Ok(summary)
    }

    /// Classify one item, record the verdict, and dequeue it.
    async fn process_item(&self, item: &WorkItem) -> Result<()> {
        let query: QueryEvent = serde_json::from_value(item.payload.clone())
            .map_err(|e| anyhow::anyhow!("undecodable queue payload: {e}"))?;

        let verdict = self.classify(&query).await?;
        debug!(
            query_id = %abbrev(&query.id),
            label = %verdict.label,
            reason = %verdict.reason,
            "classified query"
        );

        Evaluations::upsert_auto(&self.pool, &query.id, &verdict).await?;
        WorkQueue::delete(&self.pool, &query.id).await?;
        Ok(())
    }

    async fn classify(&self, query: &QueryEvent) -> Result<Verdict> {
        if let Some(verdict) = rules::heuristic_tier(query) {
            return Ok(verdict);
        }

        let outcome = Events::get_outcome(&self.pool, &query.id).await?;
        if let Some(outcome) = &outcome
            && let Some(verdict) = rules::outcome_tier(outcome)
        {
            return Ok(verdict);
        }

        if let Some(judge) = &self.judge {
            match judge.judge(query, outcome.as_ref()).await {
                Ok(verdict) => return Ok(verdict),
                Err(error) => {
                    // Judge failures are terminal for this item: flag for review
                    warn!(query_id = %abbrev(&query.id), %error, "quality model call failed");
                    return Ok(Verdict::new(QualityLabel::Review, rules::LLM_EVALUATION_FAILED, 0.5));
                }
            }
        }

        Ok(Verdict::new(QualityLabel::Review, rules::NO_EVALUATION_CRITERIA_MET, 0.5))
    }
}
