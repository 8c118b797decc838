//! Repository implementations for database access.
//!
//! Each repository is a unit struct with pool-level methods, encapsulating
//! the SQL for one table group:
//!
//! - [`Events`]: raw query / outcome / model-call event storage
//! - [`Evaluations`]: classification results (idempotent upsert by query id)
//! - [`WorkQueue`]: the expiring pending-classification queue
//! - [`HourlyStats`], [`LlmUsage`], [`CustomerInsights`]: rollup tables
//!
//! The rollup repositories expose primitive reads and upserts only; the
//! read-modify-write sequencing (and its documented races) lives in
//! [`crate::aggregates`].

pub mod aggregates;
pub mod evaluations;
pub mod events;
pub mod work_queue;

pub use aggregates::{CustomerInsights, HourlyStats, LlmUsage};
pub use evaluations::Evaluations;
pub use events::Events;
pub use work_queue::WorkQueue;
