//! Database record structures matching table schemas.

pub mod aggregates;
pub mod evaluations;
pub mod events;
pub mod work_queue;

pub use aggregates::{CustomerInsight, HourlyStat, LlmUsageStat};
pub use evaluations::{EvaluatedBy, Evaluation, LabeledExample, QualityLabel, Verdict};
pub use events::{ModelCallEvent, OutcomeEvent, QueryEvent};
pub use work_queue::WorkItem;
