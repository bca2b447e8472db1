//! Test execution engine
//!
//! Plans test case x model work items, runs them in rate-limited batches and
//! folds the outcomes into a run summary.

mod aggregate;
mod batch;
mod planner;
mod runner;

pub use aggregate::aggregate;
pub use batch::{
    BatchScheduler, ItemError, SchedulerConfig, DEFAULT_BATCH_DELAY_MS, DEFAULT_CONCURRENCY,
    DEFAULT_ITEM_TIMEOUT_MS,
};
pub use planner::{plan, test_case_number};
pub use runner::{
    AutoTestRunner, EngineError, EvaluationMode, RunConfig, RunRequest, DEFAULT_MAX_OUTPUT_TOKENS,
    DEFAULT_TEMPERATURE,
};
