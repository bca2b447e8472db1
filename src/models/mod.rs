//! Data models for prompt test runs
//!
//! This module contains all data structures shared by the engine.

mod test_case;
mod test_result;

pub use test_case::{ModelInfo, ModelRegistry, TestCase, VariableSpec, WorkItem};
pub use test_result::{
    weighted_overall, AutoTestResult, BatchProgress, EvaluationScore, ModelStats, RunProgress,
    RunState, RunSummary, TestResult, TokenUsage, DEGRADED_SCORE, PASS_THRESHOLD,
};
