//! Test result models for prompt runs
//!
//! Defines evaluation scores, per-item results, run summaries and run state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::test_case::{TestCase, WorkItem};

/// Minimum overall score for a result to count as passed
pub const PASS_THRESHOLD: u8 = 70;

/// Score given to every dimension of a failed or timed-out item
pub const DEGRADED_SCORE: u8 = 25;

const RELEVANCE_WEIGHT: f64 = 0.40;
const CLARITY_WEIGHT: f64 = 0.35;
const CREATIVITY_WEIGHT: f64 = 0.25;

/// Fast-mode score for outputs with content
const FAST_CONTENT_SCORE: u8 = 75;

/// Minimum trimmed length for fast mode to treat an output as having content
const FAST_CONTENT_MIN_CHARS: usize = 10;

/// Quality scores for one generated output
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationScore {
    pub relevance: u8,
    pub clarity: u8,
    pub creativity: u8,
    pub overall: u8,
    pub critique: String,
}

impl EvaluationScore {
    /// Build a score whose overall is the 0.40/0.35/0.25 weighted mean
    pub fn weighted(relevance: u8, clarity: u8, creativity: u8, critique: impl Into<String>) -> Self {
        let relevance = relevance.min(100);
        let clarity = clarity.min(100);
        let creativity = creativity.min(100);

        Self {
            relevance,
            clarity,
            creativity,
            overall: weighted_overall(relevance, clarity, creativity),
            critique: critique.into(),
        }
    }

    /// Same score on every dimension
    pub fn uniform(score: u8, critique: impl Into<String>) -> Self {
        let score = score.min(100);
        Self {
            relevance: score,
            clarity: score,
            creativity: score,
            overall: score,
            critique: critique.into(),
        }
    }

    /// Heuristic used in fast mode instead of a scorer call
    pub fn fast(output: &str) -> Self {
        if output.trim().chars().count() > FAST_CONTENT_MIN_CHARS {
            Self::uniform(
                FAST_CONTENT_SCORE,
                "Fast evaluation: the model produced a substantive response",
            )
        } else {
            Self::uniform(
                DEGRADED_SCORE,
                "Fast evaluation: the response was empty or too short",
            )
        }
    }

    /// Low fixed score for an item that failed or timed out
    pub fn degraded(critique: impl Into<String>) -> Self {
        Self::uniform(DEGRADED_SCORE, critique)
    }

    pub fn passes(&self) -> bool {
        self.overall >= PASS_THRESHOLD
    }
}

/// Weighted overall score, rounded half away from zero
pub fn weighted_overall(relevance: u8, clarity: u8, creativity: u8) -> u8 {
    let overall = f64::from(relevance) * RELEVANCE_WEIGHT
        + f64::from(clarity) * CLARITY_WEIGHT
        + f64::from(creativity) * CREATIVITY_WEIGHT;
    overall.round().clamp(0.0, 100.0) as u8
}

/// Token counters reported by the completion provider
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u32,
    pub output: u32,
    pub total: u32,
}

impl TokenUsage {
    pub fn new(input: u32, output: u32) -> Self {
        Self {
            input,
            output,
            total: input.saturating_add(output),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Result of executing one work item
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestResult {
    pub test_case: TestCase,
    pub model_id: String,
    pub model_name: String,
    pub actual_output: String,
    pub passed: bool,
    pub evaluation: EvaluationScore,
    pub execution_time_ms: u64,
    pub token_usage: TokenUsage,
}

impl TestResult {
    /// Result for a completed call; `passed` follows the evaluation
    pub fn new(
        item: &WorkItem,
        model_name: impl Into<String>,
        actual_output: impl Into<String>,
        evaluation: EvaluationScore,
        execution_time_ms: u64,
        token_usage: TokenUsage,
    ) -> Self {
        Self {
            test_case: item.test_case.clone(),
            model_id: item.model_id.clone(),
            model_name: model_name.into(),
            actual_output: actual_output.into(),
            passed: evaluation.passes(),
            evaluation,
            execution_time_ms,
            token_usage,
        }
    }

    /// Synthesized result standing in for a failed or timed-out item
    pub fn degraded(item: &WorkItem, model_name: impl Into<String>, critique: impl Into<String>) -> Self {
        Self {
            test_case: item.test_case.clone(),
            model_id: item.model_id.clone(),
            model_name: model_name.into(),
            actual_output: String::new(),
            passed: false,
            evaluation: EvaluationScore::degraded(critique),
            execution_time_ms: 0,
            token_usage: TokenUsage::default(),
        }
    }

    pub fn symbol(&self) -> &'static str {
        if self.passed {
            "✓"
        } else {
            "✗"
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} on {} - score {} [{}ms]",
            self.symbol(),
            self.test_case.id,
            self.model_name,
            self.evaluation.overall,
            self.execution_time_ms
        )
    }
}

/// Pass/fail counts for one model
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelStats {
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl ModelStats {
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }
}

/// Summary of a complete run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub overall_passed: bool,
    pub average_score: f64,
    pub model_results: BTreeMap<String, ModelStats>,
}

impl RunSummary {
    pub fn pass_rate(&self) -> f64 {
        if self.total_tests == 0 {
            0.0
        } else {
            (self.passed_tests as f64 / self.total_tests as f64) * 100.0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Avg score: {:.2}",
            self.total_tests, self.passed_tests, self.failed_tests, self.average_score
        )?;
        for (model, stats) in &self.model_results {
            writeln!(
                f,
                "  {model}: {}/{} passed ({:.1}%)",
                stats.passed,
                stats.total,
                stats.pass_rate()
            )?;
        }
        write!(
            f,
            "Overall: {}",
            if self.overall_passed { "PASS" } else { "FAIL" }
        )
    }
}

/// Complete output of a run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AutoTestResult {
    pub prompt: String,
    pub test_cases: Vec<TestCase>,
    pub results: Vec<TestResult>,
    pub summary: RunSummary,
}

/// Lifecycle of a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "IDLE"),
            RunState::Running => write!(f, "RUNNING"),
            RunState::Succeeded => write!(f, "SUCCEEDED"),
            RunState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Position of the scheduler within the batch sequence (1-based)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub current: usize,
    pub total: usize,
}

/// Snapshot published on the run's progress channel
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProgress {
    pub state: RunState,
    pub phase: String,
    pub batch: Option<BatchProgress>,
}

impl RunProgress {
    pub fn running(phase: impl Into<String>) -> Self {
        Self {
            state: RunState::Running,
            phase: phase.into(),
            batch: None,
        }
    }

    pub fn batch(current: usize, total: usize) -> Self {
        Self {
            state: RunState::Running,
            phase: format!("Processing batch {current}/{total}…"),
            batch: Some(BatchProgress { current, total }),
        }
    }

    pub fn finished(state: RunState, phase: impl Into<String>) -> Self {
        Self {
            state,
            phase: phase.into(),
            batch: None,
        }
    }
}
