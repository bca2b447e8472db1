//! Run orchestration
//!
//! Drives a complete run: synthesize test cases, plan the work items,
//! execute them through the batch scheduler and aggregate the results.
//! Progress is published on a watch channel.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::aggregate::aggregate;
use super::batch::{BatchScheduler, ItemError, SchedulerConfig};
use super::planner::plan;
use crate::client::{CompletionClient, CompletionRequest, EvaluationError, Scorer};
use crate::models::{
    AutoTestResult, EvaluationScore, ModelInfo, ModelRegistry, RunProgress, RunState, TestResult,
    VariableSpec, WorkItem,
};
use crate::synth::{fallback_test_cases, SampleTable, TestCaseSynthesizer};
use crate::utils::timer::{Stopwatch, Timer};

pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1000;

pub const PHASE_SYNTHESIS: &str = "Generating test cases…";
pub const PHASE_FINALIZING: &str = "Finalizing…";
pub const PHASE_COMPLETED: &str = "Completed";

/// Engine-level failure; the run produces no result
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid run configuration: {0}")]
    InvalidConfig(String),

    #[error("run produced {actual} results for {expected} planned items")]
    ResultCountMismatch { expected: usize, actual: usize },
}

/// How each generated output is scored
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Length heuristic; no extra remote call
    #[default]
    Fast,
    /// Critique by the configured scorer
    Accurate,
}

impl EvaluationMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fast" => Some(EvaluationMode::Fast),
            "accurate" | "llm" => Some(EvaluationMode::Accurate),
            _ => None,
        }
    }
}

/// Engine options for a run
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    pub scheduler: SchedulerConfig,
    pub max_output_tokens: u32,
    pub evaluation_mode: EvaluationMode,
    pub evaluation_temperature: f32,
    /// Model that authors test cases; defaults to the first selected model
    pub synthesis_model: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            evaluation_mode: EvaluationMode::default(),
            evaluation_temperature: DEFAULT_TEMPERATURE,
            synthesis_model: None,
        }
    }
}

impl RunConfig {
    pub fn accurate(mut self) -> Self {
        self.evaluation_mode = EvaluationMode::Accurate;
        self
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_synthesis_model(mut self, model_id: impl Into<String>) -> Self {
        self.synthesis_model = Some(model_id.into());
        self
    }
}

/// Inputs of a single run
#[derive(Clone, Debug, Default)]
pub struct RunRequest {
    pub prompt: String,
    pub variables: Vec<VariableSpec>,
    pub models: Vec<ModelInfo>,
    pub selected_model_ids: Vec<String>,
    pub temperature: f32,
}

impl RunRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: DEFAULT_TEMPERATURE,
            ..Default::default()
        }
    }

    pub fn with_variables(mut self, variables: Vec<VariableSpec>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = models;
        self
    }

    pub fn select(mut self, model_ids: Vec<String>) -> Self {
        self.selected_model_ids = model_ids;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Orchestrates prompt test runs
pub struct AutoTestRunner {
    client: Arc<dyn CompletionClient>,
    scorer: Option<Arc<dyn Scorer>>,
    config: RunConfig,
    samples: SampleTable,
    progress: watch::Sender<RunProgress>,
}

impl AutoTestRunner {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        let (progress, _) = watch::channel(RunProgress::default());
        Self {
            client,
            scorer: None,
            config: RunConfig::default(),
            samples: SampleTable::builtin(),
            progress,
        }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_samples(mut self, samples: SampleTable) -> Self {
        self.samples = samples;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Receive phase and state updates for runs on this runner
    pub fn subscribe(&self) -> watch::Receiver<RunProgress> {
        self.progress.subscribe()
    }

    /// Current progress snapshot
    pub fn progress(&self) -> RunProgress {
        self.progress.borrow().clone()
    }

    fn publish(&self, progress: RunProgress) {
        debug!("[{}] {}", progress.state, progress.phase);
        self.progress.send_replace(progress);
    }

    /// Execute a complete run
    pub async fn run(&self, request: RunRequest) -> Result<AutoTestResult, EngineError> {
        match self.execute_run(request).await {
            Ok(result) => {
                self.publish(RunProgress::finished(RunState::Succeeded, PHASE_COMPLETED));
                Ok(result)
            }
            Err(e) => {
                error!("Run failed: {}", e);
                self.publish(RunProgress::finished(RunState::Failed, e.to_string()));
                Err(e)
            }
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.config.evaluation_mode == EvaluationMode::Accurate && self.scorer.is_none() {
            return Err(EngineError::InvalidConfig(
                "accurate evaluation requires a scorer".to_string(),
            ));
        }
        if self.config.scheduler.item_timeout.is_zero() {
            return Err(EngineError::InvalidConfig(
                "item timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute_run(&self, request: RunRequest) -> Result<AutoTestResult, EngineError> {
        self.validate()?;

        let mut stopwatch = Stopwatch::new();
        let registry = ModelRegistry::new(request.models);
        let model_ids = resolve_selection(&request.selected_model_ids, &registry);

        self.publish(RunProgress::running(PHASE_SYNTHESIS));
        let synthesis_model = self
            .config
            .synthesis_model
            .clone()
            .or_else(|| model_ids.first().cloned());
        let mut synthesizer =
            TestCaseSynthesizer::new(self.client.clone()).with_samples(self.samples.clone());
        if let Some(model_id) = synthesis_model {
            synthesizer = synthesizer.with_model(model_id);
        }
        let deadline = self.config.scheduler.item_timeout;
        let test_cases = match tokio::time::timeout(
            deadline,
            synthesizer.synthesize(&request.prompt, &request.variables),
        )
        .await
        {
            Ok(cases) => cases,
            Err(_) => {
                warn!(
                    "Test case synthesis exceeded {}ms, using sample values",
                    deadline.as_millis()
                );
                fallback_test_cases(&request.variables, &self.samples)
            }
        };
        stopwatch.lap("synthesis");

        let items = plan(&test_cases, &model_ids);
        info!(
            "Planned {} work items ({} test cases x {} models)",
            items.len(),
            test_cases.len(),
            model_ids.len()
        );

        let scheduler = BatchScheduler::new(self.config.scheduler);
        let template = request.prompt.as_str();
        let temperature = request.temperature;
        let registry_ref = &registry;
        let results = scheduler
            .run(
                &items,
                &registry,
                move |item| {
                    let item = item.clone();
                    async move {
                        self.execute_item(&item, template, registry_ref, temperature)
                            .await
                    }
                },
                |current, total| self.publish(RunProgress::batch(current, total)),
            )
            .await;
        stopwatch.lap("execution");

        self.publish(RunProgress::running(PHASE_FINALIZING));
        if results.len() != items.len() {
            return Err(EngineError::ResultCountMismatch {
                expected: items.len(),
                actual: results.len(),
            });
        }

        let summary = aggregate(&results, &model_ids);
        stopwatch.lap("aggregation");
        debug!("Run timings:\n{}", stopwatch.format());

        info!(
            "Run completed: {}/{} passed, average score {:.2}",
            summary.passed_tests, summary.total_tests, summary.average_score
        );

        Ok(AutoTestResult {
            prompt: request.prompt,
            test_cases,
            results,
            summary,
        })
    }

    async fn execute_item(
        &self,
        item: &WorkItem,
        template: &str,
        registry: &ModelRegistry,
        temperature: f32,
    ) -> Result<TestResult, ItemError> {
        let prompt = item.test_case.render(template);
        let request = CompletionRequest::new(&item.model_id, &prompt)
            .temperature(temperature)
            .max_tokens(self.config.max_output_tokens);

        let timer = Timer::start(item.to_string());
        let completion = self.client.generate(&request).await?;
        let execution_time_ms = timer.elapsed_ms();

        let evaluation = match self.config.evaluation_mode {
            EvaluationMode::Fast => EvaluationScore::fast(&completion.content),
            EvaluationMode::Accurate => {
                let scorer = self.scorer.as_ref().ok_or_else(|| {
                    EvaluationError::Unavailable("no scorer configured".to_string())
                })?;
                scorer
                    .evaluate(
                        &prompt,
                        &completion.content,
                        self.config.evaluation_temperature,
                    )
                    .await?
            }
        };

        Ok(TestResult::new(
            item,
            registry.display_name(&item.model_id),
            completion.content,
            evaluation,
            execution_time_ms,
            completion.usage.unwrap_or_default(),
        ))
    }
}

/// Selected ids without duplicates; an empty selection picks the first registered model
fn resolve_selection(selected: &[String], registry: &ModelRegistry) -> Vec<String> {
    let mut ids: Vec<String> = Vec::with_capacity(selected.len());
    for id in selected {
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }

    if ids.is_empty() {
        if let Some(first) = registry.first() {
            ids.push(first.id.clone());
        }
    }
    ids
}
