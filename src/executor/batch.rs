//! Batched concurrent execution
//!
//! Runs work items in fixed-size batches. Items within a batch run
//! concurrently, each bound to its own deadline; batches run one after the
//! other with a pause in between to stay under provider rate limits.

use futures::future::join_all;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::client::{EvaluationError, ProviderError};
use crate::models::{ModelRegistry, TestResult, WorkItem};
use crate::utils::Timer;

pub const DEFAULT_CONCURRENCY: usize = 2;
pub const DEFAULT_BATCH_DELAY_MS: u64 = 1000;
pub const DEFAULT_ITEM_TIMEOUT_MS: u64 = 30_000;

/// Failure of a single work item
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

impl ItemError {
    pub fn is_timeout(&self) -> bool {
        match self {
            ItemError::Timeout(_) => true,
            ItemError::Provider(e) => e.is_timeout(),
            ItemError::Evaluation(e) => e.is_timeout(),
        }
    }

    /// Short code for log lines
    pub fn code(&self) -> &'static str {
        match self {
            ItemError::Timeout(_) => "timeout",
            ItemError::Provider(e) | ItemError::Evaluation(EvaluationError::Provider(e)) => e.code(),
            ItemError::Evaluation(EvaluationError::Unavailable(_)) => "scorer_unavailable",
        }
    }

    /// Critique recorded on the degraded result
    pub fn critique(&self) -> String {
        if self.is_timeout() {
            format!("Timeout: the model did not respond in time ({self})")
        } else {
            format!("Technical error: the call failed ({self})")
        }
    }
}

/// Scheduler limits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub concurrency: usize,
    pub batch_delay: Duration,
    pub item_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            batch_delay: Duration::from_millis(DEFAULT_BATCH_DELAY_MS),
            item_timeout: Duration::from_millis(DEFAULT_ITEM_TIMEOUT_MS),
        }
    }
}

/// Batch scheduler for work items
#[derive(Clone, Debug, Default)]
pub struct BatchScheduler {
    config: SchedulerConfig,
}

impl BatchScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.config.batch_delay = delay;
        self
    }

    pub fn with_item_timeout(mut self, item_timeout: Duration) -> Self {
        self.config.item_timeout = item_timeout;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Number of batches needed for `item_count` items
    pub fn batch_count(&self, item_count: usize) -> usize {
        item_count.div_ceil(self.batch_size())
    }

    fn batch_size(&self) -> usize {
        self.config.concurrency.max(1)
    }

    /// Run every item and return one result per item, in item order.
    ///
    /// Failures and timeouts become degraded results; they never abort
    /// sibling items or later batches. `on_batch` is told the 1-based batch
    /// number and the batch count before each batch starts.
    pub async fn run<F, Fut, P>(
        &self,
        items: &[WorkItem],
        registry: &ModelRegistry,
        execute: F,
        mut on_batch: P,
    ) -> Vec<TestResult>
    where
        F: Fn(&WorkItem) -> Fut,
        Fut: Future<Output = Result<TestResult, ItemError>>,
        P: FnMut(usize, usize),
    {
        let total_batches = self.batch_count(items.len());
        let mut results = Vec::with_capacity(items.len());

        info!(
            "Running {} items in {} batches (concurrency {}, delay {}ms, timeout {}ms)",
            items.len(),
            total_batches,
            self.batch_size(),
            self.config.batch_delay.as_millis(),
            self.config.item_timeout.as_millis()
        );

        for (index, batch) in items.chunks(self.batch_size()).enumerate() {
            let batch_number = index + 1;
            on_batch(batch_number, total_batches);

            let timer = Timer::start(format!("Batch {batch_number}/{total_batches}"));
            let outcomes = join_all(
                batch
                    .iter()
                    .map(|item| self.run_item(item, registry, &execute)),
            )
            .await;

            timer.stop();
            results.extend(outcomes);

            if batch_number < total_batches && !self.config.batch_delay.is_zero() {
                sleep(self.config.batch_delay).await;
            }
        }

        results
    }

    async fn run_item<F, Fut>(&self, item: &WorkItem, registry: &ModelRegistry, execute: &F) -> TestResult
    where
        F: Fn(&WorkItem) -> Fut,
        Fut: Future<Output = Result<TestResult, ItemError>>,
    {
        // Dropping the timed-out future cancels the in-flight call.
        let outcome = match timeout(self.config.item_timeout, execute(item)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ItemError::Timeout(self.config.item_timeout)),
        };

        match outcome {
            Ok(result) => {
                debug!("  {}", result);
                result
            }
            Err(e) => {
                warn!("Item {} failed [{}]: {}", item, e.code(), e);
                TestResult::degraded(item, registry.display_name(&item.model_id), e.critique())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::planner::plan;
    use crate::models::{EvaluationScore, ModelInfo, TestCase, TokenUsage};
    use std::cell::RefCell;
    use std::collections::HashSet;

    fn items(cases: usize, models: &[&str]) -> Vec<WorkItem> {
        let cases: Vec<TestCase> = (1..=cases).map(|i| TestCase::new(format!("tc{i}"))).collect();
        let models: Vec<String> = models.iter().map(|m| m.to_string()).collect();
        plan(&cases, &models)
    }

    fn registry() -> ModelRegistry {
        ModelRegistry::new(vec![ModelInfo::new("m1", "Model One")])
    }

    fn ok(item: &WorkItem, overall: u8) -> TestResult {
        TestResult::new(
            item,
            item.model_id.clone(),
            "generated output",
            EvaluationScore::uniform(overall, "ok"),
            1,
            TokenUsage::new(1, 1),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_result_per_item_in_order() {
        let items = items(3, &["m1", "m2"]);
        let scheduler = BatchScheduler::default();

        // Later items finish first; order must still follow the plan.
        let results = scheduler
            .run(
                &items,
                &registry(),
                |item| {
                    let item = item.clone();
                    async move {
                        let delay = if item.model_id == "m1" { 50 } else { 5 };
                        sleep(Duration::from_millis(delay)).await;
                        Ok::<_, ItemError>(ok(&item, 90))
                    }
                },
                |_, _| {},
            )
            .await;

        assert_eq!(results.len(), 6);
        let pairs: Vec<(String, String)> = results
            .iter()
            .map(|r| (r.test_case.id.clone(), r.model_id.clone()))
            .collect();
        let expected: Vec<(String, String)> = items
            .iter()
            .map(|i| (i.test_case.id.clone(), i.model_id.clone()))
            .collect();
        assert_eq!(pairs, expected);
        assert_eq!(pairs.iter().collect::<HashSet<_>>().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_degraded_result() {
        let items = items(1, &["m1", "m2"]);
        let scheduler = BatchScheduler::default().with_item_timeout(Duration::from_millis(100));
        let start = tokio::time::Instant::now();

        let results = scheduler
            .run(
                &items,
                &registry(),
                |item| {
                    let item = item.clone();
                    async move {
                        if item.model_id == "m1" {
                            sleep(Duration::from_secs(3600)).await;
                        }
                        Ok::<_, ItemError>(ok(&item, 80))
                    }
                },
                |_, _| {},
            )
            .await;

        assert!(start.elapsed() < Duration::from_secs(1));

        let slow = &results[0];
        assert!(!slow.passed);
        assert_eq!(slow.evaluation.overall, 25);
        assert!(slow.evaluation.critique.contains("Timeout"));
        assert_eq!(slow.model_name, "Model One");
        assert_eq!(slow.execution_time_ms, 0);

        assert!(results[1].passed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_are_isolated() {
        let items = items(2, &["m1", "m2"]);
        let scheduler = BatchScheduler::default();

        let results = scheduler
            .run(
                &items,
                &registry(),
                |item| {
                    let item = item.clone();
                    async move {
                        if item.model_id == "m2" {
                            Err(ItemError::from(ProviderError::status("fake", 500, "exploded")))
                        } else {
                            Ok(ok(&item, 95))
                        }
                    }
                },
                |_, _| {},
            )
            .await;

        assert_eq!(results.len(), 4);
        for result in &results {
            if result.model_id == "m2" {
                assert!(!result.passed);
                assert!(result.evaluation.critique.contains("Technical error"));
                assert!(result.evaluation.critique.contains("exploded"));
                // unregistered model falls back to its id
                assert_eq!(result.model_name, "m2");
            } else {
                assert!(result.passed);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_timeout_is_reported_as_timeout() {
        let items = items(1, &["m1"]);
        let results = BatchScheduler::default()
            .run(
                &items,
                &registry(),
                |_| async {
                    Err::<TestResult, _>(ItemError::from(ProviderError::Timeout(
                        Duration::from_secs(60),
                    )))
                },
                |_, _| {},
            )
            .await;

        assert!(results[0].evaluation.critique.starts_with("Timeout"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_and_delay() {
        let items = items(5, &["m1"]);
        let scheduler = BatchScheduler::default()
            .with_concurrency(2)
            .with_batch_delay(Duration::from_millis(1000));
        let batches = RefCell::new(Vec::new());
        let start = tokio::time::Instant::now();

        let results = scheduler
            .run(
                &items,
                &registry(),
                |item| {
                    let item = item.clone();
                    async move { Ok::<_, ItemError>(ok(&item, 90)) }
                },
                |current, total| batches.borrow_mut().push((current, total)),
            )
            .await;

        assert_eq!(results.len(), 5);
        assert_eq!(*batches.borrow(), vec![(1, 3), (2, 3), (3, 3)]);
        // two pauses between three batches, none after the last
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(2000));
        assert!(elapsed < Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_in_batch_run_concurrently() {
        let items = items(2, &["m1"]);
        let scheduler = BatchScheduler::default().with_batch_delay(Duration::ZERO);
        let start = tokio::time::Instant::now();

        scheduler
            .run(
                &items,
                &registry(),
                |item| {
                    let item = item.clone();
                    async move {
                        sleep(Duration::from_millis(500)).await;
                        Ok::<_, ItemError>(ok(&item, 90))
                    }
                },
                |_, _| {},
            )
            .await;

        assert!(start.elapsed() < Duration::from_millis(1000));
    }

    #[test]
    fn test_batch_count() {
        let scheduler = BatchScheduler::default();
        assert_eq!(scheduler.batch_count(0), 0);
        assert_eq!(scheduler.batch_count(4), 2);
        assert_eq!(scheduler.batch_count(5), 3);
        assert_eq!(scheduler.with_concurrency(0).batch_count(3), 3);
    }

    #[test]
    fn test_item_error_critique() {
        let timeout = ItemError::Timeout(Duration::from_millis(30_000));
        assert!(timeout.is_timeout());
        assert!(timeout.critique().contains("30000ms"));

        let failure = ItemError::from(ProviderError::status("fake", 401, "bad key"));
        assert!(!failure.is_timeout());
        assert!(failure.critique().starts_with("Technical error"));
    }

    #[test]
    fn test_item_error_code() {
        assert_eq!(ItemError::Timeout(Duration::from_secs(1)).code(), "timeout");
        assert_eq!(
            ItemError::from(ProviderError::status("fake", 429, "slow down")).code(),
            "rate_limited"
        );
        let judge = EvaluationError::from(ProviderError::invalid_response("empty"));
        assert_eq!(ItemError::from(judge).code(), "invalid_response");
        let missing = EvaluationError::Unavailable("no scorer".to_string());
        assert_eq!(ItemError::from(missing).code(), "scorer_unavailable");
    }
}
