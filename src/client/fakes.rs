//! In-memory fakes for the provider traits (testing and offline runs)
//!
//! `ScriptedClient` answers completion requests from a rule list and records
//! every request; `FixedScorer` returns a canned evaluation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::error::{EvaluationError, ProviderError};
use super::{Completion, CompletionClient, CompletionRequest, Scorer};
use crate::models::{EvaluationScore, TokenUsage};

// ---------------------------------------------------------------------------
// ScriptedClient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Outcome {
    Respond(String, Option<TokenUsage>),
    Fail(FailureSpec),
}

#[derive(Debug, Clone)]
enum FailureSpec {
    Status(String, u16, String),
    Timeout(Duration),
    Invalid(String),
}

impl FailureSpec {
    fn capture(err: &ProviderError) -> Self {
        match err {
            ProviderError::Status {
                provider,
                status,
                message,
            } => Self::Status(provider.clone(), *status, message.clone()),
            ProviderError::Timeout(d) => Self::Timeout(*d),
            other => Self::Invalid(other.to_string()),
        }
    }

    fn build(&self) -> ProviderError {
        match self {
            Self::Status(provider, status, message) => {
                ProviderError::status(provider.clone(), *status, message.clone())
            }
            Self::Timeout(d) => ProviderError::Timeout(*d),
            Self::Invalid(message) => ProviderError::invalid_response(message.clone()),
        }
    }
}

#[derive(Debug, Clone)]
struct Rule {
    model: Option<String>,
    prompt_contains: Option<String>,
    delay: Option<Duration>,
    outcome: Outcome,
}

impl Rule {
    fn matches(&self, req: &CompletionRequest) -> bool {
        self.model.as_deref().map_or(true, |m| m == req.model_id)
            && self
                .prompt_contains
                .as_deref()
                .map_or(true, |needle| req.prompt.contains(needle))
    }
}

/// Rule-driven fake completion client.
///
/// Rules are checked in insertion order; requests matching no rule get an
/// echo of the prompt prefixed with the model id.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    rules: Vec<Rule>,
    calls: Mutex<Vec<CompletionRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, model: Option<&str>, contains: Option<&str>, outcome: Outcome) -> Self {
        self.rules.push(Rule {
            model: model.map(str::to_string),
            prompt_contains: contains.map(str::to_string),
            delay: None,
            outcome,
        });
        self
    }

    /// Answer every request for `model` with `content`
    pub fn respond(self, model: &str, content: impl Into<String>) -> Self {
        self.push(Some(model), None, Outcome::Respond(content.into(), None))
    }

    /// Answer `model` with `content` and report token usage
    pub fn respond_with_usage(self, model: &str, content: impl Into<String>, usage: TokenUsage) -> Self {
        self.push(Some(model), None, Outcome::Respond(content.into(), Some(usage)))
    }

    /// Answer any model whose prompt contains `needle`
    pub fn respond_when(self, needle: &str, content: impl Into<String>) -> Self {
        self.push(None, Some(needle), Outcome::Respond(content.into(), None))
    }

    /// Fail every request for `model`
    pub fn fail(self, model: &str, err: ProviderError) -> Self {
        self.push(Some(model), None, Outcome::Fail(FailureSpec::capture(&err)))
    }

    /// Fail any request whose prompt contains `needle`
    pub fn fail_when(self, needle: &str, err: ProviderError) -> Self {
        self.push(None, Some(needle), Outcome::Fail(FailureSpec::capture(&err)))
    }

    /// Delay the most recently added rule before it resolves
    pub fn after(mut self, delay: Duration) -> Self {
        if let Some(rule) = self.rules.last_mut() {
            rule.delay = Some(delay);
        }
        self
    }

    /// Every request received so far, in arrival order
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Highest number of requests observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter even when the future is dropped
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn generate(&self, req: &CompletionRequest) -> Result<Completion, ProviderError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(req.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let rule = self.rules.iter().find(|r| r.matches(req));

        if let Some(delay) = rule.and_then(|r| r.delay) {
            tokio::time::sleep(delay).await;
        }

        match rule.map(|r| &r.outcome) {
            Some(Outcome::Respond(content, usage)) => Ok(Completion {
                content: content.clone(),
                usage: *usage,
            }),
            Some(Outcome::Fail(spec)) => Err(spec.build()),
            None => Ok(Completion::new(format!("[{}] {}", req.model_id, req.prompt))),
        }
    }
}

// ---------------------------------------------------------------------------
// FixedScorer
// ---------------------------------------------------------------------------

/// Scorer returning the same evaluation (or failure) for every output
#[derive(Debug)]
pub struct FixedScorer {
    score: Option<EvaluationScore>,
    calls: AtomicUsize,
}

impl FixedScorer {
    pub fn new(score: EvaluationScore) -> Self {
        Self {
            score: Some(score),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            score: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scorer for FixedScorer {
    async fn evaluate(
        &self,
        _prompt: &str,
        _output: &str,
        _temperature: f32,
    ) -> Result<EvaluationScore, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.score
            .clone()
            .ok_or_else(|| EvaluationError::Unavailable("fixed scorer configured to fail".into()))
    }
}
