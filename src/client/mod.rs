//! Completion and scoring collaborators.
//!
//! The engine only talks to providers through [`CompletionClient`] and
//! [`Scorer`]; transport details live in the adapters.

pub mod error;
pub mod fakes;
pub mod json;
pub mod openai;
pub mod scorer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{EvaluationScore, TokenUsage};

pub use error::{EvaluationError, ProviderError};
pub use openai::OpenAiClient;
pub use scorer::LlmScorer;

/// A single generate-text request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model_id: String,
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(model_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            prompt: prompt.into(),
            system: None,
            temperature: 0.3,
            max_tokens: None,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Generated text plus the provider's token counters
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

impl Completion {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Generate-text provider.
///
/// Implementations must be safe to call from many concurrent tasks.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn generate(&self, req: &CompletionRequest) -> Result<Completion, ProviderError>;
}

/// Output critic producing relevance/clarity/creativity/overall scores.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn evaluate(
        &self,
        prompt: &str,
        output: &str,
        temperature: f32,
    ) -> Result<EvaluationScore, EvaluationError>;
}
