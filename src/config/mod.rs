//! Configuration module
//!
//! Handles loading and managing configuration.

pub mod env;
pub mod file;
pub mod profile;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::client::openai::DEFAULT_BASE_URL;
use crate::executor::{
    EvaluationMode, RunConfig, SchedulerConfig, DEFAULT_BATCH_DELAY_MS, DEFAULT_CONCURRENCY,
    DEFAULT_ITEM_TIMEOUT_MS, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE,
};

pub use env::EnvConfig;
pub use file::ConfigFile;
pub use profile::{merge_profiles, merged_registry, ModelProfile, ProfileManager, RunProfile};

/// Keys accepted by [`AppConfig::get`] and [`AppConfig::set`]
pub const CONFIG_KEYS: &[&str] = &[
    "app.concurrency",
    "app.batch_delay_ms",
    "app.item_timeout_ms",
    "app.temperature",
    "app.max_output_tokens",
    "app.fast_mode",
    "app.evaluation_temperature",
    "app.default_models",
    "app.synthesis_model",
    "app.judge_model",
    "app.provider.base_url",
    "app.provider.api_key_env",
    "app.provider.timeout_secs",
];

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Work items per batch
    pub concurrency: usize,

    /// Pause between batches in milliseconds
    pub batch_delay_ms: u64,

    /// Deadline for a single work item in milliseconds
    pub item_timeout_ms: u64,

    /// Sampling temperature for generation
    pub temperature: f32,

    /// Token budget for each generated output
    pub max_output_tokens: u32,

    /// Score outputs with the length heuristic instead of the judge model
    pub fast_mode: bool,

    /// Sampling temperature for the judge model
    pub evaluation_temperature: f32,

    /// Models tested when none are selected explicitly
    pub default_models: Vec<String>,

    /// Model authoring test cases (first selected model when unset)
    pub synthesis_model: Option<String>,

    /// Model scoring outputs in accurate mode (first selected model when unset)
    pub judge_model: Option<String>,

    /// Completion provider settings
    pub provider: ProviderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            batch_delay_ms: DEFAULT_BATCH_DELAY_MS,
            item_timeout_ms: DEFAULT_ITEM_TIMEOUT_MS,
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            fast_mode: true,
            evaluation_temperature: DEFAULT_TEMPERATURE,
            default_models: vec!["gpt-4o-mini".to_string()],
            synthesis_model: None,
            judge_model: None,
            provider: ProviderConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn evaluation_mode(&self) -> EvaluationMode {
        if self.fast_mode {
            EvaluationMode::Fast
        } else {
            EvaluationMode::Accurate
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            concurrency: self.concurrency,
            batch_delay: Duration::from_millis(self.batch_delay_ms),
            item_timeout: Duration::from_millis(self.item_timeout_ms),
        }
    }

    /// Engine options derived from this config
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            scheduler: self.scheduler_config(),
            max_output_tokens: self.max_output_tokens,
            evaluation_mode: self.evaluation_mode(),
            evaluation_temperature: self.evaluation_temperature,
            synthesis_model: self.synthesis_model.clone(),
        }
    }

    /// Apply environment overrides (set variables win)
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(concurrency) = env.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(delay) = env.batch_delay_ms {
            self.batch_delay_ms = delay;
        }
        if let Some(timeout) = env.timeout_ms {
            self.item_timeout_ms = timeout;
        }
        if let Some(temperature) = env.temperature {
            self.temperature = temperature;
        }
        if let Some(fast) = env.fast {
            self.fast_mode = fast;
        }
        if let Some(base_url) = &env.base_url {
            self.provider.base_url = base_url.clone();
        }
        if !env.models.is_empty() {
            self.default_models = env.models.clone();
        }
    }

    /// Read a dotted key as a display string
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "app.concurrency" => self.concurrency.to_string(),
            "app.batch_delay_ms" => self.batch_delay_ms.to_string(),
            "app.item_timeout_ms" => self.item_timeout_ms.to_string(),
            "app.temperature" => self.temperature.to_string(),
            "app.max_output_tokens" => self.max_output_tokens.to_string(),
            "app.fast_mode" => self.fast_mode.to_string(),
            "app.evaluation_temperature" => self.evaluation_temperature.to_string(),
            "app.default_models" => self.default_models.join(","),
            "app.synthesis_model" => self.synthesis_model.clone().unwrap_or_default(),
            "app.judge_model" => self.judge_model.clone().unwrap_or_default(),
            "app.provider.base_url" => self.provider.base_url.clone(),
            "app.provider.api_key_env" => self.provider.api_key_env.clone(),
            "app.provider.timeout_secs" => self.provider.timeout_secs.to_string(),
            _ => anyhow::bail!("Unknown configuration key: {key}"),
        };
        Ok(value)
    }

    /// Set a dotted key from its string form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = || format!("Invalid value for {key}: {value}");
        match key {
            "app.concurrency" => self.concurrency = value.parse().with_context(invalid)?,
            "app.batch_delay_ms" => self.batch_delay_ms = value.parse().with_context(invalid)?,
            "app.item_timeout_ms" => self.item_timeout_ms = value.parse().with_context(invalid)?,
            "app.temperature" => self.temperature = value.parse().with_context(invalid)?,
            "app.max_output_tokens" => {
                self.max_output_tokens = value.parse().with_context(invalid)?
            }
            "app.fast_mode" => self.fast_mode = value.parse().with_context(invalid)?,
            "app.evaluation_temperature" => {
                self.evaluation_temperature = value.parse().with_context(invalid)?
            }
            "app.default_models" => self.default_models = split_list(value),
            "app.synthesis_model" => self.synthesis_model = non_empty(value),
            "app.judge_model" => self.judge_model = non_empty(value),
            "app.provider.base_url" => self.provider.base_url = value.to_string(),
            "app.provider.api_key_env" => self.provider.api_key_env = value.to_string(),
            "app.provider.timeout_secs" => {
                self.provider.timeout_secs = value.parse().with_context(invalid)?
            }
            _ => anyhow::bail!("Unknown configuration key: {key}"),
        }
        Ok(())
    }
}

/// OpenAI-compatible provider settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API root; `/chat/completions` is appended
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

impl ProviderConfig {
    /// API key from `PROMPT_AUTOTEST_API_KEY`, then the configured variable
    pub fn api_key(&self, env: &EnvConfig) -> Option<String> {
        env.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Comma-separated list, trimmed, empty entries dropped
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: &str) -> Option<String> {
    Some(value.trim().to_string()).filter(|v| !v.is_empty())
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

/// Deserialize YAML (`.yaml`/`.yml`) or JSON (anything else)
pub(crate) fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let parsed = if is_yaml(path) {
        serde_yaml::from_str(&content).map_err(anyhow::Error::from)
    } else {
        serde_json::from_str(&content).map_err(anyhow::Error::from)
    };
    parsed.with_context(|| format!("Invalid configuration in {}", path.display()))
}

/// Serialize by extension, creating parent directories as needed
pub(crate) fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = if is_yaml(path) {
        serde_yaml::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create {}", dir.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("Cannot write {}", path.display()))
}
