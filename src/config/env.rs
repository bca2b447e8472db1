//! `PROMPT_AUTOTEST_*` environment overrides
//!
//! Values that fail to parse are ignored with a warning instead of aborting,
//! so a stray variable never blocks a run.

use std::str::FromStr;
use tracing::warn;

use super::split_list;

pub const ENV_PREFIX: &str = "PROMPT_AUTOTEST";

/// Variable suffixes and their help text, in display order
const VARIABLES: &[(&str, &str)] = &[
    ("CONCURRENCY", "Work items per batch"),
    ("BATCH_DELAY_MS", "Pause between batches in milliseconds"),
    ("TIMEOUT_MS", "Per-item deadline in milliseconds"),
    ("TEMPERATURE", "Generation temperature"),
    ("FAST", "Heuristic scoring (true/false)"),
    ("BASE_URL", "OpenAI-compatible API root"),
    ("API_KEY", "API key (overrides provider.api_key_env)"),
    ("MODELS", "Comma-separated default model ids"),
    ("CONFIG", "Path to configuration file"),
    ("FORMAT", "Output format (table, json, csv, summary)"),
];

/// Overrides read from the environment
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub batch_delay_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub temperature: Option<f32>,
    pub fast: Option<bool>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub models: Vec<String>,
    pub config_file: Option<String>,
    pub format: Option<String>,
}

impl EnvConfig {
    /// Read the process environment
    pub fn load() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read overrides through `lookup`, which receives full variable names
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let source = Source(lookup);
        Self {
            concurrency: source.parsed("CONCURRENCY"),
            batch_delay_ms: source.parsed("BATCH_DELAY_MS"),
            timeout_ms: source.parsed("TIMEOUT_MS"),
            temperature: source.parsed("TEMPERATURE"),
            fast: source.flag("FAST"),
            base_url: source.text("BASE_URL"),
            api_key: source.text("API_KEY"),
            models: source
                .text("MODELS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            config_file: source.text("CONFIG"),
            format: source.text("FORMAT"),
        }
    }

    pub fn has_any(&self) -> bool {
        *self != Self::default()
    }

    pub fn format_or(&self, default: &str) -> String {
        self.format.clone().unwrap_or_else(|| default.to_string())
    }

    /// Print the effective overrides; the API key is masked
    pub fn print_summary(&self) {
        let show = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
        let rows = [
            ("CONCURRENCY", show(self.concurrency.map(|v| v.to_string()))),
            ("BATCH_DELAY_MS", show(self.batch_delay_ms.map(|v| v.to_string()))),
            ("TIMEOUT_MS", show(self.timeout_ms.map(|v| v.to_string()))),
            ("TEMPERATURE", show(self.temperature.map(|v| v.to_string()))),
            ("FAST", show(self.fast.map(|v| v.to_string()))),
            ("BASE_URL", show(self.base_url.clone())),
            ("API_KEY", show(self.api_key.as_ref().map(|_| "<set>".to_string()))),
            (
                "MODELS",
                show(Some(self.models.join(",")).filter(|m| !m.is_empty())),
            ),
            ("CONFIG", show(self.config_file.clone())),
            ("FORMAT", show(self.format.clone())),
        ];

        println!("Environment overrides:");
        for (suffix, value) in rows {
            println!("  {:32} {}", var_name(suffix), value);
        }
    }
}

fn var_name(suffix: &str) -> String {
    format!("{ENV_PREFIX}_{suffix}")
}

struct Source<F>(F);

impl<F: Fn(&str) -> Option<String>> Source<F> {
    fn text(&self, suffix: &str) -> Option<String> {
        (self.0)(&var_name(suffix)).filter(|v| !v.trim().is_empty())
    }

    fn parsed<T: FromStr>(&self, suffix: &str) -> Option<T> {
        let raw = self.text(suffix)?;
        let parsed = raw.trim().parse().ok();
        if parsed.is_none() {
            warn!("Ignoring {}={:?}: not a valid value", var_name(suffix), raw);
        }
        parsed
    }

    fn flag(&self, suffix: &str) -> Option<bool> {
        let raw = self.text(suffix)?;
        match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => {
                warn!("Ignoring {}={:?}: expected true or false", var_name(suffix), raw);
                None
            }
        }
    }
}

pub fn print_env_help() {
    println!("Environment variables:");
    println!();
    for (suffix, help) in VARIABLES {
        println!("  {:32} {}", var_name(suffix), help);
    }
    println!();
    println!("Example:");
    println!("  export {}=gpt-4o-mini,gpt-4o", var_name("MODELS"));
    println!("  prompt-autotest run --prompt 'Summarize {{{{topic}}}}'");
}
