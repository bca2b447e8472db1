//! Configuration file management
//!
//! Handles finding, loading, and validating configuration files.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use super::profile::{merge_profiles, merged_registry, ModelProfile, RunProfile};
use super::{read_document, write_document, AppConfig};
use crate::models::ModelRegistry;
use crate::synth::SampleTable;

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./prompt-autotest.yaml",
    "./prompt-autotest.yml",
    "./.prompt-autotest.yaml",
    "~/.config/prompt-autotest/config.yaml",
];

/// Path used when writing a new config without an explicit target
pub const DEFAULT_CONFIG_PATH: &str = "./prompt-autotest.yaml";

/// Full configuration file structure
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Version of config file format
    #[serde(default = "default_version")]
    pub version: String,

    /// Application settings
    #[serde(default)]
    pub app: AppConfig,

    /// Extra or renamed models, overlaid on the built-in registry
    #[serde(default)]
    pub models: Vec<ModelProfile>,

    /// Run profiles, overriding predefined ones by name
    #[serde(default)]
    pub run_profiles: Vec<RunProfile>,

    /// Fallback sample values keyed by variable name
    #[serde(default)]
    pub sample_values: BTreeMap<String, Vec<String>>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            app: AppConfig::default(),
            models: Vec::new(),
            run_profiles: Vec::new(),
            sample_values: BTreeMap::new(),
        }
    }
}

impl ConfigFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest-precedence configuration file that exists
    pub fn find() -> Option<PathBuf> {
        Self::find_all().into_iter().next()
    }

    /// Every standard location that exists, highest precedence first
    pub fn find_all() -> Vec<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .filter(|path| path.exists())
            .collect()
    }

    /// Layer every existing standard location, or defaults when none exists
    pub fn load_default() -> Result<Self> {
        Self::load_layered(&Self::find_all())
    }

    /// Load `paths` (highest precedence first) and merge them, so a project
    /// file overrides the user-wide one
    pub fn load_layered(paths: &[PathBuf]) -> Result<Self> {
        let mut config = Self::default();
        for path in paths.iter().rev() {
            config.merge(Self::load(path)?);
        }
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML or JSON config
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = read_document(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Write as YAML or JSON depending on the extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_document(path.as_ref(), self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !["1.0", "1.1"].contains(&self.version.as_str()) {
            anyhow::bail!("Unsupported config version: {}", self.version);
        }

        let app = &self.app;
        if app.concurrency == 0 {
            anyhow::bail!("app.concurrency must be at least 1");
        }
        if app.item_timeout_ms == 0 {
            anyhow::bail!("app.item_timeout_ms must be greater than 0");
        }
        if app.provider.timeout_secs == 0 {
            anyhow::bail!("app.provider.timeout_secs must be greater than 0");
        }
        for (key, value) in [
            ("app.temperature", app.temperature),
            ("app.evaluation_temperature", app.evaluation_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                anyhow::bail!("{key} must be between 0 and 2, got {value}");
            }
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if model.id.trim().is_empty() {
                anyhow::bail!("Model entry with empty id");
            }
            if !seen.insert(model.id.as_str()) {
                anyhow::bail!("Duplicate model id: {}", model.id);
            }
        }

        let registry = self.model_registry();
        for id in &app.default_models {
            if registry.get(id).is_none() {
                anyhow::bail!("Default model '{id}' is not in the model registry");
            }
        }

        for profile in &self.run_profiles {
            if profile.concurrency == 0 || profile.item_timeout_ms == 0 {
                anyhow::bail!(
                    "Run profile '{}' needs concurrency and item_timeout_ms above 0",
                    profile.name
                );
            }
        }

        Ok(())
    }

    /// Generate example configuration
    pub fn example() -> Self {
        let mut sample_values = BTreeMap::new();
        sample_values.insert(
            "audience".to_string(),
            vec![
                "new customers".to_string(),
                "software engineers".to_string(),
                "executives".to_string(),
            ],
        );

        Self {
            version: "1.0".to_string(),
            app: AppConfig {
                default_models: vec!["gpt-4o-mini".to_string(), "gpt-4o".to_string()],
                ..AppConfig::default()
            },
            models: vec![ModelProfile::new("gpt-4o", "GPT-4o (quality)")],
            run_profiles: vec![RunProfile::thorough()],
            sample_values,
        }
    }

    /// Built-in model profiles overlaid with the ones declared in this file
    pub fn model_profiles(&self) -> Vec<ModelProfile> {
        merge_profiles(&self.models)
    }

    pub fn model_registry(&self) -> ModelRegistry {
        merged_registry(&self.models)
    }

    /// Run profile by name, preferring the ones declared in this file
    pub fn run_profile(&self, name: &str) -> Option<RunProfile> {
        self.run_profiles
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .or_else(|| RunProfile::find(name))
    }

    /// Built-in sample table with this file's overrides applied
    pub fn sample_table(&self) -> SampleTable {
        self.sample_values
            .iter()
            .fold(SampleTable::builtin(), |table, (name, values)| {
                table.with_values(name, values.clone())
            })
    }

    /// Merge with another config (other takes precedence)
    pub fn merge(&mut self, other: ConfigFile) {
        let defaults = AppConfig::default();
        let app = other.app;
        if app.concurrency != defaults.concurrency {
            self.app.concurrency = app.concurrency;
        }
        if app.batch_delay_ms != defaults.batch_delay_ms {
            self.app.batch_delay_ms = app.batch_delay_ms;
        }
        if app.item_timeout_ms != defaults.item_timeout_ms {
            self.app.item_timeout_ms = app.item_timeout_ms;
        }
        if app.temperature != defaults.temperature {
            self.app.temperature = app.temperature;
        }
        if !app.fast_mode {
            self.app.fast_mode = false;
        }
        if app.default_models != defaults.default_models {
            self.app.default_models = app.default_models;
        }
        if app.synthesis_model.is_some() {
            self.app.synthesis_model = app.synthesis_model;
        }
        if app.judge_model.is_some() {
            self.app.judge_model = app.judge_model;
        }
        if app.provider != defaults.provider {
            self.app.provider = app.provider;
        }

        for model in other.models {
            match self.models.iter_mut().find(|m| m.id == model.id) {
                Some(existing) => *existing = model,
                None => self.models.push(model),
            }
        }
        for profile in other.run_profiles {
            if !self.run_profiles.iter().any(|p| p.name == profile.name) {
                self.run_profiles.push(profile);
            }
        }
        self.sample_values.extend(other.sample_values);
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
