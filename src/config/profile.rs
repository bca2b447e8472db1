//! Model and run profiles
//!
//! Provides the built-in model registry and predefined scheduling presets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::AppConfig;
use crate::models::{ModelInfo, ModelRegistry};

/// Registry entry for a completion model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    /// Provider model id sent on the wire
    pub id: String,
    /// Display name used in reports
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ModelProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Models known without any configuration file
    pub fn builtin() -> Vec<ModelProfile> {
        vec![
            Self::new("gpt-4o-mini", "GPT-4o mini")
                .with_description("Small, fast general model")
                .with_tag("fast"),
            Self::new("gpt-4o", "GPT-4o")
                .with_description("Flagship multimodal model")
                .with_tag("quality"),
            Self::new("gpt-4.1-mini", "GPT-4.1 mini")
                .with_description("Small model with long context")
                .with_tag("fast"),
        ]
    }

    pub fn to_model_info(&self) -> ModelInfo {
        ModelInfo::new(&self.id, &self.name)
    }
}

/// Built-in models overlaid with `overrides`.
///
/// An override with a known id replaces the built-in entry in place; new ids
/// are appended in the order given.
pub fn merge_profiles(overrides: &[ModelProfile]) -> Vec<ModelProfile> {
    let mut profiles = ModelProfile::builtin();
    for profile in overrides {
        match profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile.clone(),
            None => profiles.push(profile.clone()),
        }
    }
    profiles
}

/// Registry of [`merge_profiles`]
pub fn merged_registry(overrides: &[ModelProfile]) -> ModelRegistry {
    ModelRegistry::new(
        merge_profiles(overrides)
            .iter()
            .map(ModelProfile::to_model_info)
            .collect(),
    )
}

/// Scheduling and scoring preset applied over the app config
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Heuristic scoring instead of the LLM judge
    pub fast_mode: bool,
    pub concurrency: usize,
    pub batch_delay_ms: u64,
    pub item_timeout_ms: u64,
}

impl RunProfile {
    /// Fast heuristic scoring with the default rate limits
    pub fn quick() -> Self {
        Self {
            name: "quick".to_string(),
            description: "Fast heuristic scoring, default rate limits".to_string(),
            fast_mode: true,
            concurrency: 2,
            batch_delay_ms: 1000,
            item_timeout_ms: 30_000,
        }
    }

    /// LLM-judged scoring with longer deadlines and gentler pacing
    pub fn thorough() -> Self {
        Self {
            name: "thorough".to_string(),
            description: "LLM critique scoring, slower pacing".to_string(),
            fast_mode: false,
            concurrency: 2,
            batch_delay_ms: 1500,
            item_timeout_ms: 60_000,
        }
    }

    /// Wider batches for providers with generous rate limits
    pub fn burst() -> Self {
        Self {
            name: "burst".to_string(),
            description: "Wide batches for generous rate limits".to_string(),
            fast_mode: true,
            concurrency: 4,
            batch_delay_ms: 250,
            item_timeout_ms: 30_000,
        }
    }

    pub fn predefined() -> Vec<RunProfile> {
        vec![Self::quick(), Self::thorough(), Self::burst()]
    }

    pub fn find(name: &str) -> Option<RunProfile> {
        Self::predefined().into_iter().find(|p| p.name == name)
    }

    /// Overwrite the scheduling and scoring fields of `config`
    pub fn apply(&self, config: &mut AppConfig) {
        config.fast_mode = self.fast_mode;
        config.concurrency = self.concurrency;
        config.batch_delay_ms = self.batch_delay_ms;
        config.item_timeout_ms = self.item_timeout_ms;
    }
}

/// Lookup of run profiles by name, predefined ones first
pub struct ProfileManager {
    run_profiles: BTreeMap<String, RunProfile>,
}

impl ProfileManager {
    pub fn new() -> Self {
        let run_profiles = RunProfile::predefined()
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        Self { run_profiles }
    }

    /// Add or replace a profile
    pub fn add_run_profile(&mut self, profile: RunProfile) {
        self.run_profiles.insert(profile.name.clone(), profile);
    }

    pub fn run_profile(&self, name: &str) -> Option<&RunProfile> {
        self.run_profiles.get(name)
    }

    pub fn list_run_profiles(&self) -> Vec<&RunProfile> {
        self.run_profiles.values().collect()
    }
}

impl Default for ProfileManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_models() {
        let models = ModelProfile::builtin();
        assert_eq!(models[0].id, "gpt-4o-mini");
        assert!(models.iter().all(|m| !m.name.is_empty()));
    }

    #[test]
    fn test_merged_registry_overrides_in_place() {
        let registry = merged_registry(&[
            ModelProfile::new("gpt-4o", "Renamed"),
            ModelProfile::new("local-llama", "Local Llama"),
        ]);

        let ids: Vec<&str> = registry.models().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["gpt-4o-mini", "gpt-4o", "gpt-4.1-mini", "local-llama"]);
        assert_eq!(registry.display_name("gpt-4o"), "Renamed");
    }

    #[test]
    fn test_run_profiles() {
        let thorough = RunProfile::find("thorough").unwrap();
        assert!(!thorough.fast_mode);
        assert_eq!(thorough.item_timeout_ms, 60_000);
        assert_eq!(RunProfile::find("burst").unwrap().concurrency, 4);
        assert!(RunProfile::find("missing").is_none());
    }

    #[test]
    fn test_apply_profile() {
        let mut config = AppConfig::default();
        RunProfile::burst().apply(&mut config);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.batch_delay_ms, 250);
        assert!(config.fast_mode);
    }

    #[test]
    fn test_profile_manager_override() {
        let mut manager = ProfileManager::new();
        let mut custom = RunProfile::quick();
        custom.concurrency = 8;
        manager.add_run_profile(custom);

        assert_eq!(manager.run_profile("quick").unwrap().concurrency, 8);
        assert_eq!(manager.list_run_profiles().len(), 3);
    }
}
