//! Test case and work item models
//!
//! Defines the inputs of a run: declared variables, synthesized test cases,
//! the model registry and the (test case, model) work items.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::template;

/// A `{{name}}` substitution point declared for a prompt template
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl VariableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parse `name` or `name:description`
    pub fn parse(s: &str) -> Option<Self> {
        let (name, description) = match s.split_once(':') {
            Some((name, desc)) => (name.trim(), Some(desc.trim())),
            None => (s.trim(), None),
        };

        if name.is_empty() {
            return None;
        }

        let spec = Self::new(name);
        Some(match description {
            Some(desc) if !desc.is_empty() => spec.with_description(desc),
            _ => spec,
        })
    }
}

impl fmt::Display for VariableSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(desc) => write!(f, "{} ({})", self.name, desc),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A concrete set of variable values plus the behaviour expected from the model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub input: BTreeMap<String, String>,
    pub expected_output: String,
    pub description: String,
}

impl TestCase {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            input: BTreeMap::new(),
            expected_output: String::new(),
            description: String::new(),
        }
    }

    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.input.insert(key.into(), value.into());
        self
    }

    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = expected.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Substitute this case's input into a prompt template
    pub fn render(&self, template: &str) -> String {
        template::render(template, &self.input)
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{}: {}", self.id, self.description)
        }
    }
}

/// A model that can be selected for a run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Caller-supplied model registry used for display-name resolution
#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    models: Vec<ModelInfo>,
}

impl ModelRegistry {
    pub fn new(models: Vec<ModelInfo>) -> Self {
        Self { models }
    }

    pub fn get(&self, id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Display name for a model id, falling back to the raw id
    pub fn display_name(&self, id: &str) -> String {
        self.get(id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn first(&self) -> Option<&ModelInfo> {
        self.models.first()
    }

    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// One scheduled (test case, model) execution unit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkItem {
    pub test_case: TestCase,
    pub model_id: String,
}

impl WorkItem {
    pub fn new(test_case: TestCase, model_id: impl Into<String>) -> Self {
        Self {
            test_case,
            model_id: model_id.into(),
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {}", self.test_case.id, self.model_id)
    }
}
