//! Test case synthesis
//!
//! Asks a completion model for a small set of diverse test cases for a
//! prompt template. Any failure (transport error, non-JSON reply, missing or
//! empty `testCases` array) falls back to a deterministic local generator, so
//! synthesis itself never fails.

mod samples;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::json::{extract_object, value_to_string};
use crate::client::{CompletionClient, CompletionRequest, ProviderError};
use crate::models::{TestCase, VariableSpec};

pub use samples::SampleTable;

/// Upper bound on test cases kept from a model reply
pub const MAX_TEST_CASES: usize = 5;

/// Test cases requested from the model (and produced by the fallback)
const TARGET_TEST_CASES: usize = 3;

const SYNTHESIS_TEMPERATURE: f32 = 0.7;
const SYNTHESIS_MAX_TOKENS: u32 = 2000;

const SYNTHESIS_SYSTEM: &str = "You are an expert QA engineer who designs test cases for \
LLM prompt templates. You always reply with a single valid JSON object and nothing else.";

#[derive(Debug, Error)]
enum SynthesisError {
    #[error("completion failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("reply was not a JSON object")]
    NotJson,

    #[error("reply contained no test cases")]
    NoTestCases,
}

/// Number of cases to ask for given the declared variable count
pub fn requested_count(variable_count: usize) -> usize {
    TARGET_TEST_CASES.min(variable_count + 1)
}

/// Produces the test cases a run is executed against
pub struct TestCaseSynthesizer {
    client: Arc<dyn CompletionClient>,
    model_id: Option<String>,
    samples: SampleTable,
}

impl TestCaseSynthesizer {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            model_id: None,
            samples: SampleTable::builtin(),
        }
    }

    /// Model used to author test cases; without one only the fallback runs
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_samples(mut self, samples: SampleTable) -> Self {
        self.samples = samples;
        self
    }

    /// Synthesize test cases for `template`. Never fails.
    pub async fn synthesize(&self, template: &str, variables: &[VariableSpec]) -> Vec<TestCase> {
        let Some(model_id) = self.model_id.as_deref() else {
            debug!("No synthesis model configured; using fallback test cases");
            return fallback_test_cases(variables, &self.samples);
        };

        match self.request(model_id, template, variables).await {
            Ok(cases) => {
                info!("Synthesized {} test cases with {}", cases.len(), model_id);
                cases
            }
            Err(e) => {
                warn!("Test case synthesis failed ({e}); using fallback test cases");
                fallback_test_cases(variables, &self.samples)
            }
        }
    }

    async fn request(
        &self,
        model_id: &str,
        template: &str,
        variables: &[VariableSpec],
    ) -> Result<Vec<TestCase>, SynthesisError> {
        let count = requested_count(variables.len());
        let request = CompletionRequest::new(model_id, synthesis_prompt(template, variables, count))
            .system(SYNTHESIS_SYSTEM)
            .temperature(SYNTHESIS_TEMPERATURE)
            .max_tokens(SYNTHESIS_MAX_TOKENS);

        let completion = self.client.generate(&request).await?;
        parse_test_cases(&completion.content)
    }
}

fn synthesis_prompt(template: &str, variables: &[VariableSpec], count: usize) -> String {
    let variable_list = if variables.is_empty() {
        "(none)".to_string()
    } else {
        variables
            .iter()
            .map(|v| format!("- {v}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Create {count} diverse test cases for the prompt template below. Each test case \
supplies a value for every variable, describes what a good response must contain, and \
covers a different scenario (typical input, edge case, unusual input).\n\n\
PROMPT TEMPLATE:\n{template}\n\n\
VARIABLES:\n{variable_list}\n\n\
Reply with JSON of exactly this shape:\n\
{{\"testCases\": [{{\"id\": \"tc_1\", \"input\": {{\"<variable>\": \"<value>\"}}, \
\"expectedOutput\": \"<what a good response contains>\", \"description\": \"<scenario>\"}}]}}"
    )
}

fn parse_test_cases(response: &str) -> Result<Vec<TestCase>, SynthesisError> {
    let object = extract_object(response).ok_or(SynthesisError::NotJson)?;
    let entries = object
        .get("testCases")
        .or_else(|| object.get("test_cases"))
        .and_then(Value::as_array)
        .ok_or(SynthesisError::NoTestCases)?;

    let mut seen = HashSet::new();
    let cases: Vec<TestCase> = entries
        .iter()
        .filter(|entry| entry.is_object())
        .take(MAX_TEST_CASES)
        .enumerate()
        .map(|(index, entry)| {
            let mut case = parse_entry(entry, index);
            if !seen.insert(case.id.clone()) {
                case.id = format!("{}_{}", case.id, index + 1);
                seen.insert(case.id.clone());
            }
            case
        })
        .collect();

    if cases.is_empty() {
        return Err(SynthesisError::NoTestCases);
    }
    Ok(cases)
}

fn parse_entry(entry: &Value, index: usize) -> TestCase {
    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| entry.get(*k))
            .map(value_to_string)
            .unwrap_or_default()
    };

    let id = Some(text(&["id"]))
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| format!("tc_{}", index + 1));

    let input: BTreeMap<String, String> = entry
        .get("input")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_string(v)))
                .collect()
        })
        .unwrap_or_default();

    TestCase {
        id,
        input,
        expected_output: text(&["expectedOutput", "expected_output"]),
        description: text(&["description"]),
    }
}

/// Deterministic test cases built from the sample table.
///
/// Always returns at least one case; with no variables that case has an
/// empty input.
pub fn fallback_test_cases(variables: &[VariableSpec], samples: &SampleTable) -> Vec<TestCase> {
    (0..requested_count(variables.len()))
        .map(|iteration| {
            let input = variables
                .iter()
                .map(|v| {
                    let value = samples
                        .value(&v.name, iteration)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("test_value_{}", iteration + 1));
                    (v.name.clone(), value)
                })
                .collect();

            TestCase {
                id: format!("fallback_{}", iteration + 1),
                input,
                expected_output: "A relevant, well-structured response that uses the provided inputs"
                    .to_string(),
                description: format!("Generated sample case {}", iteration + 1),
            }
        })
        .collect()
}
