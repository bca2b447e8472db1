//! Sample values for fallback test cases

use std::collections::BTreeMap;

const BUILTIN_SAMPLES: &[(&str, &[&str])] = &[
    ("name", &["Alice Johnson", "Bob Smith", "Carol Davis"]),
    (
        "topic",
        &["artificial intelligence", "climate change", "remote work"],
    ),
    (
        "context",
        &[
            "a customer support conversation",
            "a technical blog post",
            "an internal team meeting",
        ],
    ),
    ("style", &["formal", "casual", "persuasive"]),
];

/// Immutable lookup of sample values keyed by lowercase variable name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl SampleTable {
    pub fn builtin() -> Self {
        let entries = BUILTIN_SAMPLES
            .iter()
            .map(|(name, values)| {
                (
                    name.to_string(),
                    values.iter().map(|v| v.to_string()).collect(),
                )
            })
            .collect();
        Self { entries }
    }

    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add or replace the values for a variable name
    pub fn with_values(mut self, name: &str, values: Vec<String>) -> Self {
        if values.is_empty() {
            self.entries.remove(&name.to_lowercase());
        } else {
            self.entries.insert(name.to_lowercase(), values);
        }
        self
    }

    /// Value for `name` at `iteration`, cycling through the table
    pub fn value(&self, name: &str, iteration: usize) -> Option<&str> {
        let values = self.entries.get(&name.to_lowercase())?;
        values.get(iteration % values.len()).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Default for SampleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup_cycles() {
        let table = SampleTable::builtin();
        assert_eq!(table.value("style", 0), Some("formal"));
        assert_eq!(table.value("style", 3), Some("formal"));
        assert_eq!(table.value("STYLE", 1), Some("casual"));
        assert_eq!(table.value("unknown", 0), None);
    }

    #[test]
    fn test_with_values_overrides() {
        let table = SampleTable::builtin()
            .with_values("Tone", vec!["warm".into()])
            .with_values("name", Vec::new());

        assert_eq!(table.value("tone", 4), Some("warm"));
        assert_eq!(table.value("name", 0), None);
        assert!(table.names().any(|n| n == "tone"));
    }
}
