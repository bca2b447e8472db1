//! Prompt template substitution
//!
//! Placeholders have the form `{{name}}`. Substitution is literal and
//! case-sensitive; placeholders without a value are left untouched.

use std::collections::BTreeMap;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Replace every `{{key}}` occurrence with its value from `input`.
///
/// One left-to-right pass: inserted values are never rescanned, so a value
/// containing `{{other}}` is kept as written.
pub fn render(template: &str, input: &BTreeMap<String, String>) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        rendered.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];

        let value = after_open
            .find(CLOSE)
            .and_then(|end| input.get(&after_open[..end]).map(|v| (end, v)));
        match value {
            Some((end, value)) => {
                rendered.push_str(value);
                rest = &after_open[end + CLOSE.len()..];
            }
            None => {
                // step past one brace so `{{{name}}` still matches
                rendered.push('{');
                rest = &rest[start + 1..];
            }
        }
    }

    rendered.push_str(rest);
    rendered
}

/// Distinct placeholder names in order of first appearance
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };

        let name = &after_open[..end];
        if is_identifier(name) && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }

        rest = &after_open[end + CLOSE.len()..];
    }

    names
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
}
