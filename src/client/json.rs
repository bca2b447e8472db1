//! Lenient extraction of JSON objects from model output.
//!
//! Models wrap JSON in code fences or prose; these helpers never fail loudly.

use serde_json::Value;

/// Best-effort parse of the first JSON object in `response`
pub fn extract_object(response: &str) -> Option<Value> {
    let trimmed = response.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() {
            return Some(value);
        }
    }

    let without_fences = trimmed
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n");
    if let Ok(value) = serde_json::from_str::<Value>(without_fences.trim()) {
        if value.is_object() {
            return Some(value);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end])
        .ok()
        .filter(Value::is_object)
}

/// Render a JSON scalar as plain text
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Read an integer score in 0..=100 from a number or numeric string
pub fn score_field(object: &Value, key: &str) -> Option<u8> {
    let raw = object.get(key)?;
    let number = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    Some(number.round().clamp(0.0, 100.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_plain_object() {
        let value = extract_object(r#"{"a": 1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_extract_fenced_object() {
        let response = "```json\n{\"testCases\": []}\n```";
        let value = extract_object(response).unwrap();
        assert!(value["testCases"].is_array());
    }

    #[test]
    fn test_extract_object_in_prose() {
        let response = "Sure! Here you go: {\"score\": 80} Hope that helps.";
        let value = extract_object(response).unwrap();
        assert_eq!(value["score"], 80);
    }

    #[test]
    fn test_extract_rejects_garbage() {
        assert!(extract_object("no json here").is_none());
        assert!(extract_object("} backwards {").is_none());
        assert!(extract_object("[1, 2, 3]").is_none());
    }

    #[test]
    fn test_score_field_variants() {
        let object = json!({"a": 81.6, "b": "42", "c": 150, "d": -3, "e": "n/a"});
        assert_eq!(score_field(&object, "a"), Some(82));
        assert_eq!(score_field(&object, "b"), Some(42));
        assert_eq!(score_field(&object, "c"), Some(100));
        assert_eq!(score_field(&object, "d"), Some(0));
        assert_eq!(score_field(&object, "e"), None);
        assert_eq!(score_field(&object, "missing"), None);
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!("text")), "text");
        assert_eq!(value_to_string(&json!(5)), "5");
        assert_eq!(value_to_string(&json!(null)), "");
    }
}
