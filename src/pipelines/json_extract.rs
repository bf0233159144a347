//! Recovery of a JSON object from free-form generative output.
//!
//! Strategies run cheapest first and the first one that yields an object wins:
//! direct parse, fence/prose trimming, a greedy `{...}` scan, and finally a
//! cleanup pass (trailing commas, newlines) followed by another scan.
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::EngineError;
use crate::logging::preview;

lazy_static! {
    static ref JSON_FENCE: Regex = Regex::new(r"```json\n?").unwrap();
    static ref ANY_FENCE: Regex = Regex::new(r"```\n?").unwrap();
    static ref OBJECT_SPAN: Regex = Regex::new(r"(?s)\{.*\}").unwrap();
    static ref TRAILING_COMMA: Regex = Regex::new(r",(\s*[}\]])").unwrap();
}

/// Remove markdown code-fence markers
pub fn strip_code_fences(text: &str) -> String {
    let without_json = JSON_FENCE.replace_all(text, "");
    ANY_FENCE.replace_all(&without_json, "").into_owned()
}

/// Remove trailing commas before `}` or `]` (invalid but common in model output)
pub fn remove_trailing_commas(json: &str) -> String {
    TRAILING_COMMA.replace_all(json, "$1").into_owned()
}

/// Slice from the first `{` to the last `}`, if both exist in that order
fn trim_to_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

/// Check if raw output appears to be truncated
pub fn is_truncated(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }

    if let Some(last_char) = trimmed.chars().last() {
        if matches!(last_char, '{' | '[' | ':' | '"' | ',') {
            return true;
        }
    }

    let mut brace_count = 0i32;
    let mut bracket_count = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for ch in trimmed.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => brace_count += 1,
            '}' if !in_string => brace_count -= 1,
            '[' if !in_string => bracket_count += 1,
            ']' if !in_string => bracket_count -= 1,
            _ => {}
        }
    }

    brace_count > 0 || bracket_count > 0 || in_string
}

/// Extract a JSON object from generative output.
/// Fails with [`EngineError::Parse`] only after every strategy is exhausted.
pub fn extract_json_object(text: &str) -> Result<Map<String, Value>, EngineError> {
    // Strategy 1: the text is already clean JSON
    if let Some(obj) = parse_object(text) {
        return Ok(obj);
    }

    // Strategy 2: drop fences and any prose around the outermost braces
    let unfenced = strip_code_fences(text);
    if let Some(obj) = trim_to_braces(&unfenced).and_then(parse_object) {
        tracing::debug!("Extracted JSON after stripping fences and prose");
        return Ok(obj);
    }

    // Strategy 3: greedy object scan over the raw text
    if let Some(obj) = OBJECT_SPAN
        .find(text)
        .and_then(|m| parse_object(m.as_str()))
    {
        tracing::debug!("Extracted JSON from raw object span");
        return Ok(obj);
    }

    // Strategy 4: repair common defects, then scan again
    let repaired = remove_trailing_commas(&unfenced)
        .replace("\\n", " ")
        .replace('\n', " ");
    if let Some(obj) = OBJECT_SPAN
        .find(repaired.trim())
        .and_then(|m| parse_object(m.as_str()))
    {
        tracing::debug!("Extracted JSON after repairing trailing commas and newlines");
        return Ok(obj);
    }

    Err(EngineError::Parse(format!(
        "Could not extract a JSON object from response. Text length: {}, truncated: {}, preview: {}",
        text.len(),
        is_truncated(text),
        preview(text, 200)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_plain() {
        let obj = extract_json_object(r#"{"key": "value"}"#).unwrap();
        assert_eq!(obj["key"], json!("value"));
    }

    #[test]
    fn test_extract_from_code_block() {
        let text = "Here's some text.\n```json\n{\"key\": \"value\"}\n```\nMore text.";
        let obj = extract_json_object(text).unwrap();
        assert_eq!(Value::Object(obj), json!({"key": "value"}));
    }

    #[test]
    fn test_extract_with_extra_text() {
        let obj = extract_json_object(r#"Some text before {"key": "value"} some text after"#).unwrap();
        assert_eq!(obj["key"], json!("value"));
    }

    #[test]
    fn test_extract_with_trailing_comma() {
        let obj = extract_json_object(r#"{"key": "value", "list": [1, 2,],}"#).unwrap();
        assert_eq!(Value::Object(obj), json!({"key": "value", "list": [1, 2]}));
    }

    #[test]
    fn test_literal_newline_inside_string() {
        let text = "{\"topic\": \"Graphs\nand trees\"}";
        let obj = extract_json_object(text).unwrap();
        assert_eq!(obj["topic"], json!("Graphs and trees"));
    }

    #[test]
    fn test_non_object_json_is_rejected() {
        assert!(extract_json_object("[1, 2, 3]").is_err());
        assert!(extract_json_object("\"just a string\"").is_err());
    }

    #[test]
    fn test_failure_is_parse_error() {
        let err = extract_json_object("I'm sorry, I can't help with that.").unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
        assert!(err.to_string().contains("Could not extract"));
    }

    #[test]
    fn test_is_truncated() {
        assert!(is_truncated(r#"{"schedule": [{"day": "Monday","#));
        assert!(is_truncated(r#"{"topic": "Graphs"#));
        assert!(!is_truncated(r#"{"key": "value"}"#));
        assert!(!is_truncated(""));
    }

    #[test]
    fn test_remove_trailing_commas() {
        assert_eq!(remove_trailing_commas("[1, 2 ,\n]"), "[1, 2 \n]");
        assert_eq!(remove_trailing_commas(r#"{"a": 1,}"#), r#"{"a": 1}"#);
    }
}
