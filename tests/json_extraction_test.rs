#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use studyplan_lib::pipelines::json_extract::{extract_json_object, is_truncated};
    use studyplan_lib::ErrorCode;

    #[test]
    fn test_fenced_prose_with_trailing_comma_matches_clean_parse() {
        let clean = r#"{"schedule": [{"day": "Monday", "studyBlocks": [{"subject": "DSA", "topic": "Arrays", "duration": 60}]}]}"#;
        let messy = r#"Sure! Here is your plan:
```json
{"schedule": [{"day": "Monday", "studyBlocks": [{"subject": "DSA", "topic": "Arrays", "duration": 60},]},]}
```
Let me know if you want changes."#;

        let expected: Value = serde_json::from_str(clean).unwrap();
        let extracted = extract_json_object(messy).unwrap();
        assert_eq!(Value::Object(extracted), expected);
    }

    #[test]
    fn test_plain_object() {
        let obj = extract_json_object(r#"{"questions": []}"#).unwrap();
        assert_eq!(obj.get("questions"), Some(&json!([])));
    }

    #[test]
    fn test_object_inside_prose() {
        let obj = extract_json_object(r#"Output: {"key": "value"} (end)"#).unwrap();
        assert_eq!(obj.get("key"), Some(&json!("value")));
    }

    #[test]
    fn test_unfenced_generic_block() {
        let text = "```\n{\"a\": 1}\n```";
        let obj = extract_json_object(text).unwrap();
        assert_eq!(obj.get("a"), Some(&json!(1)));
    }

    #[test]
    fn test_truncated_output_is_a_parse_error() {
        let text = r#"```json
{"schedule": [{"day": "Monday", "studyBlocks": [{"subject": "DSA""#;
        assert!(is_truncated(text));
        let err = extract_json_object(text).unwrap_err();
        assert_eq!(err.code(), ErrorCode::GeminiParseError);
    }

    #[test]
    fn test_bare_array_is_rejected() {
        assert!(extract_json_object("[1, 2, 3]").is_err());
        assert!(extract_json_object("").is_err());
    }
}
