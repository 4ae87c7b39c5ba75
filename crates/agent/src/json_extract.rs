//! Tolerant JSON extraction from model output.
//!
//! Models wrap JSON in prose, code fences or both. Extraction runs three
//! stages in order and stops at the first that applies:
//!
//! 1. the whole text parses as JSON;
//! 2. a ```` ```json ```` fenced block is present (its body must parse);
//! 3. the first balanced `{…}` or `[…]` span is present (it must parse).
//!
//! Stages 2 and 3 are decisive: once a candidate is found, a parse failure is
//! reported instead of falling through to the next stage.

use regex_lite::Regex;
use std::sync::LazyLock;

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json(.*?)```").expect("valid fence pattern"));

/// Which stage produced the JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonStage {
    Raw,
    Fenced,
    Embedded,
}

#[derive(Debug, thiserror::Error)]
pub enum JsonExtractError {
    #[error("{0}")]
    Malformed(#[from] serde_json::Error),

    #[error("No JSON found")]
    NotFound,
}

/// Extract a JSON value from `text`, reporting which stage found it.
pub fn extract_json(text: &str) -> Result<(serde_json::Value, JsonStage), JsonExtractError> {
    if text.trim().is_empty() {
        return Err(JsonExtractError::NotFound);
    }

    if let Ok(value) = serde_json::from_str(text) {
        return Ok((value, JsonStage::Raw));
    }

    if let Some(caps) = FENCED_JSON.captures(text) {
        let body = caps.get(1).map_or("", |m| m.as_str());
        let value = serde_json::from_str(body.trim())?;
        return Ok((value, JsonStage::Fenced));
    }

    if let Some(span) = first_balanced_span(text) {
        let value = serde_json::from_str(span)?;
        return Ok((value, JsonStage::Embedded));
    }

    Err(JsonExtractError::NotFound)
}

/// The first `{…}` / `[…]` span whose brackets balance, ignoring brackets
/// inside JSON string literals.
fn first_balanced_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_stage() {
        let (value, stage) = extract_json(r#" [{"tool": "clock"}] "#).unwrap();
        assert_eq!(stage, JsonStage::Raw);
        assert_eq!(value, json!([{"tool": "clock"}]));
    }

    #[test]
    fn fenced_stage() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nthanks";
        let (value, stage) = extract_json(text).unwrap();
        assert_eq!(stage, JsonStage::Fenced);
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn broken_fence_does_not_fall_through() {
        let text = "```json\n{\"a\": \n```\n{\"b\": 2}";
        assert!(matches!(extract_json(text), Err(JsonExtractError::Malformed(_))));
    }

    #[test]
    fn embedded_stage_handles_nesting_and_strings() {
        let text = r#"Sure! {"tool": "echo", "parameters": {"text": "a } brace"}} and more {"x": 1}"#;
        let (value, stage) = extract_json(text).unwrap();
        assert_eq!(stage, JsonStage::Embedded);
        assert_eq!(value["parameters"]["text"], "a } brace");
    }

    #[test]
    fn embedded_array() {
        let (value, stage) = extract_json(r#"calling [{"tool": "clock"}] now"#).unwrap();
        assert_eq!(stage, JsonStage::Embedded);
        assert!(value.is_array());
    }

    #[test]
    fn unbalanced_span_is_not_found() {
        assert!(matches!(extract_json(r#"oops {"a": 1"#), Err(JsonExtractError::NotFound)));
    }

    #[test]
    fn prose_is_not_found() {
        let err = extract_json("invalid json").unwrap_err();
        assert_eq!(err.to_string(), "No JSON found");
        assert!(matches!(extract_json("   "), Err(JsonExtractError::NotFound)));
    }
}
