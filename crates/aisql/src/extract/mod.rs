//! Structured output recovery
//!
//! Models asked for a JSON object often wrap it in explanatory prose or a
//! markdown fence, or answer with no JSON at all. [`extract`] recovers the
//! value through an ordered fallback chain and never fails: input it cannot
//! parse comes back as [`ExtractionResult::Fallback`] carrying the raw text.

use std::fmt;

use serde_json::{Map, Value};
use tracing::debug;

const FENCE: &str = "```";

/// Why structured recovery gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Neither the text nor its first brace-delimited span parsed as JSON
    Unparseable,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::Unparseable => "unparseable",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of structured recovery
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    /// A JSON value of any shape; validating the shape is the caller's job
    Structured(Value),
    /// Recovery failed; the original text is carried forward untouched
    Fallback {
        raw_text: String,
        reason: FallbackReason,
    },
}

impl ExtractionResult {
    pub fn is_structured(&self) -> bool {
        matches!(self, ExtractionResult::Structured(_))
    }

    /// The recovered value, if any
    pub fn structured(&self) -> Option<&Value> {
        match self {
            ExtractionResult::Structured(value) => Some(value),
            ExtractionResult::Fallback { .. } => None,
        }
    }

    /// Turn the outcome into a JSON object.
    ///
    /// A structured object is returned as-is. Any other structured value, or
    /// the raw text of a fallback, is placed under `field`.
    pub fn into_object_or(self, field: &str) -> Map<String, Value> {
        let value = match self {
            ExtractionResult::Structured(Value::Object(map)) => return map,
            ExtractionResult::Structured(other) => other,
            ExtractionResult::Fallback { raw_text, .. } => Value::String(raw_text),
        };

        let mut map = Map::new();
        map.insert(field.to_string(), value);
        map
    }
}

/// Recover a JSON value from free-form model output.
///
/// 1. Strip one matched pair of markdown code fences and trim.
/// 2. Parse the cleaned text directly.
/// 3. Otherwise parse the first balanced `{...}` span.
/// 4. Otherwise return [`ExtractionResult::Fallback`].
pub fn extract(text: &str) -> ExtractionResult {
    let cleaned = strip_code_fence(text);

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        return ExtractionResult::Structured(value);
    }

    if let Some(candidate) = find_balanced_object(cleaned) {
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => {
                debug!(
                    candidate_len = candidate.len(),
                    text_len = text.len(),
                    "recovered JSON object embedded in prose"
                );
                return ExtractionResult::Structured(value);
            }
            Err(e) => debug!("embedded object candidate did not parse: {}", e),
        }
    }

    debug!(text_len = text.len(), "no JSON recovered from model output");
    ExtractionResult::Fallback {
        raw_text: text.to_string(),
        reason: FallbackReason::Unparseable,
    }
}

/// Remove one matched pair of markdown code fences.
///
/// The opening fence may carry a language tag (```` ```json ````). Text that
/// does not both start and end with a fence is only trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();

    let Some(inner) = trimmed
        .strip_prefix(FENCE)
        .and_then(|rest| rest.strip_suffix(FENCE))
    else {
        return trimmed;
    };

    let body = match inner.split_once('\n') {
        Some((tag, body)) if is_language_tag(tag.trim()) => body,
        _ => inner,
    };

    body.trim()
}

fn is_language_tag(tag: &str) -> bool {
    tag.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
}

/// The first balanced `{...}` span of `text`.
///
/// Depth counting starts at the first `{`. Braces inside JSON string literals
/// are not counted. Returns `None` when the first object never closes.
pub fn find_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
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
    fn test_direct_object() {
        let result = extract(r#"{"sentiment": "positive", "confidence": 0.9}"#);
        assert_eq!(
            result,
            ExtractionResult::Structured(json!({"sentiment": "positive", "confidence": 0.9}))
        );
    }

    #[test]
    fn test_object_wrapped_in_prose() {
        let result = extract("以下是分析结果：\n{\"sentiment\": \"positive\"}\n希望有帮助");
        assert_eq!(
            result,
            ExtractionResult::Structured(json!({"sentiment": "positive"}))
        );
    }

    #[test]
    fn test_refusal_falls_back() {
        let result = extract("抱歉，我无法完成此任务");
        assert_eq!(
            result,
            ExtractionResult::Fallback {
                raw_text: "抱歉，我无法完成此任务".to_string(),
                reason: FallbackReason::Unparseable,
            }
        );
    }

    #[test]
    fn test_fenced_json_with_language_tag() {
        let result = extract("```json\n{\"entities\": [{\"text\": \"阿里巴巴\", \"type\": \"ORG\"}]}\n```");
        assert_eq!(
            result.structured(),
            Some(&json!({"entities": [{"text": "阿里巴巴", "type": "ORG"}]}))
        );
    }

    #[test]
    fn test_fenced_json_without_tag() {
        let result = extract("  ```\n[1, 2, 3]\n```  ");
        assert_eq!(result, ExtractionResult::Structured(json!([1, 2, 3])));
    }

    #[test]
    fn test_nested_object_in_prose() {
        let text = r#"Result: {"segment": "高价值客户", "scores": {"R": 5, "F": {"raw": 4}}} done"#;
        assert_eq!(
            extract(text).structured(),
            Some(&json!({"segment": "高价值客户", "scores": {"R": 5, "F": {"raw": 4}}}))
        );
    }

    #[test]
    fn test_braces_inside_strings_do_not_count() {
        let text = r#"note {"pattern": "a}b{c", "quote": "say \"}\""} trailing"#;
        assert_eq!(
            extract(text).structured(),
            Some(&json!({"pattern": "a}b{c", "quote": "say \"}\""}))
        );
    }

    #[test]
    fn test_scalar_values_are_structured() {
        assert_eq!(extract("42"), ExtractionResult::Structured(json!(42)));
        assert_eq!(extract("null"), ExtractionResult::Structured(Value::Null));
        assert_eq!(
            extract(r#""plain string""#),
            ExtractionResult::Structured(json!("plain string"))
        );
    }

    #[test]
    fn test_unbalanced_object_falls_back() {
        let result = extract(r#"here: {"a": {"b": 1}"#);
        assert!(!result.is_structured());
    }

    #[test]
    fn test_malformed_candidate_falls_back_with_original_text() {
        let text = "  {sentiment: positive}  ";
        match extract(text) {
            ExtractionResult::Fallback { raw_text, reason } => {
                assert_eq!(raw_text, text);
                assert_eq!(reason.to_string(), "unparseable");
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_text_falls_back() {
        assert!(!extract("").is_structured());
        assert!(!extract("   ").is_structured());
    }

    #[test]
    fn test_strip_code_fence_leaves_unmatched_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}"), "```json\n{\"a\":1}");
        assert_eq!(strip_code_fence("```"), "```");
        // opening line is content, not a tag
        assert_eq!(strip_code_fence("```{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn test_find_balanced_object() {
        assert_eq!(find_balanced_object("x {a} {b}"), Some("{a}"));
        assert_eq!(find_balanced_object("no braces"), None);
        assert_eq!(find_balanced_object("{{}"), None);
    }

    #[test]
    fn test_into_object_or() {
        let object = extract(r#"{"sentiment": "neutral"}"#).into_object_or("sentiment_analysis");
        assert_eq!(Value::Object(object), json!({"sentiment": "neutral"}));

        let wrapped = extract("[1, 2]").into_object_or("keywords");
        assert_eq!(Value::Object(wrapped), json!({"keywords": [1, 2]}));

        let fallback = extract("无法分析").into_object_or("sentiment_analysis");
        assert_eq!(Value::Object(fallback), json!({"sentiment_analysis": "无法分析"}));
    }
}
