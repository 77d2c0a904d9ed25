//! Lenient extraction of structured output from model replies.
//!
//! Models wrap JSON in prose or code fences often enough that a strict parse
//! would fail needlessly. [`parse_reply`] takes the first balanced JSON
//! object in the text. When nothing usable is found it returns the task's
//! default output with [`FALLBACK_CONFIDENCE`] instead of an error.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::types::{ProviderKind, TaskType};

/// Confidence reported for output that could not be parsed.
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Parsed output plus the confidence to report for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply<T> {
    pub data: T,
    /// Model-reported confidence, or [`FALLBACK_CONFIDENCE`] after a failed
    /// parse. `None` when the model reported nothing.
    pub confidence: Option<f64>,
    /// Whether the reply parsed cleanly.
    pub parsed: bool,
}

/// Return the first balanced `{...}` block in `text`, honouring string
/// literals and escapes.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a model reply into `T`, degrading to `T::default()` on failure.
pub fn parse_reply<T>(text: &str, provider: ProviderKind, task: TaskType) -> ParsedReply<T>
where
    T: DeserializeOwned + Default,
{
    let value = match extract_json_object(text).map(serde_json::from_str::<Value>) {
        Some(Ok(value)) => value,
        Some(Err(e)) => return fallback(provider, task, &e.to_string()),
        None => return fallback(provider, task, "no JSON object in reply"),
    };

    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| (0.0..=1.0).contains(c));

    match serde_json::from_value::<T>(value) {
        Ok(data) => ParsedReply {
            data,
            confidence,
            parsed: true,
        },
        Err(e) => fallback(provider, task, &e.to_string()),
    }
}

fn fallback<T: Default>(provider: ProviderKind, task: TaskType, reason: &str) -> ParsedReply<T> {
    warn!(
        provider = provider.as_str(),
        task_type = task.as_str(),
        reason,
        "unparseable provider reply, returning low-confidence default"
    );
    ParsedReply {
        data: T::default(),
        confidence: Some(FALLBACK_CONFIDENCE),
        parsed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiiScore, FoodAnalysis};

    #[test]
    fn extracts_object_from_fenced_prose() {
        let text = "Sure!\n```json\n{\"items\": [{\"name\": \"miso {soup}\"}]}\n```\nDone.";
        assert_eq!(
            extract_json_object(text),
            Some("{\"items\": [{\"name\": \"miso {soup}\"}]}")
        );
    }

    #[test]
    fn unbalanced_object_is_not_extracted() {
        assert_eq!(extract_json_object("{\"a\": {\"b\": 1}"), None);
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn parses_confidence_field() {
        let reply: ParsedReply<DiiScore> = parse_reply(
            r#"{"score": 2.1, "confidence": 0.92}"#,
            ProviderKind::Anthropic,
            TaskType::DiiCalculation,
        );
        assert!(reply.parsed);
        assert_eq!(reply.data.score, 2.1);
        assert_eq!(reply.confidence, Some(0.92));
    }

    #[test]
    fn malformed_reply_degrades_to_default() {
        let reply: ParsedReply<FoodAnalysis> = parse_reply(
            "I could not identify any food.",
            ProviderKind::Gemini,
            TaskType::FoodRecognition,
        );
        assert!(!reply.parsed);
        assert_eq!(reply.data, FoodAnalysis::default());
        assert_eq!(reply.confidence, Some(FALLBACK_CONFIDENCE));
    }

    #[test]
    fn wrong_shape_degrades_to_default() {
        let reply: ParsedReply<FoodAnalysis> = parse_reply(
            r#"{"items": "rice"}"#,
            ProviderKind::OpenAi,
            TaskType::FoodRecognition,
        );
        assert!(!reply.parsed);
        assert_eq!(reply.confidence, Some(FALLBACK_CONFIDENCE));
    }
}
