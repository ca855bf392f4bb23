//! Turns whatever the completion API sent back into one display-ready answer.
//!
//! Replies arrive as plain text, as JSON with an `answer` key, as that JSON
//! wrapped in a fenced code block, or nested several times over. Each pass of
//! the unwrap loop decodes one layer; the loop is bounded so a reply that keeps
//! nesting cannot hold the request.

use serde_json::{Map, Value};
use tracing::debug;

pub const FALLBACK_ANSWER: &str =
    "I apologize, but I couldn't generate a proper response. Can you send that message again?";

/// Upper bound on `answer` unwrap passes.
pub const MAX_UNWRAP_DEPTH: usize = 3;

const PLACEHOLDERS: [&str; 4] = ["\"\"", "''", "{}", "[]"];
const FENCE: &str = "```";

/// Reply as received from the completion API, before any interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawReply {
    Absent,
    Text(String),
    Object(Map<String, Value>),
}

impl From<Option<String>> for RawReply {
    fn from(value: Option<String>) -> Self {
        value.map(RawReply::Text).unwrap_or(RawReply::Absent)
    }
}

impl From<String> for RawReply {
    fn from(value: String) -> Self {
        RawReply::Text(value)
    }
}

impl From<&str> for RawReply {
    fn from(value: &str) -> Self {
        RawReply::Text(value.to_string())
    }
}

impl From<Value> for RawReply {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawReply::Absent,
            Value::String(s) => RawReply::Text(s),
            Value::Object(map) => RawReply::Object(map),
            other => RawReply::Text(other.to_string()),
        }
    }
}

/// Outcome of one decode pass over the current string.
enum Decoded {
    /// A JSON object carrying an `answer` field, already rendered as text.
    Answer(String),
    /// Anything else; unwrapping stops here.
    Plain,
}

pub fn normalize(raw: &RawReply) -> String {
    let initial = match raw {
        RawReply::Absent => return FALLBACK_ANSWER.to_string(),
        RawReply::Text(text) if text.trim().is_empty() => return FALLBACK_ANSWER.to_string(),
        RawReply::Text(text) => text.clone(),
        RawReply::Object(map) => match serde_json::to_string(map) {
            Ok(json) => json,
            Err(e) => {
                debug!(error = %e, "Failed to serialize reply object");
                return FALLBACK_ANSWER.to_string();
            }
        },
    };

    let mut current = strip_code_fence(&initial).to_string();
    let mut depth = 0;
    while depth < MAX_UNWRAP_DEPTH {
        match decode(&current) {
            Decoded::Answer(inner) => {
                current = strip_code_fence(&inner).to_string();
                depth += 1;
            }
            Decoded::Plain => break,
        }
    }
    debug!(unwrap_depth = depth, "Reply unwrapped");

    let cleaned = current.replace('*', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || PLACEHOLDERS.contains(&cleaned) {
        return FALLBACK_ANSWER.to_string();
    }
    cleaned.to_string()
}

fn decode(current: &str) -> Decoded {
    let trimmed = current.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return Decoded::Plain;
    }

    let object = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(object)) => object,
        Ok(_) => return Decoded::Plain,
        Err(e) => {
            debug!(error = %e, "Reply looks like JSON but does not parse, keeping it as text");
            return Decoded::Plain;
        }
    };

    match object.get("answer") {
        Some(Value::String(s)) => Decoded::Answer(s.clone()),
        Some(Value::Null) => Decoded::Answer(String::new()),
        Some(other) => Decoded::Answer(other.to_string()),
        None => Decoded::Plain,
    }
}

/// Returns the body of a fenced code block, or the input when it is not one.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix(FENCE) else {
        return text;
    };
    let Some((tag, rest)) = after_open.split_once('\n') else {
        return text;
    };
    if !tag.trim().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '+') {
        return text;
    }
    let rest = rest.trim_end();
    let Some(body) = rest.strip_suffix(FENCE) else {
        return text;
    };
    // The closing fence has to sit on its own line.
    if !body.is_empty() && !body.ends_with('\n') {
        return text;
    }
    body.trim_end_matches(|c| c == '\n' || c == '\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_with_language_tag() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn fence_without_language_tag() {
        assert_eq!(strip_code_fence("```\nhello\nworld\n```\n"), "hello\nworld");
    }

    #[test]
    fn unterminated_fence_is_left_alone() {
        let text = "```json\n{\"a\": 1}";
        assert_eq!(strip_code_fence(text), text);
    }

    #[test]
    fn inline_backticks_are_not_a_fence() {
        let text = "use ```code``` here";
        assert_eq!(strip_code_fence(text), text);
    }

    #[test]
    fn closing_fence_must_be_on_its_own_line() {
        let text = "```json\n{\"a\": 1}```";
        assert_eq!(strip_code_fence(text), text);
    }

    #[test]
    fn decode_stops_on_objects_without_answer() {
        assert!(matches!(decode("{\"text\": \"x\"}"), Decoded::Plain));
        assert!(matches!(decode("[1, 2]"), Decoded::Plain));
    }
}
