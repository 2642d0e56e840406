//! Strip accidental JSON wrapping from free-text model output.
//!
//! Models asked for plain text sometimes answer `{"reply": "..."}` or prefix the text with a
//! JSON header. [`sanitize`] recovers the human-readable answer. It is pure and total: any
//! parse failure only means a heuristic does not apply.

use serde_json::{Map, Value};

/// Keys that usually carry the answer, in priority order.
pub const ANSWER_KEYS: &[&str] = &[
    "odpowiedz_tekstowa",
    "reply",
    "answer",
    "text",
    "message",
    "reply_html",
    "content",
];

/// Strings are returned trimmed; anything else is serialized back to JSON.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// List elements: strings unquoted, other values as JSON.
fn item_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// First present key from [`ANSWER_KEYS`], rendered as text.
pub fn answer_from_object(map: &Map<String, Value>) -> Option<String> {
    ANSWER_KEYS
        .iter()
        .find_map(|key| map.get(*key))
        .map(value_to_text)
}

/// Recover the answer text from raw model output.
///
/// 1. Whole text is JSON: object → first answer key, or the single entry's value; list → items
///    joined by newlines.
/// 2. Text starts with a JSON header closed by the first `}`: the text after the header, or the
///    header's answer key when nothing follows. An unparsable header is dropped when text
///    follows it.
/// 3. Otherwise the input is returned unchanged.
///
/// The steps repeat until the text stops changing, so wrappers nested inside wrappers are
/// removed too and `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = sanitize_once(&current);
        // Every rewrite is strictly shorter, so this terminates.
        if next == current || next.len() >= current.len() {
            return next;
        }
        current = next;
    }
}

fn sanitize_once(raw: &str) -> String {
    let txt = raw.trim();

    if txt.starts_with('{') || txt.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(txt) {
            match &value {
                Value::Object(map) => {
                    if let Some(found) = answer_from_object(map) {
                        return found;
                    }
                    if map.len() == 1 {
                        if let Some(only) = map.values().next() {
                            return value_to_text(only);
                        }
                    }
                }
                Value::Array(items) => {
                    return items.iter().map(item_to_text).collect::<Vec<_>>().join("\n");
                }
                _ => {}
            }
        }
    }

    if txt.starts_with('{') {
        if let Some(end) = txt.find('}') {
            let (header, rest) = txt.split_at(end + 1);
            let remainder = rest.trim();
            match serde_json::from_str::<Value>(header) {
                Ok(parsed) => {
                    if !remainder.is_empty() {
                        return remainder.to_string();
                    }
                    if let Some(found) = parsed.as_object().and_then(answer_from_object) {
                        return found;
                    }
                }
                Err(_) if !remainder.is_empty() => {
                    log::debug!("dropping unparsable JSON header from model output");
                    return remainder.to_string();
                }
                Err(_) => {}
            }
        }
    }

    raw.to_string()
}
