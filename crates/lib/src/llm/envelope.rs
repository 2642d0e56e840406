//! Locate generated text inside a provider response envelope.
//!
//! Each extractor is a pure function from the parsed envelope to an optional string; they are
//! tried in order and the first hit wins. Add a function here to support a new provider shape.

use serde_json::Value;

/// One envelope shape.
pub type Extractor = fn(&Value) -> Option<String>;

/// Extractors in priority order, with a short name for logs.
pub const EXTRACTORS: &[(&str, Extractor)] = &[
    ("choices[0].message.content", chat_completion),
    ("choices[0].text", legacy_completion),
    ("top-level text field", flat_field),
    ("[0].generated_text", generated_text_list),
];

const FLAT_FIELDS: &[&str] = &["content", "text", "message", "reply", "generated_text"];

fn chat_completion(v: &Value) -> Option<String> {
    v.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

fn legacy_completion(v: &Value) -> Option<String> {
    v.get("choices")?.get(0)?.get("text")?.as_str().map(str::to_string)
}

fn flat_field(v: &Value) -> Option<String> {
    let obj = v.as_object()?;
    FLAT_FIELDS
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn generated_text_list(v: &Value) -> Option<String> {
    v.get(0)?.get("generated_text")?.as_str().map(str::to_string)
}

/// Generated text from `envelope`; when no extractor matches, the whole envelope serialized as
/// JSON so the caller still gets something to sanitize.
pub fn extract_text(envelope: &Value) -> String {
    for (name, extractor) in EXTRACTORS {
        if let Some(text) = extractor(envelope) {
            log::trace!("envelope matched {}", name);
            return text;
        }
    }
    log::debug!("no known envelope shape matched; passing the raw envelope on");
    envelope.to_string()
}
