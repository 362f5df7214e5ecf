//! Response Extractor/Validator — recovers a JSON object from free-text model output
//! and conforms it to the requested template.
//!
//! Extraction is two-stage: `strip_wrappers` removes known wrapper markers
//! (BOM, Markdown code fences), then `extract_json_object` attempts a
//! structured parse, first of the whole text and then of the first JSON
//! object embedded in surrounding prose.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::profile::schema::{json_type_name, SchemaTemplate};

const FENCE: &str = "```";

/// Why a reply could not be turned into a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractFailure {
    #[error("model reply was empty")]
    Empty,

    #[error("no JSON object found in model reply")]
    NoJsonObject,

    #[error("model reply is JSON but not an object (found {0})")]
    NotAnObject(&'static str),
}

/// A parsed reply whose top-level key set equals the template's.
#[derive(Debug, Clone, PartialEq)]
pub struct Conformed {
    pub profile: Map<String, Value>,
    /// Template keys the model left out, filled with type defaults.
    pub filled_keys: Vec<String>,
    /// Keys the model added that are not in the template.
    pub dropped_keys: Vec<String>,
}

/// Stage one: removes a byte-order mark, surrounding whitespace and a Markdown
/// code fence (with optional language tag) if present.
pub fn strip_wrappers(text: &str) -> &str {
    let text = text.trim().trim_start_matches('\u{feff}').trim();

    let Some(open) = text.find(FENCE) else {
        return text;
    };
    let after_open = &text[open + FENCE.len()..];

    // Drop a language hint such as `json` on the fence line.
    let body = match after_open.split_once('\n') {
        Some((hint, rest)) if hint.trim().chars().all(|c| c.is_ascii_alphanumeric()) => rest,
        _ => after_open,
    };

    let inner = match body.find(FENCE) {
        Some(close) => &body[..close],
        None => body,
    };

    let inner = inner.trim();
    if inner.is_empty() {
        text
    } else {
        inner
    }
}

/// Stage two: returns the first JSON object recoverable from `text`.
pub fn extract_json_object(text: &str) -> Result<Map<String, Value>, ExtractFailure> {
    let stripped = strip_wrappers(text);
    if stripped.is_empty() {
        return Err(ExtractFailure::Empty);
    }

    let mut non_object: Option<&'static str> = None;

    // The fence heuristic can cut a reply short, so fall back to the unstripped text.
    for candidate in [stripped, text.trim()] {
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => return Ok(map),
            Ok(other) => {
                non_object.get_or_insert(json_type_name(&other));
            }
            Err(_) => {}
        }

        if let Some(map) = first_embedded_object(candidate) {
            return Ok(map);
        }
    }

    Err(non_object.map_or(ExtractFailure::NoJsonObject, ExtractFailure::NotAnObject))
}

/// Parses one JSON value from each `{` in turn, ignoring whatever follows it.
fn first_embedded_object(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{').find_map(|(start, _)| {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Object(map))) => Some(map),
            _ => None,
        }
    })
}

/// Makes the reply's top-level key set equal the template's: missing keys get
/// a default matching the template value's type, unknown keys are dropped.
/// Nested objects present in both are topped up with missing nested keys.
pub fn conform_to_template(mut parsed: Map<String, Value>, template: &SchemaTemplate) -> Conformed {
    let dropped_keys: Vec<String> = parsed
        .keys()
        .filter(|k| !template.fields().contains_key(k.as_str()))
        .cloned()
        .collect();

    let mut profile = Map::new();
    let mut filled_keys = Vec::new();

    for (key, template_value) in template.fields() {
        match parsed.remove(key) {
            Some(mut value) => {
                fill_nested(&mut value, template_value);
                profile.insert(key.clone(), value);
            }
            None => {
                filled_keys.push(key.clone());
                profile.insert(key.clone(), default_for(template_value));
            }
        }
    }

    Conformed {
        profile,
        filled_keys,
        dropped_keys,
    }
}

/// Empty value of the same shape as a template value.
fn default_for(template_value: &Value) -> Value {
    match template_value {
        Value::String(_) => Value::String(String::new()),
        Value::Array(_) => Value::Array(Vec::new()),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), default_for(v)))
                .collect(),
        ),
        Value::Bool(_) => Value::Bool(false),
        Value::Number(_) | Value::Null => Value::Null,
    }
}

fn fill_nested(value: &mut Value, template_value: &Value) {
    if let (Value::Object(fields), Value::Object(template_fields)) = (value, template_value) {
        for (key, nested_template) in template_fields {
            match fields.get_mut(key) {
                Some(nested) => fill_nested(nested, nested_template),
                None => {
                    fields.insert(key.clone(), default_for(nested_template));
                }
            }
        }
    }
}
