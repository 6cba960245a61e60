use std::path::Path;

use serde_json::Value;

use docstore_core::error::{Error, Result};
use docstore_core::types::TextUnit;

const TEXT_FIELD: &str = "text";
const ENRICH_FIELDS: [&str; 3] = ["title", "subtitle", "date"];

/// A top-level array yields one unit per element, an object yields one unit.
/// A missing or non-string `text` field reads as the empty string.
pub fn extract(path: &Path, bytes: &[u8]) -> Result<Vec<TextUnit>> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| Error::extraction(path.display().to_string(), e))?;
    match value {
        Value::Array(items) if items.is_empty() => Err(Error::extraction(path.display().to_string(), "the top-level array is empty")),
        Value::Array(items) => Ok(items.iter().map(unit_from).collect()),
        Value::Object(_) => Ok(vec![unit_from(&value)]),
        other => Err(Error::extraction(
            path.display().to_string(),
            format!("expected an object or an array at the top level, found {}", kind(&other)),
        )),
    }
}

fn unit_from(item: &Value) -> TextUnit {
    let text = item.get(TEXT_FIELD).and_then(Value::as_str).unwrap_or_default();
    let mut unit = TextUnit::new(text);
    for key in ENRICH_FIELDS {
        if let Some(v) = item.get(key).and_then(Value::as_str) {
            unit = unit.with_field(key, v);
        }
    }
    unit
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
