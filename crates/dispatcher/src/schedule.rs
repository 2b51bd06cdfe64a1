//! Schedule block normalization
//!
//! Accepts an object with a `targets` list, a bare list of pointing
//! descriptors, or a list wrapping one such list. This is the only place that
//! deals with the union of shapes; everything downstream sees a flat list of
//! target descriptions in block order.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{DispatcherError, Result};

/// Undo the string-quoting some producers wrap around list literals
///
/// `"[{...}]"` -> `[{...}]`
pub fn unquote_lists(raw: &str) -> String {
    raw.replace("\"[", "[").replace("]\"", "]")
}

/// Parse a block or status message
///
/// Producers send YAML flow text (`[{'target': '...'}]`) as well as JSON;
/// both are read after unquoting list literals.
pub fn load_block<T: DeserializeOwned>(raw: &str) -> std::result::Result<T, serde_yaml::Error> {
    serde_yaml::from_str(&unquote_lists(raw))
}

/// Whether a sensor value carries an inline block rather than a bus key
pub fn looks_inline(value: &str) -> bool {
    matches!(value.trim_start().chars().next(), Some('[' | '{' | '"'))
}

/// Target descriptions of every pointing in the block, in block order
///
/// # Errors
/// `ScheduleBlock` if the text does not parse, has an unsupported shape, or a
/// descriptor lacks a string `target` field.
pub fn target_descriptions(raw: &str) -> Result<Vec<String>> {
    let block: Value = load_block(raw)
        .map_err(|e| DispatcherError::schedule_block(format!("unreadable block: {e}")))?;

    let descriptors = match &block {
        Value::Object(map) => match map.get("targets") {
            Some(Value::Array(items)) => items.as_slice(),
            Some(_) => return Err(DispatcherError::schedule_block("'targets' is not a list")),
            None => return Err(DispatcherError::schedule_block("object without 'targets'")),
        },
        Value::Array(items) => match items.first() {
            Some(Value::Array(inner)) => inner.as_slice(),
            _ => items.as_slice(),
        },
        _ => {
            return Err(DispatcherError::schedule_block(
                "expected an object or a list",
            ))
        }
    };

    descriptors
        .iter()
        .enumerate()
        .map(|(i, descriptor)| {
            descriptor
                .get("target")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    DispatcherError::schedule_block(format!(
                        "pointing {i} has no string 'target' field"
                    ))
                })
        })
        .collect()
}
