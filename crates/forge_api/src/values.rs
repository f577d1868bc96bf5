//! Deep merge of plugin value trees.
//!
//! Plugin defaults and user overrides are arbitrary JSON-like trees. Maps are
//! merged key by key, everything else is replaced wholesale by the override.

use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult};

/// A plugin value tree. Always a JSON object at the top level.
pub type Values = Map<String, Value>;

/// Merge `overrides` on top of `defaults`.
///
/// - keys present on both sides take the override's value
/// - nested maps merge recursively
/// - lists and scalars are replaced, never concatenated
/// - a `null` override keeps the default
///
/// A map on one side and a non-map on the other is a [`ApiError::MergeConflict`].
pub fn merge_values(defaults: &Values, overrides: &Values) -> ApiResult<Values> {
    merge_maps(defaults, overrides, "")
}

fn merge_maps(defaults: &Values, overrides: &Values, prefix: &str) -> ApiResult<Values> {
    let mut merged = defaults.clone();

    for (key, value) in overrides {
        let path = join_path(prefix, key);
        let next = match merged.get(key) {
            Some(existing) => merge_value(existing, value, &path)?,
            None => value.clone(),
        };
        merged.insert(key.clone(), next);
    }

    Ok(merged)
}

fn merge_value(default: &Value, value: &Value, path: &str) -> ApiResult<Value> {
    match (default, value) {
        (_, Value::Null) => Ok(default.clone()),
        (Value::Null, _) => Ok(value.clone()),
        (Value::Object(d), Value::Object(o)) => Ok(Value::Object(merge_maps(d, o, path)?)),
        (Value::Object(_), other) | (other, Value::Object(_)) if !other.is_object() => {
            Err(ApiError::MergeConflict {
                path: path.to_string(),
                defaults: kind_of(default),
                overrides: kind_of(value),
            })
        }
        _ => Ok(value.clone()),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Human readable name of a value's type, used in error messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}
