//! Narrow, explicit extraction of handler parameters from an untyped bag.
//!
//! Wrong primitive types are reported, never coerced or skipped.

use rmcp::model::JsonObject;
use serde_json::Value;

use crate::error::ToolError;

fn invalid(message: String) -> ToolError {
    ToolError::InvalidParameters(message)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A present, non-empty string parameter.
pub fn required_str<'a>(params: &'a JsonObject, key: &str) -> Result<&'a str, ToolError> {
    match optional_str(params, key)? {
        Some(value) => Ok(value),
        None => Err(invalid(format!("missing required parameter `{}`", key))),
    }
}

/// A string parameter that may be absent; null and `""` count as absent.
pub fn optional_str<'a>(params: &'a JsonObject, key: &str) -> Result<Option<&'a str>, ToolError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(invalid(format!(
            "parameter `{}` must be a string, got {}",
            key,
            type_name(other)
        ))),
    }
}

/// A list whose every element must be a string. Absent means empty.
pub fn string_list(params: &JsonObject, key: &str) -> Result<Vec<String>, ToolError> {
    let items = match params.get(key) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(invalid(format!(
                "parameter `{}` must be a list of strings, got {}",
                key,
                type_name(other)
            )));
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(invalid(format!(
                "invalid {} entry at index {}: expected string, got {}",
                key,
                i,
                other
            ))),
        })
        .collect()
}

/// A string-keyed map rendered as sorted `KEY=VALUE` entries.
///
/// Scalar values are written with their JSON text; nested objects and arrays
/// are rejected.
pub fn env_entries(params: &JsonObject, key: &str) -> Result<Vec<String>, ToolError> {
    let map = match params.get(key) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(invalid(format!(
                "parameter `{}` must be an object of strings, got {}",
                key,
                type_name(other)
            )));
        }
    };

    let mut entries = map
        .iter()
        .map(|(name, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                other => {
                    return Err(invalid(format!(
                        "invalid {} value for `{}`: expected string, got {}",
                        key,
                        name,
                        type_name(other)
                    )));
                }
            };
            Ok(format!("{}={}", name, rendered))
        })
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_required_str() {
        let params = bag(json!({"name": "web", "empty": "", "num": 3}));
        assert_eq!(required_str(&params, "name").unwrap(), "web");
        assert_eq!(
            required_str(&params, "image").unwrap_err(),
            ToolError::InvalidParameters("missing required parameter `image`".into())
        );
        assert!(required_str(&params, "empty").is_err());
        assert_eq!(
            required_str(&params, "num").unwrap_err(),
            ToolError::InvalidParameters("parameter `num` must be a string, got number".into())
        );
    }

    #[test]
    fn test_string_list_rejects_non_string_elements() {
        let params = bag(json!({
            "networks": ["a", "b"],
            "volumes": ["data:/data", {"source": "x", "target": "/x"}]
        }));
        assert_eq!(string_list(&params, "networks").unwrap(), vec!["a", "b"]);
        assert!(string_list(&params, "missing").unwrap().is_empty());

        let err = string_list(&params, "volumes").unwrap_err();
        assert!(err.to_string().starts_with("invalid volumes entry at index 1"));
    }

    #[test]
    fn test_env_entries_are_sorted_and_rendered() {
        let params = bag(json!({
            "environment": {"PORT": 8080, "DEBUG": true, "USER": "app"}
        }));
        assert_eq!(
            env_entries(&params, "environment").unwrap(),
            vec!["DEBUG=true", "PORT=8080", "USER=app"]
        );

        let params = bag(json!({"environment": {"NESTED": {"a": 1}}}));
        assert!(env_entries(&params, "environment").is_err());

        let params = bag(json!({"environment": ["A=1"]}));
        assert!(env_entries(&params, "environment").is_err());
    }
}
