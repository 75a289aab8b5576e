//! Meta Ads tool adapters
//!
//! One adapter per Marketing API create call. Each adapter holds the account
//! handle it was built with, turns model arguments into request parameters,
//! issues exactly one request and returns the new object's id as a small JSON
//! object. Account errors pass through untouched.

use serde_json::{json, Map, Value};

use crate::errors::AgentError;

pub mod ad;
pub mod ad_set;
pub mod campaign;
pub mod creative;
pub mod image;

pub use ad::AdTool;
pub use ad_set::AdSetTool;
pub use campaign::CampaignTool;
pub use creative::AdCreativeTool;
pub use image::AdImageTool;

fn missing(tool_name: &str, key: &str) -> AgentError {
    AgentError::InvalidArguments {
        tool_name: tool_name.to_string(),
        message: format!("missing or invalid '{}'", key),
    }
}

// Arguments reach the adapters only after `ToolRegistry::invoke` has checked
// them against the declared schema, so the readers accept exactly the
// declared types.

pub(crate) fn string_arg(tool_name: &str, args: &Value, key: &str) -> Result<String, AgentError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| missing(tool_name, key))
}

pub(crate) fn optional_string_arg(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Whole floats such as `18.0` are integers to the schema validator too.
pub(crate) fn integer_arg(tool_name: &str, args: &Value, key: &str) -> Result<i64, AgentError> {
    let value = args.get(key).ok_or_else(|| missing(tool_name, key))?;
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        .ok_or_else(|| missing(tool_name, key))
}

/// Object schema with every listed property typed as a described string.
pub(crate) fn string_properties(fields: &[(&str, &str)]) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, description)| {
            (
                name.to_string(),
                json!({"type": "string", "description": description}),
            )
        })
        .collect()
}

pub(crate) fn object_schema(properties: Map<String, Value>, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Serialized single-key result handed back to the model.
pub(crate) fn id_result(key: &str, id: &str) -> String {
    let mut result = Map::new();
    result.insert(key.to_string(), Value::String(id.to_string()));
    Value::Object(result).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_readers() {
        let args = json!({"name": "Spring", "budget": 20, "age": 18, "ratio": 2.0, "page": " "});
        assert_eq!(string_arg("t", &args, "name").unwrap(), "Spring");
        assert!(string_arg("t", &args, "budget").is_err());
        assert_eq!(integer_arg("t", &args, "age").unwrap(), 18);
        assert_eq!(integer_arg("t", &args, "ratio").unwrap(), 2);
        assert!(integer_arg("t", &args, "name").is_err());
        assert!(matches!(
            string_arg("t", &args, "missing"),
            Err(AgentError::InvalidArguments { .. })
        ));
        assert_eq!(optional_string_arg(&args, "missing"), None);
        assert_eq!(optional_string_arg(&args, "page"), None);
    }

    #[test]
    fn test_id_result_shape() {
        assert_eq!(id_result("ad_id", "42"), r#"{"ad_id":"42"}"#);
    }
}
