//! Parsed tool call arguments.

use serde::de::DeserializeOwned;

use crate::error::ScouterError;

/// Arguments of one tool call, parsed from the model's raw JSON text.
///
/// Always holds a JSON object. Accessor failures are reported as
/// [`ScouterError::ToolExecution`] against the owning tool.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    tool_name: String,
    value: serde_json::Value,
}

impl ToolArguments {
    /// Parse raw argument text. Blank text means no arguments (`{}`).
    pub fn parse(tool_name: &str, raw: &str) -> Result<Self, ScouterError> {
        let trimmed = raw.trim();
        let value = if trimmed.is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str::<serde_json::Value>(trimmed).map_err(|e| {
                ScouterError::tool(tool_name, format!("malformed arguments: {e}"))
            })?
        };
        Self::from_value(tool_name, value)
    }

    /// Wrap an already-parsed value. Non-objects are rejected.
    pub fn from_value(tool_name: &str, value: serde_json::Value) -> Result<Self, ScouterError> {
        if !value.is_object() {
            return Err(ScouterError::tool(
                tool_name,
                "arguments must be a JSON object",
            ));
        }
        Ok(Self {
            tool_name: tool_name.to_string(),
            value,
        })
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// The arguments as a JSON map.
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.value.as_object().cloned().unwrap_or_default()
    }

    pub fn get_str(&self, key: &str) -> Result<&str, ScouterError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| self.missing("string", key))
    }

    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, ScouterError> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| self.missing("integer", key))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ScouterError> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| self.missing("boolean", key))
    }

    /// Deserialize the entire arguments into a typed record.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ScouterError> {
        T::deserialize(&self.value).map_err(|e| {
            ScouterError::tool(&self.tool_name, format!("invalid arguments: {e}"))
        })
    }

    fn missing(&self, kind: &str, key: &str) -> ScouterError {
        ScouterError::tool(&self.tool_name, format!("missing {kind} argument: {key}"))
    }
}
