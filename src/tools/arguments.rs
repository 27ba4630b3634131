//! Typed access to tool call arguments.

use serde::de::DeserializeOwned;

use crate::error::ConfabError;
use crate::types::ToolCall;

/// Parsed arguments of one tool call.
///
/// The raw payload is kept on the [`ToolCall`]; parsing happens only once a
/// handler has been resolved, so decode failures stay local to that call.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    tool_name: String,
    value: serde_json::Value,
}

impl ToolArguments {
    /// Parse the raw arguments of `call`. An empty payload parses as `{}`.
    pub fn from_call(call: &ToolCall) -> Result<Self, ConfabError> {
        let trimmed = call.arguments.trim();
        let value = if trimmed.is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(trimmed).map_err(|e| decode_error(&call.name, e))?
        };
        Ok(Self {
            tool_name: call.name.clone(),
            value,
        })
    }

    /// Parse and deserialize the arguments of `call` in one step.
    pub fn decode<T: DeserializeOwned>(call: &ToolCall) -> Result<T, ConfabError> {
        Self::from_call(call)?.deserialize()
    }

    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, ConfabError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| self.missing(key, "string"))
    }

    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get an array argument by key.
    pub fn get_array(&self, key: &str) -> Result<&Vec<serde_json::Value>, ConfabError> {
        self.value
            .get(key)
            .and_then(|v| v.as_array())
            .ok_or_else(|| self.missing(key, "array"))
    }

    /// Deserialize the whole argument object into a typed struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ConfabError> {
        serde_json::from_value(self.value.clone()).map_err(|e| decode_error(&self.tool_name, e))
    }

    fn missing(&self, key: &str, expected: &str) -> ConfabError {
        ConfabError::ToolDecode {
            tool_name: self.tool_name.clone(),
            message: format!("missing {expected} argument: {key}"),
        }
    }
}

fn decode_error(tool_name: &str, err: serde_json::Error) -> ConfabError {
    ConfabError::ToolDecode {
        tool_name: tool_name.to_string(),
        message: err.to_string(),
    }
}
