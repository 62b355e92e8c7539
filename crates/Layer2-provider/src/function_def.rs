//! Function definitions for LLM function calling

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Definition of a function the model may call
///
/// Serialized as-is into the `functions` array of a chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    /// Function name (should be unique)
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for parameters
    pub parameters: Value,
}

impl FunctionDef {
    /// Create a new function definition without parameters
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    /// Replace the whole parameter schema
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Add a string parameter
    pub fn with_string_param(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.with_param(name.into(), "string", description.into(), required)
    }

    /// Add an integer parameter
    pub fn with_integer_param(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.with_param(name.into(), "integer", description.into(), required)
    }

    fn with_param(mut self, name: String, kind: &str, description: String, required: bool) -> Self {
        if let Some(props) = self
            .parameters
            .get_mut("properties")
            .and_then(Value::as_object_mut)
        {
            props.insert(
                name.clone(),
                serde_json::json!({ "type": kind, "description": description }),
            );
        }

        if required {
            if let Some(list) = self
                .parameters
                .get_mut("required")
                .and_then(Value::as_array_mut)
            {
                list.push(Value::String(name));
            }
        }
        self
    }

    /// Names of the required parameters
    pub fn required_params(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let def = FunctionDef::new("execute_shell_command", "Run a shell command")
            .with_string_param("shell_command", "Command to run", true)
            .with_integer_param("timeout", "Seconds", false);

        assert_eq!(def.parameters["properties"]["shell_command"]["type"], "string");
        assert_eq!(def.parameters["properties"]["timeout"]["type"], "integer");
        assert_eq!(def.required_params(), vec!["shell_command"]);
    }

    #[test]
    fn test_custom_schema() {
        let def = FunctionDef::new("weather", "Current weather").with_parameters(serde_json::json!({
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"]
        }));
        assert_eq!(def.required_params(), vec!["city"]);
    }
}
