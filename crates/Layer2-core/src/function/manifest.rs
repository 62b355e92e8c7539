//! Manifest Functions - JSON 파일로 정의한 사용자 함수
//!
//! `<functions_path>/<name>.json`:
//!
//! ```json
//! {
//!   "name": "weather",
//!   "description": "Current weather for a city",
//!   "parameters": {
//!     "type": "object",
//!     "properties": { "city": { "type": "string" } },
//!     "required": ["city"]
//!   },
//!   "command": "curl -s \"wttr.in/$SHELLFORGE_ARG_CITY?format=3\""
//! }
//! ```
//!
//! 인자는 `SHELLFORGE_ARG_<NAME>` 환경변수로 전달됩니다. 문자열은 그대로,
//! 그 외 값은 JSON 텍스트로.

use super::process::{run_shell, DEFAULT_TIMEOUT};
use super::Function;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shellforge_foundation::{Error, Result};
use shellforge_provider::FunctionDef;
use std::path::Path;
use tracing::info;

/// 환경변수 접두사
pub const ARG_ENV_PREFIX: &str = "SHELLFORGE_ARG_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestFunction {
    pub name: String,
    pub description: String,
    #[serde(default = "empty_schema")]
    pub parameters: Value,
    pub command: String,
}

fn empty_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ManifestFunction {
    /// Read and validate one manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let manifest: Self = serde_json::from_str(&content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::Validation(format!(
                "Invalid function name: {:?}",
                self.name
            )));
        }
        if self.command.trim().is_empty() {
            return Err(Error::Validation(format!(
                "Function {} has an empty command",
                self.name
            )));
        }
        if !self.parameters.is_object() {
            return Err(Error::Validation(format!(
                "Function {} parameters must be a JSON object",
                self.name
            )));
        }
        Ok(())
    }

    /// Arguments as environment variables
    pub fn env_for(arguments: &Value) -> Vec<(String, String)> {
        let Some(map) = arguments.as_object() else {
            return Vec::new();
        };
        map.iter()
            .map(|(key, value)| {
                let name = format!(
                    "{}{}",
                    ARG_ENV_PREFIX,
                    key.to_ascii_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_")
                );
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name, value)
            })
            .collect()
    }
}

#[async_trait]
impl Function for ManifestFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn definition(&self) -> FunctionDef {
        FunctionDef::new(&self.name, &self.description).with_parameters(self.parameters.clone())
    }

    async fn execute(&self, arguments: Value) -> Result<String> {
        if !arguments.is_object() && !arguments.is_null() {
            return Err(Error::function_execution(
                &self.name,
                "Arguments must be a JSON object",
            ));
        }
        let env = Self::env_for(&arguments);
        info!("Running function {} ({} args)", self.name, env.len());
        let output = run_shell(&self.command, &env, DEFAULT_TIMEOUT).await?;
        Ok(output.to_function_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_env_for() {
        let env = ManifestFunction::env_for(&json!({"city": "Seoul", "days": 3, "hourly-view": true}));
        assert!(env.contains(&("SHELLFORGE_ARG_CITY".to_string(), "Seoul".to_string())));
        assert!(env.contains(&("SHELLFORGE_ARG_DAYS".to_string(), "3".to_string())));
        assert!(env.contains(&("SHELLFORGE_ARG_HOURLY_VIEW".to_string(), "true".to_string())));
        assert!(ManifestFunction::env_for(&json!("x")).is_empty());
    }

    #[test]
    fn test_load_validates() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.json");
        std::fs::write(&good, r#"{"name": "now", "description": "Time", "command": "date"}"#).unwrap();
        let function = ManifestFunction::load(&good).unwrap();
        assert_eq!(function.definition().parameters["type"], "object");

        let bad = temp.path().join("bad.json");
        std::fs::write(&bad, r#"{"name": "rm -rf", "description": "", "command": "x"}"#).unwrap();
        assert!(matches!(ManifestFunction::load(&bad), Err(Error::Validation(_))));

        let empty = temp.path().join("empty.json");
        std::fs::write(&empty, r#"{"name": "noop", "description": "", "command": " "}"#).unwrap();
        assert!(ManifestFunction::load(&empty).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_passes_arguments() {
        let function = ManifestFunction {
            name: "greet".to_string(),
            description: "Greets".to_string(),
            parameters: empty_schema(),
            command: "echo \"hello $SHELLFORGE_ARG_WHO\"".to_string(),
        };
        let out = function.execute(json!({"who": "forge"})).await.unwrap();
        assert_eq!(out, "Exit code: 0, Output:\nhello forge\n");
    }
}
