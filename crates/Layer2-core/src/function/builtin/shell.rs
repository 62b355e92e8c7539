//! execute_shell_command - 모델이 요청한 셸 명령 실행

use crate::function::process::{run_shell, DEFAULT_TIMEOUT};
use crate::function::Function;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use shellforge_foundation::{Error, Result};
use shellforge_provider::FunctionDef;
use tracing::info;

pub const EXECUTE_SHELL_COMMAND: &str = "execute_shell_command";

#[derive(Debug, Deserialize)]
struct ShellInput {
    shell_command: String,
}

/// Runs one command in the user's shell and reports exit code plus output
#[derive(Debug, Default)]
pub struct ExecuteShellCommand;

impl ExecuteShellCommand {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Function for ExecuteShellCommand {
    fn name(&self) -> &str {
        EXECUTE_SHELL_COMMAND
    }

    fn definition(&self) -> FunctionDef {
        FunctionDef::new(
            EXECUTE_SHELL_COMMAND,
            "Executes a shell command and returns the output (result).",
        )
        .with_string_param(
            "shell_command",
            "Shell command to execute. Example: ls -la",
            true,
        )
    }

    async fn execute(&self, arguments: Value) -> Result<String> {
        let input: ShellInput = serde_json::from_value(arguments).map_err(|e| {
            Error::function_execution(EXECUTE_SHELL_COMMAND, format!("Invalid arguments: {}", e))
        })?;
        if input.shell_command.trim().is_empty() {
            return Err(Error::function_execution(
                EXECUTE_SHELL_COMMAND,
                "Command cannot be empty",
            ));
        }

        info!("Executing shell command: {}", input.shell_command);
        let output = run_shell(&input.shell_command, &[], DEFAULT_TIMEOUT).await?;
        Ok(output.to_function_result())
    }
}
