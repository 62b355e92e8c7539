//! Builtin Functions - 기본 제공 함수
//!
//! - `execute_shell_command` - 셸 명령 실행

mod shell;

pub use shell::{ExecuteShellCommand, EXECUTE_SHELL_COMMAND};

use super::Function;
use std::sync::Arc;

/// 모든 builtin 함수
pub fn all_functions() -> Vec<Arc<dyn Function>> {
    vec![Arc::new(ExecuteShellCommand::new())]
}
