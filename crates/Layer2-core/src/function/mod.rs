//! Functions - 모델이 호출할 수 있는 로컬 함수
//!
//! - [`Function`] trait과 [`FunctionRegistry`]
//! - Builtin: `execute_shell_command`
//! - 사용자 정의: JSON 매니페스트 ([`ManifestFunction`])
//! - [`FunctionDispatcher`]: 모델 ↔ 함수 루프 상태 머신

pub mod builtin;
mod dispatcher;
mod manifest;
mod process;
mod registry;

pub use builtin::{ExecuteShellCommand, EXECUTE_SHELL_COMMAND};
pub use dispatcher::{
    DispatchEvent, DispatchOutcome, DispatchRequest, DispatchState, FunctionDispatcher,
    DEFAULT_MAX_ROUNDS,
};
pub use manifest::{ManifestFunction, ARG_ENV_PREFIX};
pub use process::{run_shell, user_shell, ShellOutput, DEFAULT_TIMEOUT};
pub use registry::{Function, FunctionRegistry};
