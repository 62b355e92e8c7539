//! shellforge-core: Core Runtime for ShellForge
//!
//! Layer2 - 역할과 함수 호출 레이어
//!
//! # 주요 모듈
//!
//! - `role`: 역할 정의 (builtin + 사용자 정의), 조회, 저장
//! - `function`: 로컬 함수, 레지스트리, 함수 호출 루프 (dispatcher)
//!
//! # 사용 예시
//!
//! ```ignore
//! use shellforge_core::{FunctionDispatcher, FunctionRegistry, RoleResolver};
//!
//! let roles = RoleResolver::load(&config.roles_path)?;
//! let role = roles.resolve("shell")?;
//!
//! let mut functions = FunctionRegistry::with_builtins();
//! functions.load_manifests(&config.functions_path)?;
//!
//! let outcome = FunctionDispatcher::new(&functions)
//!     .with_max_rounds(config.max_function_rounds)
//!     .run(provider, request, &cancel, Some(&events))
//!     .await?;
//! ```

pub mod function;
pub mod role;

// Re-exports: Role
pub use role::{
    FunctionScope, RoleDefinition, RoleFile, RoleResolver, RoleStore, CODE_ROLE, DEFAULT_ROLE,
    DESCRIBE_SHELL_ROLE, SHELL_ROLE,
};

// Re-exports: Function
pub use function::{
    run_shell, user_shell, DispatchEvent, DispatchOutcome, DispatchRequest, DispatchState,
    ExecuteShellCommand, Function, FunctionDispatcher, FunctionRegistry, ManifestFunction,
    ShellOutput, DEFAULT_MAX_ROUNDS, EXECUTE_SHELL_COMMAND,
};
