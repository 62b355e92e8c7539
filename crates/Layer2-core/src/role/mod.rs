//! Role System - 역할 (system prompt + 허용 함수 + 세션 기본값)
//!
//! ## 구조
//!
//! - `definition.rs` - RoleDefinition 데이터 테이블, 내장 역할
//! - `resolver.rs` - RoleResolver (이름 → 역할, 세션의 역할 복원)
//! - `store.rs` - RoleStore (사용자 정의 역할 CRUD)
//!
//! `shell`, `code`, `describe-shell`은 chat id 없이 호출되면 one-shot으로
//! 동작합니다 (세션에 기록하지 않음).

mod definition;
mod resolver;
mod store;

pub use definition::{
    display_name_of, FunctionScope, RoleDefinition, CODE_ROLE, DEFAULT_ROLE,
    DESCRIBE_SHELL_ROLE, SHELL_ROLE,
};
pub use resolver::RoleResolver;
pub use store::{RoleFile, RoleStore};
