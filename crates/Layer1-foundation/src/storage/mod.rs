//! Storage module for ShellForge
//!
//! - `atomic`: 임시 파일 + rename 기반 원자적 쓰기
//! - `json`: JSON - 범용 파일 저장/로드

pub mod atomic;
mod json;

pub use atomic::{remove_if_exists, write_atomic};

// JSON Storage (범용)
pub use json::JsonStore;
