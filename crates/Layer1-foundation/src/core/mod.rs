//! Core Module - 핵심 타입
//!
//! 모든 레이어가 공유하는 데이터 타입을 정의합니다.
//!
//! - `types.rs`: Message, FunctionCall, GenerationOptions, SessionInfo

pub mod types;

pub use types::{FunctionCall, GenerationOptions, Message, MessageRole, SessionInfo};
