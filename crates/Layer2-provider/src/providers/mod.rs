//! LLM Provider implementations

pub mod openai;
/// Deterministic replies for tests (`testing` feature)
#[cfg(any(test, feature = "testing"))]
pub mod scripted;
