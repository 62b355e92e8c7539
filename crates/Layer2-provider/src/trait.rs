//! Provider trait and common types
//!
//! ## 타입 의존성
//!
//! - `Message`, `FunctionCall`, `GenerationOptions`: Layer1-foundation에서 re-export
//! - `StreamEvent`: 이 레이어 고유 정의 (ProviderError 포함)

use crate::error::ProviderError;
use crate::FunctionDef;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use shellforge_foundation::{FunctionCall, GenerationOptions, Message};
use std::pin::Pin;

/// Events emitted during streaming
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Text content delta
    Text(String),

    /// Function call completed (name and full argument string)
    FunctionCall(FunctionCall),

    /// Stream completed
    Done,

    /// Error occurred
    Error(ProviderError),
}

/// Boxed event stream returned by [`Provider::stream`]
pub type EventStream<'a> = Pin<Box<dyn Stream<Item = StreamEvent> + Send + 'a>>;

/// Complete response from provider (for non-streaming)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderResponse {
    /// Text content
    pub content: String,

    /// Function call (if any)
    pub function_call: Option<FunctionCall>,

    /// Finish reason
    pub finish_reason: FinishReason,
}

/// Reason for completion finishing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    /// Completed naturally
    Stop,

    /// Hit max tokens limit
    MaxTokens,

    /// Function call requested
    FunctionCall,

    /// Content filtered
    ContentFilter,

    /// Unknown/other
    #[default]
    Other,
}

impl FinishReason {
    pub fn from_wire(reason: Option<&str>) -> Self {
        match reason {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::MaxTokens,
            Some("function_call") | Some("tool_calls") => FinishReason::FunctionCall,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Other,
        }
    }
}

/// Remote generator
///
/// Implement this trait to add support for a new LLM backend. `messages`
/// always carries the full conversation, system message first.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Send messages and get a streaming response
    fn stream(
        &self,
        messages: Vec<Message>,
        functions: Vec<FunctionDef>,
        options: GenerationOptions,
    ) -> EventStream<'_>;

    /// Send messages and get a complete response (non-streaming)
    async fn complete(
        &self,
        messages: Vec<Message>,
        functions: Vec<FunctionDef>,
        options: GenerationOptions,
    ) -> Result<ProviderResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_from_wire() {
        assert_eq!(FinishReason::from_wire(Some("stop")), FinishReason::Stop);
        assert_eq!(
            FinishReason::from_wire(Some("function_call")),
            FinishReason::FunctionCall
        );
        assert_eq!(FinishReason::from_wire(None), FinishReason::Other);
    }
}
