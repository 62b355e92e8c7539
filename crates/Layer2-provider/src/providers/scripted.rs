//! Deterministic scripted provider
//!
//! Replays a fixed sequence of replies, one per call, and records every
//! request it receives. No transport logic; used for tests and offline runs.

use crate::{
    error::ProviderError,
    r#trait::{EventStream, FinishReason, Provider, ProviderResponse, StreamEvent},
    FunctionDef,
};
use async_trait::async_trait;
use shellforge_foundation::{FunctionCall, GenerationOptions, Message};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Stable provider identifier
pub const SCRIPTED_PROVIDER_ID: &str = "scripted";

/// One scripted reply
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    /// Plain text, streamed in whitespace-delimited chunks
    Text(String),

    /// A function call request
    FunctionCall(FunctionCall),

    /// Some text, then the stream stops without completing
    Interrupted(String),

    /// Transport failure
    Error(ProviderError),
}

impl ScriptedReply {
    pub fn text(content: impl Into<String>) -> Self {
        ScriptedReply::Text(content.into())
    }

    pub fn function_call(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        ScriptedReply::FunctionCall(FunctionCall::new(name, arguments.to_string()))
    }
}

/// A request as seen by the provider
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub functions: Vec<String>,
    pub options: GenerationOptions,
}

#[derive(Debug, Default)]
struct ScriptState {
    replies: VecDeque<ScriptedReply>,
    /// Returned forever once `replies` is drained
    fallback: Option<ScriptedReply>,
    requests: Vec<RecordedRequest>,
}

/// Provider that replays scripted replies in order
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    state: Mutex<ScriptState>,
}

impl ScriptedProvider {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                replies: replies.into_iter().collect(),
                fallback: None,
                requests: Vec::new(),
            }),
        }
    }

    /// Answers every call with the same reply
    pub fn repeating(reply: ScriptedReply) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                fallback: Some(reply),
                ..Default::default()
            }),
        }
    }

    /// Queue another reply
    pub fn push(&self, reply: ScriptedReply) {
        lock_unpoisoned(&self.state).replies.push_back(reply);
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        lock_unpoisoned(&self.state).requests.len()
    }

    /// All requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock_unpoisoned(&self.state).requests.clone()
    }

    fn next_reply(
        &self,
        messages: Vec<Message>,
        functions: &[FunctionDef],
        options: GenerationOptions,
    ) -> ScriptedReply {
        let mut state = lock_unpoisoned(&self.state);
        state.requests.push(RecordedRequest {
            messages,
            functions: functions.iter().map(|f| f.name.clone()).collect(),
            options,
        });
        state
            .replies
            .pop_front()
            .or_else(|| state.fallback.clone())
            .unwrap_or_else(|| {
                ScriptedReply::Error(ProviderError::InvalidResponse(
                    "scripted provider has no replies left".to_string(),
                ))
            })
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        SCRIPTED_PROVIDER_ID
    }

    fn stream(
        &self,
        messages: Vec<Message>,
        functions: Vec<FunctionDef>,
        options: GenerationOptions,
    ) -> EventStream<'_> {
        let reply = self.next_reply(messages, &functions, options);

        Box::pin(async_stream::stream! {
            match reply {
                ScriptedReply::Text(content) => {
                    for chunk in chunks(&content) {
                        yield StreamEvent::Text(chunk);
                    }
                    yield StreamEvent::Done;
                }
                ScriptedReply::FunctionCall(call) => {
                    yield StreamEvent::FunctionCall(call);
                    yield StreamEvent::Done;
                }
                ScriptedReply::Interrupted(content) => {
                    for chunk in chunks(&content) {
                        yield StreamEvent::Text(chunk);
                    }
                    yield StreamEvent::Error(ProviderError::StreamError(
                        "stream ended before completion".to_string(),
                    ));
                }
                ScriptedReply::Error(e) => {
                    yield StreamEvent::Error(e);
                }
            }
        })
    }

    async fn complete(
        &self,
        messages: Vec<Message>,
        functions: Vec<FunctionDef>,
        options: GenerationOptions,
    ) -> Result<ProviderResponse, ProviderError> {
        match self.next_reply(messages, &functions, options) {
            ScriptedReply::Text(content) => Ok(ProviderResponse {
                content,
                function_call: None,
                finish_reason: FinishReason::Stop,
            }),
            ScriptedReply::FunctionCall(call) => Ok(ProviderResponse {
                content: String::new(),
                function_call: Some(call),
                finish_reason: FinishReason::FunctionCall,
            }),
            ScriptedReply::Interrupted(_) => Err(ProviderError::StreamError(
                "stream ended before completion".to_string(),
            )),
            ScriptedReply::Error(e) => Err(e),
        }
    }
}

/// Split text into chunks that concatenate back to the original
fn chunks(content: &str) -> Vec<String> {
    content
        .split_inclusive(' ')
        .map(str::to_string)
        .collect()
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
