//! OpenAI-compatible provider with SSE streaming support
//!
//! Uses the chat completions endpoint with the `functions` / `function_call`
//! request format, which most OpenAI-compatible servers still accept.

use crate::{
    error::ProviderError,
    r#trait::{EventStream, FinishReason, Provider, ProviderResponse, StreamEvent},
    FunctionDef,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shellforge_foundation::{FunctionCall, GenerationOptions, Message};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::io::StreamReader;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// OpenAI-compatible provider
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a new provider against the public OpenAI endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Use a custom base URL (Azure, LocalAI, Ollama, ...)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ProviderError> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(
        messages: &[Message],
        functions: &[FunctionDef],
        options: &GenerationOptions,
        stream: bool,
    ) -> OpenAiRequest {
        OpenAiRequest {
            model: options.model.clone(),
            messages: messages.iter().map(OpenAiMessage::from).collect(),
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.max_tokens,
            functions: (!functions.is_empty()).then(|| functions.to_vec()),
            stream,
        }
    }

    /// Parse error response from the API
    fn parse_error_response(status: reqwest::StatusCode, body: &str) -> ProviderError {
        if let Ok(error_response) = serde_json::from_str::<OpenAiErrorResponse>(body) {
            let error = error_response.error;
            let message = error.message;

            return match error.code.as_deref() {
                Some("rate_limit_exceeded") => ProviderError::RateLimited {
                    retry_after_ms: None,
                },
                Some("context_length_exceeded") => ProviderError::ContextLengthExceeded(message),
                Some("invalid_api_key") => ProviderError::Authentication(message),
                Some("insufficient_quota") => ProviderError::QuotaExceeded(message),
                Some("model_not_found") => ProviderError::ModelNotFound(message),
                Some("content_policy_violation") => ProviderError::ContentFiltered(message),
                _ => ProviderError::from_http_status(status.as_u16(), &message),
            };
        }

        ProviderError::from_http_status(status.as_u16(), body)
    }

    async fn send(&self, request: &OpenAiRequest) -> Result<reqwest::Response, ProviderError> {
        let mut builder = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json");
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }
        if request.stream {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::parse_error_response(status, &body));
        }
        Ok(response)
    }
}

fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn stream(
        &self,
        messages: Vec<Message>,
        functions: Vec<FunctionDef>,
        options: GenerationOptions,
    ) -> EventStream<'_> {
        let request = Self::build_request(&messages, &functions, &options, true);

        Box::pin(async_stream::stream! {
            let response = match self.send(&request).await {
                Ok(resp) => resp,
                Err(e) => {
                    yield StreamEvent::Error(e);
                    return;
                }
            };

            let mut pending = PartialFunctionCall::default();
            let mut finished = false;

            // Convert response body to async reader for SSE parsing
            let byte_stream = response.bytes_stream();
            let stream_reader = StreamReader::new(
                byte_stream.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
            );
            let mut reader = BufReader::new(stream_reader);
            let mut line_buffer = String::new();

            loop {
                line_buffer.clear();
                match reader.read_line(&mut line_buffer).await {
                    Ok(0) => {
                        // EOF without [DONE]: only complete if a finish_reason arrived
                        if finished {
                            if let Some(call) = pending.take() {
                                yield StreamEvent::FunctionCall(call);
                            }
                            yield StreamEvent::Done;
                        } else {
                            yield StreamEvent::Error(ProviderError::StreamError(
                                "stream ended before completion".to_string(),
                            ));
                        }
                        break;
                    }
                    Ok(_) => {
                        let line = line_buffer.trim();

                        // Skip empty lines and comments
                        if line.is_empty() || line.starts_with(':') {
                            continue;
                        }

                        let Some(data) = line.strip_prefix("data:").map(str::trim_start) else {
                            continue;
                        };

                        if data == "[DONE]" {
                            if let Some(call) = pending.take() {
                                yield StreamEvent::FunctionCall(call);
                            }
                            yield StreamEvent::Done;
                            break;
                        }

                        match serde_json::from_str::<OpenAiStreamChunk>(data) {
                            Ok(chunk) => {
                                for choice in chunk.choices {
                                    let delta = choice.delta;

                                    if let Some(content) = delta.content {
                                        if !content.is_empty() {
                                            yield StreamEvent::Text(content);
                                        }
                                    }

                                    if let Some(function) = delta.function_call {
                                        pending.push(function);
                                    }

                                    if choice.finish_reason.is_some() {
                                        finished = true;
                                        if let Some(call) = pending.take() {
                                            yield StreamEvent::FunctionCall(call);
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse SSE chunk: {} - data: {}", e, data);
                            }
                        }
                    }
                    Err(e) => {
                        yield StreamEvent::Error(ProviderError::StreamError(format!(
                            "Stream read error: {}",
                            e
                        )));
                        break;
                    }
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
        let request = Self::build_request(&messages, &functions, &options, false);
        let response = self.send(&request).await?;

        let api_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let choice = api_response.choices.into_iter().next().ok_or_else(|| {
            ProviderError::InvalidResponse("No choices in response".to_string())
        })?;

        Ok(ProviderResponse {
            content: choice.message.content.unwrap_or_default(),
            function_call: choice
                .message
                .function_call
                .map(|f| FunctionCall::new(f.name, f.arguments)),
            finish_reason: FinishReason::from_wire(choice.finish_reason.as_deref()),
        })
    }
}

// Accumulates a function call spread across stream deltas
#[derive(Debug, Default)]
struct PartialFunctionCall {
    name: String,
    arguments: String,
}

impl PartialFunctionCall {
    fn push(&mut self, delta: OpenAiStreamFunction) {
        if let Some(name) = delta.name {
            self.name.push_str(&name);
        }
        if let Some(args) = delta.arguments {
            self.arguments.push_str(&args);
        }
    }

    fn take(&mut self) -> Option<FunctionCall> {
        let partial = std::mem::take(self);
        if partial.name.is_empty() {
            return None;
        }
        Some(FunctionCall::new(partial.name, partial.arguments))
    }
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<Vec<FunctionDef>>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    // null is meaningful for assistant messages that only carry a function call
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<OpenAiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

// Response types
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

// Streaming types
#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
    function_call: Option<OpenAiStreamFunction>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}

// Error types
#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiError,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    message: String,
    code: Option<String>,
}

// ============================================================================
// Conversions
// ============================================================================

impl From<&Message> for OpenAiMessage {
    fn from(msg: &Message) -> Self {
        OpenAiMessage {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
            function_call: msg.function_call.as_ref().map(|call| OpenAiFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            }),
            name: msg.name.clone(),
        }
    }
}
