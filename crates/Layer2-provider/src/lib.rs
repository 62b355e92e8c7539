//! # shellforge-provider
//!
//! Remote generator abstraction layer for ShellForge.
//!
//! ## Features
//! - SSE streaming for real-time responses
//! - Legacy `functions` / `function_call` calling format
//! - OpenAI-compatible endpoints (OpenAI, Azure, LocalAI, Ollama, ...)
//! - Scripted provider for deterministic tests (`testing` feature)
//!
//! Errors are surfaced to the caller as-is. Nothing in this crate retries a
//! request, since a retry could duplicate a billed call.

pub mod error;
pub mod function_def;
pub mod providers;
pub mod r#trait;

// Core traits and types
pub use function_def::FunctionDef;
pub use r#trait::{EventStream, FinishReason, Provider, ProviderResponse, StreamEvent};

// Error
pub use error::ProviderError;

// Provider implementations
pub use providers::openai::OpenAiProvider;
#[cfg(any(test, feature = "testing"))]
pub use providers::scripted::{RecordedRequest, ScriptedProvider, ScriptedReply};
