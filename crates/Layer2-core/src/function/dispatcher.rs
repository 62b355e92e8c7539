//! Function Dispatcher - 모델 ↔ 로컬 함수 루프
//!
//! ```text
//! AwaitingModel ──function_call──▶ Executing ──▶ ResultAppended ──▶ AwaitingModel
//!       │
//!       └──plain content──▶ Done
//! ```
//!
//! 한 턴에서 실행할 수 있는 함수 호출 수는 `max_rounds`로 제한되며,
//! 초과하면 턴 전체가 실패합니다 (아무것도 저장되지 않음).

use super::FunctionRegistry;
use crate::role::RoleDefinition;
use futures::StreamExt;
use shellforge_foundation::{Error, FunctionCall, GenerationOptions, Message, Result};
use shellforge_provider::{FunctionDef, Provider, StreamEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// 기본 최대 라운드
pub const DEFAULT_MAX_ROUNDS: usize = 8;

/// Loop state
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchState {
    /// Waiting for the next model reply
    AwaitingModel,
    /// Model asked for a function call
    Executing(FunctionCall),
    /// Function result was appended to the conversation
    ResultAppended,
    /// Model answered with plain content
    Done(String),
}

/// Events emitted while a turn runs
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    /// Response text fragment
    Text(String),
    /// Function call about to run
    FunctionCall(FunctionCall),
    /// Function finished
    FunctionOutput { name: String, output: String },
}

/// Result of a completed turn
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    /// Final assistant text
    pub response: String,
    /// Messages produced during the turn, final assistant message included
    pub messages: Vec<Message>,
    /// Number of functions executed
    pub rounds: usize,
}

/// Per-turn inputs
pub struct DispatchRequest<'a> {
    /// Full conversation sent to the model (system, history, user prompt)
    pub messages: Vec<Message>,
    /// Functions offered to the model
    pub functions: Vec<FunctionDef>,
    pub role: &'a RoleDefinition,
    pub options: GenerationOptions,
    pub streaming: bool,
}

/// One model reply
struct ModelReply {
    content: String,
    function_call: Option<FunctionCall>,
}

/// Function Dispatcher
pub struct FunctionDispatcher<'a> {
    registry: &'a FunctionRegistry,
    max_rounds: usize,
}

impl<'a> FunctionDispatcher<'a> {
    pub fn new(registry: &'a FunctionRegistry) -> Self {
        Self {
            registry,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Drive the model until it answers with plain content
    pub async fn run<E>(
        &self,
        provider: &dyn Provider,
        request: DispatchRequest<'_>,
        cancel: &CancellationToken,
        events: Option<&mpsc::UnboundedSender<E>>,
    ) -> Result<DispatchOutcome>
    where
        E: From<DispatchEvent> + Send,
    {
        let DispatchRequest {
            mut messages,
            functions,
            role,
            options,
            streaming,
        } = request;

        let emit = |event: DispatchEvent| {
            if let Some(tx) = events {
                let _ = tx.send(E::from(event));
            }
        };

        let mut added = Vec::new();
        let mut rounds = 0;
        let mut state = DispatchState::AwaitingModel;

        loop {
            state = match state {
                DispatchState::AwaitingModel => {
                    let reply = self
                        .ask_model(
                            provider,
                            &messages,
                            &functions,
                            &options,
                            streaming,
                            cancel,
                            &emit,
                        )
                        .await?;
                    match reply.function_call {
                        Some(call) => DispatchState::Executing(call),
                        None => DispatchState::Done(reply.content),
                    }
                }

                DispatchState::Executing(call) => {
                    if rounds >= self.max_rounds {
                        return Err(Error::FunctionLoopExceeded(self.max_rounds));
                    }
                    rounds += 1;

                    self.check_allowed(&call, &functions, role)?;
                    emit(DispatchEvent::FunctionCall(call.clone()));

                    let output = self.execute(&call, cancel).await?;
                    emit(DispatchEvent::FunctionOutput {
                        name: call.name.clone(),
                        output: output.clone(),
                    });

                    let name = call.name.clone();
                    let produced = [
                        Message::function_call(call),
                        Message::function_result(name, output),
                    ];
                    for message in produced {
                        messages.push(message.clone());
                        added.push(message);
                    }
                    DispatchState::ResultAppended
                }

                DispatchState::ResultAppended => DispatchState::AwaitingModel,

                DispatchState::Done(response) => {
                    debug!("Turn finished after {} function rounds", rounds);
                    added.push(Message::assistant(response.clone()));
                    return Ok(DispatchOutcome {
                        response,
                        messages: added,
                        rounds,
                    });
                }
            };
        }
    }

    /// 호출된 함수가 제공 목록과 역할 범위 안에 있는지 확인
    fn check_allowed(
        &self,
        call: &FunctionCall,
        offered: &[FunctionDef],
        role: &RoleDefinition,
    ) -> Result<()> {
        let allowed = offered.iter().any(|f| f.name == call.name)
            && role.allowed_functions.allows(&call.name)
            && self.registry.contains(&call.name);
        if allowed {
            Ok(())
        } else {
            Err(Error::FunctionNotAllowed {
                name: call.name.clone(),
                role: role.name.clone(),
            })
        }
    }

    async fn execute(&self, call: &FunctionCall, cancel: &CancellationToken) -> Result<String> {
        let function = self.registry.get(&call.name).ok_or_else(|| {
            Error::function_execution(&call.name, "function is not registered")
        })?;
        let arguments = call.parsed_arguments().map_err(|e| {
            Error::function_execution(&call.name, format!("Invalid arguments: {}", e))
        })?;

        info!("Executing function: {}", call.name);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = function.execute(arguments) => result,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn ask_model(
        &self,
        provider: &dyn Provider,
        messages: &[Message],
        functions: &[FunctionDef],
        options: &GenerationOptions,
        streaming: bool,
        cancel: &CancellationToken,
        emit: &(dyn Fn(DispatchEvent) + Sync),
    ) -> Result<ModelReply> {
        if !streaming {
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                response = provider.complete(messages.to_vec(), functions.to_vec(), options.clone()) => response?,
            };
            if response.function_call.is_none() && !response.content.is_empty() {
                emit(DispatchEvent::Text(response.content.clone()));
            }
            return Ok(ModelReply {
                content: response.content,
                function_call: response.function_call,
            });
        }

        let mut stream = provider.stream(messages.to_vec(), functions.to_vec(), options.clone());
        let mut content = String::new();
        let mut function_call = None;

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                event = stream.next() => event,
            };
            match event {
                Some(StreamEvent::Text(text)) => {
                    content.push_str(&text);
                    emit(DispatchEvent::Text(text));
                }
                Some(StreamEvent::FunctionCall(call)) => {
                    function_call = Some(call);
                }
                Some(StreamEvent::Done) => break,
                Some(StreamEvent::Error(e)) => return Err(e.into()),
                None => {
                    return Err(Error::Provider(
                        "stream ended before completion".to_string(),
                    ))
                }
            }
        }

        Ok(ModelReply {
            content,
            function_call,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{Function, EXECUTE_SHELL_COMMAND};
    use crate::role::{RoleResolver, DEFAULT_ROLE, SHELL_ROLE};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use shellforge_foundation::MessageRole;
    use shellforge_provider::{ProviderError, ScriptedProvider, ScriptedReply};
    use std::sync::Arc;

    struct Clock;

    #[async_trait]
    impl Function for Clock {
        fn name(&self) -> &str {
            "clock"
        }

        fn definition(&self) -> FunctionDef {
            FunctionDef::new("clock", "Current time")
        }

        async fn execute(&self, _arguments: Value) -> Result<String> {
            Ok("12:00".to_string())
        }
    }

    fn registry() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        registry.register(Arc::new(Clock));
        registry
    }

    fn request<'a>(role: &'a RoleDefinition, registry: &FunctionRegistry) -> DispatchRequest<'a> {
        DispatchRequest {
            messages: vec![Message::system(role.system_prompt()), Message::user("time?")],
            functions: registry.definitions_for(&role.allowed_functions),
            role,
            options: GenerationOptions::default(),
            streaming: true,
        }
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let roles = RoleResolver::default();
        let role = roles.resolve(DEFAULT_ROLE).unwrap();
        let registry = registry();
        let provider = ScriptedProvider::new([ScriptedReply::text("hello there")]);
        let (tx, mut rx) = mpsc::unbounded_channel::<DispatchEvent>();

        let outcome = FunctionDispatcher::new(&registry)
            .run(&provider, request(role, &registry), &CancellationToken::new(), Some(&tx))
            .await
            .unwrap();

        assert_eq!(outcome.response, "hello there");
        assert_eq!(outcome.rounds, 0);
        assert_eq!(outcome.messages, vec![Message::assistant("hello there")]);

        drop(tx);
        let mut streamed = String::new();
        while let Some(DispatchEvent::Text(t)) = rx.recv().await {
            streamed.push_str(&t);
        }
        assert_eq!(streamed, "hello there");
    }

    #[tokio::test]
    async fn test_function_round_trip() {
        let roles = RoleResolver::default();
        let role = roles.resolve(DEFAULT_ROLE).unwrap();
        let registry = registry();
        let provider = ScriptedProvider::new([
            ScriptedReply::function_call("clock", json!({})),
            ScriptedReply::text("It is noon."),
        ]);

        let outcome = FunctionDispatcher::new(&registry)
            .run::<DispatchEvent>(&provider, request(role, &registry), &CancellationToken::new(), None)
            .await
            .unwrap();

        assert_eq!(outcome.response, "It is noon.");
        assert_eq!(outcome.rounds, 1);
        let roles: Vec<_> = outcome.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::Assistant, MessageRole::Function, MessageRole::Assistant]
        );
        assert_eq!(outcome.messages[1].text(), "12:00");

        // 두 번째 요청에는 함수 결과가 포함됨
        let second = &provider.requests()[1];
        assert_eq!(second.messages.len(), 4);
        assert_eq!(second.functions, vec!["clock"]);
    }

    #[tokio::test]
    async fn test_loop_bound_is_fatal() {
        let roles = RoleResolver::default();
        let role = roles.resolve(DEFAULT_ROLE).unwrap();
        let registry = registry();
        let provider = ScriptedProvider::repeating(ScriptedReply::function_call("clock", json!({})));

        let result = FunctionDispatcher::new(&registry)
            .with_max_rounds(3)
            .run::<DispatchEvent>(&provider, request(role, &registry), &CancellationToken::new(), None)
            .await;

        assert!(matches!(result, Err(Error::FunctionLoopExceeded(3))));
        // 3 rounds executed, the 4th request is refused
        assert_eq!(provider.call_count(), 4);
    }

    #[tokio::test]
    async fn test_disallowed_function_is_fatal() {
        let roles = RoleResolver::default();
        let shell = roles.resolve(SHELL_ROLE).unwrap();
        let registry = FunctionRegistry::with_builtins();
        let provider = ScriptedProvider::new([ScriptedReply::function_call(
            EXECUTE_SHELL_COMMAND,
            json!({"shell_command": "rm -rf /"}),
        )]);

        let result = FunctionDispatcher::new(&registry)
            .run::<DispatchEvent>(&provider, request(shell, &registry), &CancellationToken::new(), None)
            .await;

        assert!(matches!(
            result,
            Err(Error::FunctionNotAllowed { name, role }) if name == EXECUTE_SHELL_COMMAND && role == SHELL_ROLE
        ));
    }

    #[tokio::test]
    async fn test_unknown_function_is_fatal() {
        let roles = RoleResolver::default();
        let role = roles.resolve(DEFAULT_ROLE).unwrap();
        let registry = registry();
        let provider = ScriptedProvider::new([ScriptedReply::function_call("launch", json!({}))]);

        let result = FunctionDispatcher::new(&registry)
            .run::<DispatchEvent>(&provider, request(role, &registry), &CancellationToken::new(), None)
            .await;
        assert!(matches!(result, Err(Error::FunctionNotAllowed { .. })));
    }

    #[tokio::test]
    async fn test_non_streaming() {
        let roles = RoleResolver::default();
        let role = roles.resolve(DEFAULT_ROLE).unwrap();
        let registry = registry();
        let provider = ScriptedProvider::new([
            ScriptedReply::function_call("clock", json!({})),
            ScriptedReply::text("noon"),
        ]);
        let mut req = request(role, &registry);
        req.streaming = false;

        let outcome = FunctionDispatcher::new(&registry)
            .run::<DispatchEvent>(&provider, req, &CancellationToken::new(), None)
            .await
            .unwrap();
        assert_eq!(outcome.response, "noon");
        assert_eq!(outcome.rounds, 1);
    }

    #[tokio::test]
    async fn test_transport_error_surfaces() {
        let roles = RoleResolver::default();
        let role = roles.resolve(DEFAULT_ROLE).unwrap();
        let registry = registry();
        let provider = ScriptedProvider::new([ScriptedReply::Error(ProviderError::Authentication(
            "bad key".to_string(),
        ))]);

        let result = FunctionDispatcher::new(&registry)
            .run::<DispatchEvent>(&provider, request(role, &registry), &CancellationToken::new(), None)
            .await;
        assert!(result.unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn test_interrupted_stream_is_error() {
        let roles = RoleResolver::default();
        let role = roles.resolve(DEFAULT_ROLE).unwrap();
        let registry = registry();
        let provider = ScriptedProvider::new([ScriptedReply::Interrupted("half an ans".to_string())]);

        let result = FunctionDispatcher::new(&registry)
            .run::<DispatchEvent>(&provider, request(role, &registry), &CancellationToken::new(), None)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cancelled() {
        let roles = RoleResolver::default();
        let role = roles.resolve(DEFAULT_ROLE).unwrap();
        let registry = registry();
        let provider = ScriptedProvider::new([ScriptedReply::text("never seen")]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = FunctionDispatcher::new(&registry)
            .run::<DispatchEvent>(&provider, request(role, &registry), &cancel, None)
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
