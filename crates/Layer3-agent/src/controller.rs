//! Session Controller - 한 턴의 전체 흐름
//!
//! ```text
//! resolve role → resolve chat → load history → pin role → commit chat
//!   → fingerprint → cache get
//!       hit:  record turn (unless already last) → return
//!       miss: dispatcher loop → append session → cache put → return
//!   → auto chat rename
//! ```
//!
//! 실패하거나 취소된 턴은 세션과 캐시에 아무것도 남기지 않습니다.

use crate::chat::{commit_chat, resolve_chat, ChatTarget, ResolvedChat};
use crate::event::AgentEvent;
use crate::naming::{generate_chat_name, name_from_prompt};
use shellforge_core::{
    DispatchRequest, FunctionDispatcher, FunctionRegistry, RoleDefinition, RoleResolver,
    DEFAULT_MAX_ROUNDS, DEFAULT_ROLE,
};
use shellforge_foundation::{
    fingerprint, Error, GenerationOptions, Message, MessageRole, ResponseCache, Result,
    SessionStore, ShellforgeConfig,
};
use shellforge_provider::Provider;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One invocation's worth of input
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub prompt: String,
    /// Role name; `default` adopts the role of a resumed chat
    pub role: String,
    pub chat: ChatTarget,
    pub options: GenerationOptions,
    pub use_cache: bool,
    pub use_functions: bool,
    pub streaming: bool,
}

impl TurnRequest {
    pub fn new(prompt: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            role: role.into(),
            chat: ChatTarget::Implicit,
            options: GenerationOptions::default(),
            use_cache: true,
            use_functions: true,
            streaming: true,
        }
    }

    pub fn chat(mut self, chat: ChatTarget) -> Self {
        self.chat = chat;
        self
    }

    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn use_functions(mut self, use_functions: bool) -> Self {
        self.use_functions = use_functions;
        self
    }

    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }
}

/// What a finished turn produced
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    pub response: String,
    /// Session the turn was recorded in (`None` for one-shot turns)
    pub chat_id: Option<String>,
    /// Effective role, after chat role pinning
    pub role: String,
    /// Served from the response cache
    pub cached: bool,
    /// Functions executed during the turn
    pub function_rounds: usize,
}

/// Session Controller
pub struct SessionController {
    provider: Arc<dyn Provider>,
    sessions: SessionStore,
    cache: ResponseCache,
    roles: RoleResolver,
    functions: FunctionRegistry,
    max_function_rounds: usize,
}

impl SessionController {
    pub fn new(
        provider: Arc<dyn Provider>,
        sessions: SessionStore,
        cache: ResponseCache,
        roles: RoleResolver,
        functions: FunctionRegistry,
    ) -> Self {
        Self {
            provider,
            sessions,
            cache,
            roles,
            functions,
            max_function_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Stores, roles and functions from configuration
    pub fn from_config(config: &ShellforgeConfig, provider: Arc<dyn Provider>) -> Result<Self> {
        let sessions = SessionStore::new(config.chat_cache_path.clone(), config.chat_cache_length);
        let cache = ResponseCache::new(config.cache_path.clone(), config.cache_length);
        let roles = RoleResolver::load(&config.roles_path)?;

        let mut functions = FunctionRegistry::with_builtins();
        let loaded = functions.load_manifests(&config.functions_path)?;
        debug!("Loaded {} function manifests", loaded);

        Ok(Self::new(provider, sessions, cache, roles, functions)
            .with_max_function_rounds(config.max_function_rounds))
    }

    pub fn with_max_function_rounds(mut self, max: usize) -> Self {
        self.max_function_rounds = max;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn roles(&self) -> &RoleResolver {
        &self.roles
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Run one turn
    pub async fn run(
        &self,
        request: TurnRequest,
        cancel: &CancellationToken,
        events: Option<&mpsc::UnboundedSender<AgentEvent>>,
    ) -> Result<TurnResult> {
        let emit = |event: AgentEvent| {
            if let Some(tx) = events {
                let _ = tx.send(event);
            }
        };

        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return Err(Error::InvalidInput("Prompt cannot be empty".to_string()));
        }

        let requested = self.roles.resolve(&request.role)?;
        let chat = resolve_chat(&self.sessions, &request.chat, requested, events)?;

        let history = match chat.id() {
            Some(id) => self.sessions.load(id)?,
            None => Vec::new(),
        };
        let role = match chat.id() {
            Some(id) if !history.is_empty() => self.pin_role(id, requested, &history)?,
            _ => requested,
        };
        // 역할 검사를 통과한 뒤에만 temp/last-used 갱신
        commit_chat(&self.sessions, &chat)?;

        let offered = if request.use_functions {
            self.functions.definitions_for(&role.allowed_functions)
        } else {
            Vec::new()
        };
        let offered_names: Vec<&str> = offered.iter().map(|f| f.name.as_str()).collect();
        let key = fingerprint(&history, prompt, &role.name, &request.options, &offered_names)?;

        // 새 세션이면 system 메시지부터 기록
        let mut turn = Vec::new();
        if history.is_empty() {
            turn.push(Message::system(role.system_prompt()));
        }
        turn.push(Message::user(prompt));

        if request.use_cache {
            if let Some(response) = self.cache.get(&key) {
                debug!("Cache hit: {}", key);
                emit(AgentEvent::CacheHit);
                emit(AgentEvent::Text(response.clone()));

                if let Some(id) = chat.id() {
                    if ends_with_turn(&history, prompt, &response) {
                        debug!("Turn already recorded in {}", id);
                    } else {
                        turn.push(Message::assistant(response.clone()));
                        self.sessions.append(id, turn)?;
                    }
                }

                let chat_id = self
                    .finish_chat(&chat, prompt, &request.options, true, &emit)
                    .await?;
                return Ok(TurnResult {
                    response,
                    chat_id,
                    role: role.name.clone(),
                    cached: true,
                    function_rounds: 0,
                });
            }
            debug!("Cache miss: {}", key);
        }

        let mut messages = history;
        messages.extend(turn.iter().cloned());

        let outcome = FunctionDispatcher::new(&self.functions)
            .with_max_rounds(self.max_function_rounds)
            .run(
                self.provider.as_ref(),
                DispatchRequest {
                    messages,
                    functions: offered,
                    role,
                    options: request.options.clone(),
                    streaming: request.streaming,
                },
                cancel,
                events,
            )
            .await?;

        if let Some(id) = chat.id() {
            turn.extend(outcome.messages.iter().cloned());
            self.sessions.append(id, turn)?;
        }

        // 함수 결과는 실행 시점의 상태에 의존하므로 캐시하지 않음
        if request.use_cache && outcome.rounds == 0 {
            if let Err(e) = self.cache.put(&key, &outcome.response) {
                warn!("Failed to write response cache: {}", e);
            }
        }

        let chat_id = self
            .finish_chat(&chat, prompt, &request.options, false, &emit)
            .await?;
        info!(
            "Turn complete (role: {}, chat: {}, function rounds: {})",
            role.name,
            chat_id.as_deref().unwrap_or("-"),
            outcome.rounds
        );

        Ok(TurnResult {
            response: outcome.response,
            chat_id,
            role: role.name.clone(),
            cached: false,
            function_rounds: outcome.rounds,
        })
    }

    /// Keep the role a chat was started with
    ///
    /// `default` adopts the chat's role; any other role must match it.
    fn pin_role<'r>(
        &'r self,
        chat_id: &str,
        requested: &'r RoleDefinition,
        history: &[Message],
    ) -> Result<&'r RoleDefinition> {
        let Some(chat_role) = self.roles.role_of_session(history) else {
            return Err(Error::Validation(format!(
                "Could not determine chat role of \"{}\"",
                chat_id
            )));
        };

        if requested.name == DEFAULT_ROLE || requested.name == chat_role.name {
            Ok(chat_role)
        } else {
            Err(Error::Validation(format!(
                "Cannot change chat role to \"{}\" since it was initiated as \"{}\" chat",
                requested.name, chat_role.name
            )))
        }
    }

    /// Rename `auto` chats, returning the final chat id
    ///
    /// Cached turns name the chat from the prompt so the generator is never
    /// called on a hit.
    async fn finish_chat(
        &self,
        chat: &ResolvedChat,
        prompt: &str,
        options: &GenerationOptions,
        cached: bool,
        emit: &(dyn Fn(AgentEvent) + Sync),
    ) -> Result<Option<String>> {
        match chat {
            ResolvedChat::OneShot => Ok(None),
            ResolvedChat::Persistent { id, auto: false } => Ok(Some(id.clone())),
            ResolvedChat::Persistent { id, auto: true } => {
                let name = if cached {
                    name_from_prompt(prompt)
                } else {
                    generate_chat_name(self.provider.as_ref(), prompt, &options.model).await
                };
                let final_id = self.sessions.rename(id, &name)?;
                emit(AgentEvent::ChatRenamed {
                    from: id.clone(),
                    to: final_id.clone(),
                });
                Ok(Some(final_id))
            }
        }
    }
}

/// Whether the session already ends with this exact exchange
fn ends_with_turn(history: &[Message], prompt: &str, response: &str) -> bool {
    match history {
        [.., user, assistant] => {
            user.role == MessageRole::User
                && user.text() == prompt
                && assistant.role == MessageRole::Assistant
                && assistant.function_call.is_none()
                && assistant.text() == response
        }
        _ => false,
    }
}
