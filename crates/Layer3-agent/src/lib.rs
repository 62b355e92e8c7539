//! # shellforge-agent
//!
//! ShellForge의 Session Controller - 한 번의 호출(또는 REPL 한 줄)을
//! 역할, 세션, 응답 캐시, 함수 호출 루프에 걸쳐 처리합니다.
//!
//! ## 핵심 컴포넌트
//!
//! - **SessionController**: 턴 실행 (캐시 조회 → 모델 → 함수 → 저장)
//! - **ChatTarget / open_chat**: `default`, `temp`, `last`, `auto` 세션 규칙
//! - **naming**: `--chat auto` 세션 이름 생성
//! - **AgentEvent**: 스트리밍 텍스트, 함수 호출, 세션 이벤트
//!
//! ## 사용 예
//!
//! ```ignore
//! use shellforge_agent::{AgentEvent, ChatTarget, SessionController, TurnRequest};
//!
//! let controller = SessionController::from_config(&config, provider)?;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let request = TurnRequest::new("list files", "shell")
//!     .chat(ChatTarget::named("work"))
//!     .options(config.generation_options());
//! let result = controller.run(request, &cancel, Some(&tx)).await?;
//! ```

pub mod chat;
pub mod controller;
pub mod event;
pub mod naming;

pub use chat::{commit_chat, open_chat, resolve_chat, ChatTarget, ResolvedChat};
pub use controller::{SessionController, TurnRequest, TurnResult};
pub use event::AgentEvent;
pub use naming::{generate_chat_name, sanitize_chat_name, CHAT_NAME_MAX_LEN};
