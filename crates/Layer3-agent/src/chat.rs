//! Chat lifecycle - 어느 세션에 턴을 기록할지 결정
//!
//! 규칙:
//! - chat id 없이 호출: one-shot 역할(`shell`, `code`, `describe-shell`)은
//!   아무것도 기록하지 않고, 그 외 역할은 `default` 세션을 비우고 시작
//! - `--resume`: 가장 최근 세션, 없으면 `default` (비우지 않음)
//! - `last`: 마지막으로 사용한 세션
//! - `auto`: `auto-<8hex>` 임시 ID, 턴 이후 이름 변경
//! - `temp`: 다른 세션으로 옮겨갈 때 비워짐
//!
//! 기록되는 세션은 모두 last-used 기록을 갱신합니다.

use crate::event::AgentEvent;
use crate::naming::temporary_auto_id;
use shellforge_core::RoleDefinition;
use shellforge_foundation::session::{AUTO, DEFAULT, LAST, TEMP};
use shellforge_foundation::{Result, SessionStore};
use tokio::sync::mpsc;
use tracing::debug;

/// Which chat the caller asked for
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChatTarget {
    /// No chat identifier given
    #[default]
    Implicit,
    /// `--chat <id>`, sentinels included
    Named(String),
    /// `--resume`
    Resume,
}

impl ChatTarget {
    pub fn named(id: impl Into<String>) -> Self {
        ChatTarget::Named(id.into())
    }
}

/// Where the turn ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedChat {
    /// Nothing is recorded
    OneShot,
    /// Recorded in `id`; `auto` chats get renamed after the turn
    Persistent { id: String, auto: bool },
}

impl ResolvedChat {
    pub fn id(&self) -> Option<&str> {
        match self {
            ResolvedChat::OneShot => None,
            ResolvedChat::Persistent { id, .. } => Some(id),
        }
    }
}

/// Apply the lifecycle rules and return the session to use
pub fn open_chat(
    sessions: &SessionStore,
    target: &ChatTarget,
    role: &RoleDefinition,
    events: Option<&mpsc::UnboundedSender<AgentEvent>>,
) -> Result<ResolvedChat> {
    let chat = resolve_chat(sessions, target, role, events)?;
    commit_chat(sessions, &chat)?;
    Ok(chat)
}

/// Pick the session for `target` without touching `temp` or the last-used
/// record
///
/// An implicit turn clears `default` here, since its history must be empty
/// before it is loaded.
pub fn resolve_chat(
    sessions: &SessionStore,
    target: &ChatTarget,
    role: &RoleDefinition,
    events: Option<&mpsc::UnboundedSender<AgentEvent>>,
) -> Result<ResolvedChat> {
    let emit = |event: AgentEvent| {
        if let Some(tx) = events {
            let _ = tx.send(event);
        }
    };

    let (id, auto) = match target {
        ChatTarget::Implicit if role.one_shot => {
            debug!("Role {} runs one-shot", role.name);
            return Ok(ResolvedChat::OneShot);
        }
        ChatTarget::Implicit => {
            sessions.reset(DEFAULT)?;
            (DEFAULT.to_string(), false)
        }
        ChatTarget::Resume => match sessions.most_recent()? {
            Some(id) => {
                emit(AgentEvent::ChatResolved {
                    chat_id: id.clone(),
                    resumed: true,
                });
                (id, false)
            }
            None => {
                emit(AgentEvent::ChatResolved {
                    chat_id: DEFAULT.to_string(),
                    resumed: false,
                });
                (DEFAULT.to_string(), false)
            }
        },
        ChatTarget::Named(token) if token == LAST => {
            let id = sessions.resolve_special(LAST)?;
            emit(AgentEvent::ChatResolved {
                chat_id: id.clone(),
                resumed: true,
            });
            (id, false)
        }
        ChatTarget::Named(token) if token == AUTO => (temporary_auto_id(), true),
        ChatTarget::Named(id) => (id.clone(), false),
    };

    Ok(ResolvedChat::Persistent { id, auto })
}

/// Record that the turn goes to `chat`
///
/// Leaving `temp` clears it, and the chat becomes the last-used one.
pub fn commit_chat(sessions: &SessionStore, chat: &ResolvedChat) -> Result<()> {
    let Some(id) = chat.id() else {
        return Ok(());
    };
    // temp는 다른 세션으로 옮겨갈 때만 비움
    if id != TEMP && sessions.last_used()?.as_deref() == Some(TEMP) {
        sessions.reset(TEMP)?;
    }
    sessions.set_last_used(id)
}
