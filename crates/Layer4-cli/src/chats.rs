//! Chat session display - `--list-chats`, `--show-chat`, `--complete-chat-id`

use chrono::Local;
use shellforge_foundation::session::LAST;
use shellforge_foundation::{Message, Result, SessionInfo, SessionStore};

/// `name  YYYY-MM-DD HH:MM` rows, oldest first
pub fn format_chat_list(sessions: &[SessionInfo]) -> Vec<String> {
    let width = sessions.iter().map(|s| s.id.len()).max().unwrap_or(0);
    sessions
        .iter()
        .rev()
        .map(|s| {
            let modified = s.last_modified.with_timezone(&Local);
            format!("{:<width$}  {}", s.id, modified.format("%Y-%m-%d %H:%M"), width = width)
        })
        .collect()
}

pub fn list_chats(store: &SessionStore) -> Result<()> {
    let sessions = store.list()?;
    if sessions.is_empty() {
        println!("No chat sessions found.");
        return Ok(());
    }
    for row in format_chat_list(&sessions) {
        println!("{}", row);
    }
    Ok(())
}

/// `role: content` per message
pub fn format_messages(messages: &[Message]) -> Vec<String> {
    messages
        .iter()
        .map(|m| match &m.function_call {
            Some(call) => format!("{}: @FunctionCall {}({})", m.role, call.name, call.arguments),
            None => format!("{}: {}", m.role, m.text()),
        })
        .collect()
}

pub fn show_chat(store: &SessionStore, token: &str) -> Result<()> {
    let id = store.resolve_special(token)?;
    let messages = store.load(&id)?;
    if messages.is_empty() {
        println!("No messages in this chat session.");
        return Ok(());
    }
    if token == LAST {
        eprintln!("[ {} ]", id);
    }
    for line in format_messages(&messages) {
        println!("{}", line);
    }
    Ok(())
}

pub fn complete_chat_id(store: &SessionStore, prefix: &str) {
    for name in store.complete_chat_id(prefix) {
        println!("{}", name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shellforge_foundation::FunctionCall;

    #[test]
    fn test_format_chat_list_oldest_first() {
        let newer = SessionInfo {
            id: "docker-cleanup".to_string(),
            last_modified: Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap(),
            message_count: 3,
        };
        let older = SessionInfo {
            id: "ops".to_string(),
            last_modified: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            message_count: 5,
        };

        let rows = format_chat_list(&[newer, older]);
        assert!(rows[0].starts_with("ops "));
        assert!(rows[1].starts_with("docker-cleanup  2026-03-0"));
    }

    #[test]
    fn test_format_messages() {
        let messages = vec![
            Message::system("You are ShellForge"),
            Message::user("time?"),
            Message::function_call(FunctionCall::new("clock", "{}")),
            Message::function_result("clock", "12:00"),
        ];
        assert_eq!(
            format_messages(&messages),
            vec![
                "system: You are ShellForge",
                "user: time?",
                "assistant: @FunctionCall clock({})",
                "function: 12:00",
            ]
        );
    }
}
