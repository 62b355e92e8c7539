//! Chat naming for `--chat auto`
//!
//! 세션은 먼저 `auto-<8hex>` 임시 ID로 기록되고, 턴이 끝나면 모델에게 짧은
//! 이름을 물어 바꿉니다. 이름 생성이 실패해도 턴은 실패하지 않습니다.

use regex::Regex;
use shellforge_foundation::{GenerationOptions, Message};
use shellforge_provider::Provider;
use std::sync::OnceLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// 이름 최대 길이
pub const CHAT_NAME_MAX_LEN: usize = 50;

/// 이름 요청에 포함하는 프롬프트 최대 길이 (문자 수)
const PROMPT_EXCERPT_LEN: usize = 500;

/// `name_from_prompt`에 쓰는 단어 수
const PROMPT_NAME_WORDS: usize = 5;

const NAMING_MAX_TOKENS: u32 = 100;
const NAMING_TEMPERATURE: f64 = 0.35;

fn disallowed_chars() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9\-]").ok()).as_ref()
}

fn dash_runs() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-+").ok()).as_ref()
}

/// Temporary identifier an `auto` chat is written under
pub fn temporary_auto_id() -> String {
    format!("auto-{}", short_hex())
}

/// Name used when the model gives nothing usable
pub fn fallback_chat_name() -> String {
    format!("chat-{}", short_hex())
}

fn short_hex() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// The request sent to the model
pub fn naming_prompt(prompt: &str) -> String {
    let excerpt: String = prompt.chars().take(PROMPT_EXCERPT_LEN).collect();
    format!(
        "Based on the following user message, generate a very short descriptive name \
         (2-5 words, max 50 characters) for this chat session. \
         Use only lowercase English letters, numbers, and hyphens. \
         No spaces, no special characters. Output ONLY the name, nothing else.\n\n\
         User message: {}",
        excerpt
    )
}

/// Reduce model output to `[a-z0-9-]`, at most 50 chars
///
/// Returns `None` when nothing usable is left.
pub fn sanitize_chat_name(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    let replaced = match disallowed_chars() {
        Some(re) => re.replace_all(&lowered, "-").into_owned(),
        None => lowered,
    };
    let collapsed = match dash_runs() {
        Some(re) => re.replace_all(&replaced, "-").into_owned(),
        None => replaced,
    };

    // 모두 ASCII이므로 바이트 단위로 잘라도 안전
    let mut name = collapsed.trim_matches('-').to_string();
    name.truncate(CHAT_NAME_MAX_LEN);
    (!name.is_empty()).then_some(name)
}

/// Name built from the first words of the prompt, without a model call
pub fn name_from_prompt(prompt: &str) -> String {
    let words = prompt
        .split_whitespace()
        .take(PROMPT_NAME_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    sanitize_chat_name(&words).unwrap_or_else(fallback_chat_name)
}

/// Ask the model for a chat name, falling back to `chat-<8hex>`
pub async fn generate_chat_name(provider: &dyn Provider, prompt: &str, model: &str) -> String {
    let options = GenerationOptions::default()
        .model(model)
        .temperature(NAMING_TEMPERATURE)
        .max_tokens(NAMING_MAX_TOKENS);
    let messages = vec![Message::user(naming_prompt(prompt))];

    match provider.complete(messages, Vec::new(), options).await {
        Ok(response) => match sanitize_chat_name(&response.content) {
            Some(name) => {
                debug!("Generated chat name: {}", name);
                name
            }
            None => fallback_chat_name(),
        },
        Err(e) => {
            warn!("Chat name generation failed: {}", e);
            fallback_chat_name()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellforge_provider::{ProviderError, ScriptedProvider, ScriptedReply};

    #[test]
    fn test_name_from_prompt() {
        assert_eq!(
            name_from_prompt("How do I free Docker disk space quickly?"),
            "how-do-i-free-docker"
        );
        assert!(name_from_prompt("???").starts_with("chat-"));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(
            sanitize_chat_name("  Docker Cleanup Tips!\n").as_deref(),
            Some("docker-cleanup-tips")
        );
        assert_eq!(
            sanitize_chat_name("--rust__async--").as_deref(),
            Some("rust-async")
        );
        assert_eq!(sanitize_chat_name("한글만").as_deref(), None);
        assert_eq!(sanitize_chat_name("").as_deref(), None);

        let long = "a".repeat(80);
        assert_eq!(sanitize_chat_name(&long).unwrap().len(), CHAT_NAME_MAX_LEN);
    }

    #[test]
    fn test_generated_ids() {
        let id = temporary_auto_id();
        assert!(id.starts_with("auto-"));
        assert_eq!(id.len(), "auto-".len() + 8);

        let name = fallback_chat_name();
        assert!(name.starts_with("chat-"));
        assert_eq!(name.len(), "chat-".len() + 8);
    }

    #[test]
    fn test_naming_prompt_cuts_long_input() {
        let prompt = "x".repeat(2000);
        let request = naming_prompt(&prompt);
        assert!(request.ends_with(&"x".repeat(PROMPT_EXCERPT_LEN)));
        assert!(!request.contains(&"x".repeat(PROMPT_EXCERPT_LEN + 1)));
    }

    #[tokio::test]
    async fn test_generate_chat_name() {
        let provider = ScriptedProvider::new([ScriptedReply::text("Find Large Files")]);
        let name = generate_chat_name(&provider, "how do I find large files?", "gpt-4o-mini").await;
        assert_eq!(name, "find-large-files");

        let request = &provider.requests()[0];
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.options.max_tokens, NAMING_MAX_TOKENS);
        assert_eq!(request.options.model, "gpt-4o-mini");
        assert!(request.functions.is_empty());
    }

    #[tokio::test]
    async fn test_generate_chat_name_falls_back() {
        let provider = ScriptedProvider::new([ScriptedReply::Error(ProviderError::Network(
            "offline".to_string(),
        ))]);
        let name = generate_chat_name(&provider, "hi", "gpt-4o-mini").await;
        assert!(name.starts_with("chat-"));
    }
}
