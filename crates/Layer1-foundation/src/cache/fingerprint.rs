//! Fingerprint - 요청 단위 캐시 키
//!
//! (history, prompt, role, options, functions)를 정규화된 JSON으로 직렬화한 뒤
//! SHA-256 전체(64 hex)를 키로 사용합니다. 잘라내지 않습니다.

use crate::core::{GenerationOptions, Message};
use crate::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Bumped whenever the canonical layout below changes
const FINGERPRINT_VERSION: u8 = 1;

/// Hex length of a SHA-256 digest
pub const FINGERPRINT_LEN: usize = 64;

/// Opaque fixed-length cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parse a previously rendered key. Returns `None` unless it is 64 lowercase hex chars.
    pub fn from_hex(s: &str) -> Option<Self> {
        let valid = s.len() == FINGERPRINT_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct CanonicalRequest<'a> {
    version: u8,
    role: &'a str,
    options: &'a GenerationOptions,
    functions: Vec<&'a str>,
    history: &'a [Message],
    prompt: &'a str,
}

/// Compute the cache key for one request
///
/// `functions` is the set of function names offered to the model; its order
/// does not matter. History order does.
pub fn fingerprint(
    history: &[Message],
    prompt: &str,
    role: &str,
    options: &GenerationOptions,
    functions: &[&str],
) -> Result<Fingerprint> {
    let mut functions: Vec<&str> = functions.to_vec();
    functions.sort_unstable();
    functions.dedup();

    let canonical = CanonicalRequest {
        version: FINGERPRINT_VERSION,
        role,
        options,
        functions,
        history,
        prompt,
    };

    let bytes = serde_json::to_vec(&canonical)?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(Fingerprint(hex::encode(hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FunctionCall;

    fn history() -> Vec<Message> {
        vec![
            Message::system("You are Shell Command Generator"),
            Message::user("list files"),
            Message::assistant("ls"),
        ]
    }

    #[test]
    fn test_deterministic() {
        let opts = GenerationOptions::default();
        let a = fingerprint(&history(), "sort them", "shell", &opts, &[]).unwrap();
        let b = fingerprint(&history(), "sort them", "shell", &opts, &[]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), FINGERPRINT_LEN);
    }

    #[test]
    fn test_each_component_changes_key() {
        let opts = GenerationOptions::default();
        let base = fingerprint(&history(), "p", "shell", &opts, &[]).unwrap();

        assert_ne!(base, fingerprint(&history(), "q", "shell", &opts, &[]).unwrap());
        assert_ne!(base, fingerprint(&history(), "p", "code", &opts, &[]).unwrap());
        assert_ne!(base, fingerprint(&[], "p", "shell", &opts, &[]).unwrap());
        assert_ne!(
            base,
            fingerprint(&history(), "p", "shell", &opts.clone().temperature(0.1), &[]).unwrap()
        );
        assert_ne!(
            base,
            fingerprint(&history(), "p", "shell", &opts.clone().max_tokens(10), &[]).unwrap()
        );
        assert_ne!(
            base,
            fingerprint(&history(), "p", "shell", &opts.clone().model("other"), &[]).unwrap()
        );
        assert_ne!(
            base,
            fingerprint(&history(), "p", "shell", &opts, &["execute_shell_command"]).unwrap()
        );
    }

    #[test]
    fn test_history_order_matters() {
        let opts = GenerationOptions::default();
        let mut reversed = history();
        reversed.swap(1, 2);
        assert_ne!(
            fingerprint(&history(), "p", "default", &opts, &[]).unwrap(),
            fingerprint(&reversed, "p", "default", &opts, &[]).unwrap()
        );
    }

    #[test]
    fn test_function_order_does_not_matter() {
        let opts = GenerationOptions::default();
        assert_eq!(
            fingerprint(&[], "p", "default", &opts, &["a", "b"]).unwrap(),
            fingerprint(&[], "p", "default", &opts, &["b", "a"]).unwrap()
        );
    }

    #[test]
    fn test_function_call_history() {
        let opts = GenerationOptions::default();
        let mut with_call = history();
        with_call.push(Message::function_call(FunctionCall::new(
            "execute_shell_command",
            r#"{"shell_command": "ls"}"#,
        )));
        let key = fingerprint(&with_call, "p", "default", &opts, &["execute_shell_command"]).unwrap();
        assert_ne!(
            key,
            fingerprint(&history(), "p", "default", &opts, &["execute_shell_command"]).unwrap()
        );
    }

    #[test]
    fn test_from_hex() {
        let key = fingerprint(&[], "p", "default", &GenerationOptions::default(), &[]).unwrap();
        assert_eq!(Fingerprint::from_hex(key.as_str()), Some(key));
        assert!(Fingerprint::from_hex("abc").is_none());
        assert!(Fingerprint::from_hex(&"Z".repeat(FINGERPRINT_LEN)).is_none());
    }
}
