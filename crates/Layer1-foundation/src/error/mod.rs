//! Error types for ShellForge
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// ShellForge 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // NotFound
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("No previous chat session found")]
    NoPreviousChat,

    // ========================================================================
    // 저장소 관련
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Chat session \"{id}\" is corrupt: {message}")]
    CorruptSession { id: String, message: String },

    // ========================================================================
    // Function 호출 관련
    // ========================================================================
    #[error("Function \"{name}\" is not allowed for role \"{role}\"")]
    FunctionNotAllowed { name: String, role: String },

    #[error("Function call loop exceeded {0} rounds")]
    FunctionLoopExceeded(usize),

    #[error("Function execution failed: {name} - {message}")]
    FunctionExecution { name: String, message: String },

    // ========================================================================
    // Provider (transport) 관련
    // ========================================================================
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("API error: {provider} - {message}")]
    Api { provider: String, message: String },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("HTTP error: {0}")]
    Http(String),

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Cancelled")]
    Cancelled,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 원격 호출(transport) 에러인지 확인
    ///
    /// Transport errors are surfaced verbatim and never retried by the core.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Provider(_) | Error::Api { .. } | Error::RateLimited(_) | Error::Http(_)
        )
    }

    /// 사용자 입력/사용법 문제로 인한 에러인지 확인 (CLI exit code 2)
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::RoleNotFound(_)
                | Error::NoPreviousChat
                | Error::InvalidInput(_)
                | Error::Validation(_)
                | Error::FunctionNotAllowed { .. }
                | Error::FunctionLoopExceeded(_)
        )
    }

    /// API 에러 생성 헬퍼
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Corrupt session 에러 생성 헬퍼
    pub fn corrupt_session(id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::CorruptSession {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Function 실행 에러 생성 헬퍼
    pub fn function_execution(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::FunctionExecution {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(Error::api("openai", "boom").is_transport());
        assert!(Error::RateLimited("slow down".into()).is_transport());
        assert!(!Error::NoPreviousChat.is_transport());
    }

    #[test]
    fn test_user_facing_classification() {
        assert!(Error::RoleNotFound("pirate".into()).is_user_facing());
        assert!(Error::FunctionLoopExceeded(8).is_user_facing());
        assert!(!Error::corrupt_session("work", "eof").is_user_facing());
    }

    #[test]
    fn test_display() {
        let err = Error::FunctionNotAllowed {
            name: "rm_rf".into(),
            role: "code".into(),
        };
        assert_eq!(
            err.to_string(),
            "Function \"rm_rf\" is not allowed for role \"code\""
        );
    }
}
