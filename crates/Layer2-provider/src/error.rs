//! Provider-specific error types
//!
//! ProviderError는 원격 생성기 호출의 세부 에러를 관리합니다.
//! 코어는 이 에러를 재시도하지 않고 그대로 호출자에게 전달합니다.

use shellforge_foundation::Error as FoundationError;
use thiserror::Error;

/// Failure of a single generator request
///
/// HTTP status, wire format and stream problems all end up here. The
/// Controller sees these as transport errors after conversion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// 401 / 403
    #[error("Generator rejected the API key: {0}")]
    Authentication(String),

    /// 429 without a quota message
    #[error("Generator is rate limiting requests{}", .retry_after_ms.map(|ms| format!(" (retry in {}ms)", ms)).unwrap_or_default())]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Conversation is too long for the model: {0}")]
    ContextLengthExceeded(String),

    #[error("Response blocked by content filter: {0}")]
    ContentFiltered(String),

    /// 5xx
    #[error("Generator failed ({0})")]
    ServerError(String),

    /// Connection, DNS or timeout; nothing reached the generator
    #[error("Could not reach generator: {0}")]
    Network(String),

    /// 400 that is not about context length
    #[error("Generator refused the request: {0}")]
    InvalidRequest(String),

    /// Body or chunk that does not parse as a completion
    #[error("Malformed generator response: {0}")]
    InvalidResponse(String),

    /// 404, usually a wrong `--model`
    #[error("Unknown model: {0}")]
    ModelNotFound(String),

    #[error("API quota used up: {0}")]
    QuotaExceeded(String),

    /// SSE read failure, or a stream that ended before `[DONE]`
    #[error("Response stream broke off: {0}")]
    StreamError(String),

    /// Missing key or endpoint
    #[error("Generator is not configured: {0}")]
    NotConfigured(String),

    #[error("Unexpected generator failure: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Classify a non-2xx reply
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let body_text = body.to_string();
        match status {
            401 | 403 => Self::Authentication(body_text),
            429 if body.contains("insufficient_quota") => Self::QuotaExceeded(body_text),
            429 => Self::RateLimited {
                retry_after_ms: extract_retry_after(body),
            },
            400 if body.contains("context") || body.contains("too long") => {
                Self::ContextLengthExceeded(body_text)
            }
            400 | 422 => Self::InvalidRequest(body_text),
            404 => Self::ModelNotFound(body_text),
            500..=599 => Self::ServerError(format!("HTTP {}: {}", status, body)),
            _ => Self::Unknown(format!("HTTP {}: {}", status, body)),
        }
    }
}

/// Try to extract retry-after value from error body (in milliseconds)
fn extract_retry_after(body: &str) -> Option<u64> {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(secs) = json
            .get("error")
            .and_then(|e| e.get("retry_after"))
            .and_then(|v| v.as_f64())
        {
            return Some((secs * 1000.0) as u64);
        }
    }

    let idx = body.find("retry")?;
    let num_str: String = body[idx..]
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    num_str.parse::<f64>().ok().map(|secs| (secs * 1000.0) as u64)
}

// ============================================================================
// shellforge_foundation::Error 변환
// ============================================================================

const PROVIDER_LABEL: &str = "llm";

impl From<ProviderError> for FoundationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited { retry_after_ms } => FoundationError::RateLimited(
                retry_after_ms
                    .map(|ms| format!("Retry after {}ms", ms))
                    .unwrap_or_else(|| "Rate limited".to_string()),
            ),
            ProviderError::QuotaExceeded(msg) => FoundationError::RateLimited(msg),
            ProviderError::Network(msg) => FoundationError::Http(msg),
            ProviderError::NotConfigured(msg) => FoundationError::Config(msg),
            err @ (ProviderError::StreamError(_) | ProviderError::InvalidResponse(_)) => {
                FoundationError::Provider(err.to_string())
            }
            ProviderError::Unknown(msg) => FoundationError::Provider(msg),
            other @ (ProviderError::Authentication(_)
            | ProviderError::ContextLengthExceeded(_)
            | ProviderError::ContentFiltered(_)
            | ProviderError::ServerError(_)
            | ProviderError::InvalidRequest(_)
            | ProviderError::ModelNotFound(_)) => {
                FoundationError::api(PROVIDER_LABEL, other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        assert!(matches!(
            ProviderError::from_http_status(401, "bad key"),
            ProviderError::Authentication(_)
        ));
        assert!(matches!(
            ProviderError::from_http_status(503, "down"),
            ProviderError::ServerError(_)
        ));
        assert!(matches!(
            ProviderError::from_http_status(400, "maximum context length"),
            ProviderError::ContextLengthExceeded(_)
        ));
    }

    #[test]
    fn test_quota_is_not_rate_limit() {
        let body = r#"{"error": {"code": "insufficient_quota"}}"#;
        assert!(matches!(
            ProviderError::from_http_status(429, body),
            ProviderError::QuotaExceeded(_)
        ));
    }

    #[test]
    fn test_retry_after_from_json() {
        let body = r#"{"error": {"message": "slow down", "retry_after": 1.5}}"#;
        assert_eq!(
            ProviderError::from_http_status(429, body),
            ProviderError::RateLimited {
                retry_after_ms: Some(1500)
            }
        );
    }

    #[test]
    fn test_conversion_keeps_transport_class() {
        let err: FoundationError = ProviderError::Authentication("bad key".into()).into();
        assert!(err.is_transport());
        assert!(err.to_string().contains("bad key"));

        let err: FoundationError = ProviderError::Network("reset".into()).into();
        assert!(err.is_transport());
    }
}
