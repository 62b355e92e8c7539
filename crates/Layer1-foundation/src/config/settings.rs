//! ShellForge Config - 통합 설정
//!
//! 우선순위: 환경 변수 > `config.json` > 기본값

use crate::core::GenerationOptions;
use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 설정 파일명
pub const SHELLFORGE_CONFIG_FILE: &str = "config.json";

/// 환경 변수 접두사
pub const ENV_PREFIX: &str = "SHELLFORGE_";

/// ShellForge 통합 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellforgeConfig {
    /// OpenAI 호환 API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// API 키
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// 기본 모델
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_top_p")]
    pub top_p: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// 요청 타임아웃 (초)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// 응답 캐시 최대 항목 수
    #[serde(default = "default_cache_length")]
    pub cache_length: usize,

    /// 응답 캐시 디렉토리
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// 세션당 보관할 최대 메시지 수 (system 메시지 제외)
    #[serde(default = "default_chat_cache_length")]
    pub chat_cache_length: usize,

    /// 세션 디렉토리
    #[serde(default = "default_chat_cache_path")]
    pub chat_cache_path: PathBuf,

    /// 사용자 정의 역할 디렉토리
    #[serde(default = "default_roles_path")]
    pub roles_path: PathBuf,

    /// 사용자 정의 함수 디렉토리
    #[serde(default = "default_functions_path")]
    pub functions_path: PathBuf,

    /// Function calling 사용 여부
    #[serde(default = "default_true")]
    pub use_functions: bool,

    /// 함수 실행 결과를 출력에 포함
    #[serde(default)]
    pub show_functions_output: bool,

    /// 한 턴에서 허용하는 최대 function call 횟수
    #[serde(default = "default_max_function_rounds")]
    pub max_function_rounds: usize,

    /// 스트리밍 비활성화
    #[serde(default)]
    pub disable_streaming: bool,

    /// Shell 인터랙션의 기본 선택을 Execute로
    #[serde(default)]
    pub default_execute_shell_cmd: bool,

    /// `--shell` 응답 후 [E]xecute/[M]odify/... 프롬프트 표시
    #[serde(default = "default_true")]
    pub shell_interaction: bool,
}

impl Default for ShellforgeConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_key: None,
            default_model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            request_timeout: default_request_timeout(),
            cache_length: default_cache_length(),
            cache_path: default_cache_path(),
            chat_cache_length: default_chat_cache_length(),
            chat_cache_path: default_chat_cache_path(),
            roles_path: default_roles_path(),
            functions_path: default_functions_path(),
            use_functions: true,
            show_functions_output: false,
            max_function_rounds: default_max_function_rounds(),
            disable_streaming: false,
            default_execute_shell_cmd: false,
            shell_interaction: true,
        }
    }
}

impl ShellforgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 설정 파일 + 환경 변수
    pub fn load() -> Result<Self> {
        let mut config = match JsonStore::global() {
            Ok(store) => Self::load_from(&store)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// 특정 저장소에서 로드 (파일이 없으면 기본값)
    pub fn load_from(store: &JsonStore) -> Result<Self> {
        Ok(store
            .load_optional::<ShellforgeConfig>(SHELLFORGE_CONFIG_FILE)?
            .unwrap_or_default())
    }

    /// 글로벌 설정 저장
    pub fn save_global(&self) -> Result<()> {
        JsonStore::global()?.save(SHELLFORGE_CONFIG_FILE, self)
    }

    // ========================================================================
    // Environment overrides
    // ========================================================================

    /// 환경 변수 값을 덮어쓴다. 파싱할 수 없는 값은 무시하고 경고를 남긴다.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(v) = get("API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = get("API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = get("MODEL") {
            self.default_model = v;
        }
        if let Some(v) = get("CACHE_PATH") {
            self.cache_path = PathBuf::from(v);
        }
        if let Some(v) = get("CHAT_CACHE_PATH") {
            self.chat_cache_path = PathBuf::from(v);
        }
        if let Some(v) = get("ROLES_PATH") {
            self.roles_path = PathBuf::from(v);
        }
        if let Some(v) = get("FUNCTIONS_PATH") {
            self.functions_path = PathBuf::from(v);
        }

        parse_into(get("TEMPERATURE"), "TEMPERATURE", &mut self.temperature);
        parse_into(get("TOP_P"), "TOP_P", &mut self.top_p);
        parse_into(get("MAX_TOKENS"), "MAX_TOKENS", &mut self.max_tokens);
        parse_into(get("REQUEST_TIMEOUT"), "REQUEST_TIMEOUT", &mut self.request_timeout);
        parse_into(get("CACHE_LENGTH"), "CACHE_LENGTH", &mut self.cache_length);
        parse_into(
            get("CHAT_CACHE_LENGTH"),
            "CHAT_CACHE_LENGTH",
            &mut self.chat_cache_length,
        );
        parse_into(
            get("MAX_FUNCTION_ROUNDS"),
            "MAX_FUNCTION_ROUNDS",
            &mut self.max_function_rounds,
        );

        parse_flag(get("USE_FUNCTIONS"), &mut self.use_functions);
        parse_flag(get("SHOW_FUNCTIONS_OUTPUT"), &mut self.show_functions_output);
        parse_flag(get("DISABLE_STREAMING"), &mut self.disable_streaming);
        parse_flag(
            get("DEFAULT_EXECUTE_SHELL_CMD"),
            &mut self.default_execute_shell_cmd,
        );
        parse_flag(get("SHELL_INTERACTION"), &mut self.shell_interaction);
    }

    /// 설정 기반 기본 생성 옵션
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.default_model.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        }
    }
}

fn parse_into<T: std::str::FromStr>(value: Option<String>, name: &str, target: &mut T) {
    if let Some(raw) = value {
        match raw.trim().parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!("Ignoring invalid {}{}={:?}", ENV_PREFIX, name, raw),
        }
    }
}

fn parse_flag(value: Option<String>, target: &mut bool) {
    if let Some(raw) = value {
        *target = matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes");
    }
}

// ============================================================================
// Defaults
// ============================================================================

fn default_true() -> bool {
    true
}

fn default_api_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    GenerationOptions::default().model
}

fn default_temperature() -> f64 {
    0.0
}

fn default_top_p() -> f64 {
    1.0
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_request_timeout() -> u64 {
    60
}

fn default_cache_length() -> usize {
    100
}

fn default_chat_cache_length() -> usize {
    100
}

fn default_max_function_rounds() -> usize {
    8
}

fn cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("shellforge")
}

fn config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shellforge")
}

fn default_cache_path() -> PathBuf {
    cache_root().join("cache")
}

fn default_chat_cache_path() -> PathBuf {
    cache_root().join("chat_cache")
}

fn default_roles_path() -> PathBuf {
    config_root().join("roles")
}

fn default_functions_path() -> PathBuf {
    config_root().join("functions")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = ShellforgeConfig::default();
        assert_eq!(config.cache_length, 100);
        assert_eq!(config.chat_cache_length, 100);
        assert_eq!(config.max_function_rounds, 8);
        assert!(config.shell_interaction);
        assert!(config.cache_path.ends_with("cache"));
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("SHELLFORGE_MODEL", "gpt-4o"),
            ("SHELLFORGE_CACHE_LENGTH", "5"),
            ("SHELLFORGE_DISABLE_STREAMING", "true"),
            ("SHELLFORGE_CHAT_CACHE_PATH", "/tmp/chats"),
        ]);
        let mut config = ShellforgeConfig::default();
        config.apply_env(|k| vars.get(k).cloned());

        assert_eq!(config.default_model, "gpt-4o");
        assert_eq!(config.cache_length, 5);
        assert!(config.disable_streaming);
        assert_eq!(config.chat_cache_path, PathBuf::from("/tmp/chats"));
    }

    #[test]
    fn test_invalid_env_value_is_ignored() {
        let vars = env(&[("SHELLFORGE_TEMPERATURE", "hot")]);
        let mut config = ShellforgeConfig::default();
        config.apply_env(|k| vars.get(k).cloned());
        assert_eq!(config.temperature, 0.0);
    }

    #[test]
    fn test_load_from_partial_file() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(temp.path());
        std::fs::write(
            store.file_path(SHELLFORGE_CONFIG_FILE),
            r#"{"defaultModel": "local-llama", "cacheLength": 10}"#,
        )
        .unwrap();

        let config = ShellforgeConfig::load_from(&store).unwrap();
        assert_eq!(config.default_model, "local-llama");
        assert_eq!(config.cache_length, 10);
        assert_eq!(config.max_tokens, 2048);
    }

    #[test]
    fn test_generation_options_from_config() {
        let config = ShellforgeConfig {
            temperature: 0.7,
            ..Default::default()
        };
        let options = config.generation_options();
        assert_eq!(options.temperature, 0.7);
        assert_eq!(options.model, config.default_model);
    }
}
