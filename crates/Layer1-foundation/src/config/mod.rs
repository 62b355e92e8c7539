//! Config - 통합 설정 관리
//!
//! - `settings.rs` - ShellforgeConfig 통합 설정 (파일 + 환경 변수)

mod settings;

pub use settings::{ShellforgeConfig, ENV_PREFIX, SHELLFORGE_CONFIG_FILE};
