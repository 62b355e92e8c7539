//! # shellforge-foundation
//!
//! Foundation layer for ShellForge:
//! - Core: 공용 타입 (Message, FunctionCall, GenerationOptions)
//! - Cache: Fingerprint + 영구 FIFO 응답 캐시
//! - Session: 세션 저장소 (`temp`, `default`, `last`, `auto`)
//! - Storage: 원자적 파일 쓰기, JsonStore
//! - Config: 통합 설정 (ShellforgeConfig)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Session Controller (Layer3)                            │
//! │          │                          │                   │
//! │          ▼                          ▼                   │
//! │   SessionStore                ResponseCache             │
//! │   (<chat_cache_path>/)        (<cache_path>/)           │
//! │          │                          │                   │
//! │          └──────────┬───────────────┘                   │
//! │                     ▼                                   │
//! │          write_atomic (tmp + rename)                    │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod core;
pub mod error;
pub mod session;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Core (공용 타입)
// ============================================================================
pub use core::{FunctionCall, GenerationOptions, Message, MessageRole, SessionInfo};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{ShellforgeConfig, ENV_PREFIX, SHELLFORGE_CONFIG_FILE};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{remove_if_exists, write_atomic, JsonStore};

// ============================================================================
// Cache (응답 캐시)
// ============================================================================
pub use cache::{fingerprint, CacheEntry, Fingerprint, ResponseCache, FINGERPRINT_LEN};

// ============================================================================
// Session (세션)
// ============================================================================
pub use session::SessionStore;
