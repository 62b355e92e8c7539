//! # ShellForge Response Cache
//!
//! 같은 요청을 다시 보내지 않도록 응답을 디스크에 저장합니다.
//!
//! ```text
//! (history, prompt, role, options, functions)
//!               │
//!               ▼  fingerprint()  (SHA-256, 64 hex)
//!          Fingerprint
//!               │
//!               ▼
//!        ResponseCache  ── <cache_path>/<fingerprint>.json
//!          (FIFO, bounded)
//! ```
//!
//! ## Modules
//!
//! - [`fingerprint`] - 요청 → 캐시 키
//! - [`response`] - 영구 FIFO 응답 캐시

pub mod fingerprint;
pub mod response;

pub use fingerprint::{fingerprint, Fingerprint, FINGERPRINT_LEN};
pub use response::{CacheEntry, ResponseCache};
