//! Session - 이어서 대화할 수 있는 세션 저장소
//!
//! - `store.rs` - SessionStore (파일 기반, 원자적 교체)
//!
//! 예약된 식별자:
//! - `temp` - 다른 세션을 사용하는 순간 비워지는 임시 세션
//! - `default` - 식별자를 주지 않았을 때 쓰는 세션
//! - `last` - 마지막으로 사용한 세션의 별칭
//! - `auto` - 첫 턴 이후 이름이 자동으로 붙는 세션

mod store;

pub use store::{SessionStore, AUTO, DEFAULT, LAST, SENTINELS, TEMP};
