//! Response Cache - 영구 응답 캐시
//!
//! 디렉토리 레이아웃:
//!
//! ```text
//! <cache_path>/
//! ├── .index.json        # 생성 순서 (가장 오래된 것이 앞)
//! ├── <fingerprint>.json # CacheEntry
//! └── ...
//! ```
//!
//! - 조회는 키로 파일 하나만 읽는다 (O(1))
//! - 용량 초과 시 FIFO (생성 순서) 로 제거
//! - 손상된 항목은 miss로 취급하고, 손상된 index는 항목 파일로부터 재구성

use super::fingerprint::Fingerprint;
use crate::storage::{remove_if_exists, write_atomic};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const INDEX_FILE: &str = ".index.json";
const ENTRY_EXT: &str = "json";

/// 캐시 항목 (파일 하나)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexRecord {
    key: String,
    created_at: DateTime<Utc>,
}

/// Bounded, persistent fingerprint → response store
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    capacity: usize,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            dir: dir.into(),
            capacity,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn entry_path(&self, key: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{}.{}", key.as_str(), ENTRY_EXT))
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    // ========================================================================
    // get / put
    // ========================================================================

    /// 캐시 조회. 없거나 읽을 수 없으면 `None`.
    pub fn get(&self, key: &Fingerprint) -> Option<String> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Cache entry {} unreadable, treating as miss: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&content) {
            Ok(entry) if entry.fingerprint == key.as_str() => {
                debug!("Cache hit: {}", key);
                Some(entry.response)
            }
            Ok(_) => {
                warn!("Cache entry {} has mismatched key, treating as miss", key);
                None
            }
            Err(e) => {
                warn!("Cache entry {} corrupt, treating as miss: {}", key, e);
                None
            }
        }
    }

    /// 캐시 저장. 같은 키는 덮어쓰고 생성 순서는 유지한다.
    pub fn put(&self, key: &Fingerprint, response: &str) -> Result<()> {
        let mut index = self.load_index();

        let created_at = match index.iter().find(|r| r.key == key.as_str()) {
            Some(existing) => existing.created_at,
            None => {
                let now = Utc::now();
                index.push(IndexRecord {
                    key: key.as_str().to_string(),
                    created_at: now,
                });
                now
            }
        };

        let entry = CacheEntry {
            fingerprint: key.as_str().to_string(),
            response: response.to_string(),
            created_at,
        };
        write_atomic(&self.entry_path(key), &serde_json::to_vec(&entry)?)?;
        self.save_index(&index)?;

        self.evict_if_over_capacity()
    }

    /// 용량을 초과한 만큼 가장 오래된 항목부터 제거
    pub fn evict_if_over_capacity(&self) -> Result<()> {
        let mut index = self.load_index();
        if index.len() <= self.capacity {
            return Ok(());
        }

        let excess = index.len() - self.capacity;
        for record in index.drain(..excess) {
            debug!("Evicting cache entry {}", record.key);
            remove_if_exists(&self.dir.join(format!("{}.{}", record.key, ENTRY_EXT)))?;
        }
        self.save_index(&index)
    }

    /// 저장된 항목 수
    pub fn len(&self) -> usize {
        self.entry_keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 모든 항목 삭제
    pub fn clear(&self) -> Result<()> {
        for key in self.entry_keys() {
            remove_if_exists(&self.entry_path(&key))?;
        }
        remove_if_exists(&self.index_path())
    }

    // ========================================================================
    // Index
    // ========================================================================

    fn entry_keys(&self) -> Vec<Fingerprint> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .flatten()
            .filter_map(|e| {
                let path = e.path();
                if path.extension().and_then(|x| x.to_str()) != Some(ENTRY_EXT) {
                    return None;
                }
                Fingerprint::from_hex(path.file_stem()?.to_str()?)
            })
            .collect()
    }

    fn load_index(&self) -> Vec<IndexRecord> {
        match fs::read_to_string(self.index_path()) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(index) => index,
                Err(e) => {
                    warn!("Cache index corrupt, rebuilding: {}", e);
                    self.rebuild_index()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => self.rebuild_index(),
            Err(e) => {
                warn!("Cache index unreadable, rebuilding: {}", e);
                self.rebuild_index()
            }
        }
    }

    /// 항목 파일의 `created_at`으로 순서를 복원. 읽을 수 없는 항목은 버린다.
    fn rebuild_index(&self) -> Vec<IndexRecord> {
        let mut records: Vec<IndexRecord> = self
            .entry_keys()
            .into_iter()
            .filter_map(|key| {
                let path = self.entry_path(&key);
                let parsed = fs::read_to_string(&path)
                    .ok()
                    .and_then(|c| serde_json::from_str::<CacheEntry>(&c).ok());
                match parsed {
                    Some(entry) => Some(IndexRecord {
                        key: key.as_str().to_string(),
                        created_at: entry.created_at,
                    }),
                    None => {
                        if let Err(e) = remove_if_exists(&path) {
                            warn!("Failed to drop unreadable cache entry: {}", e);
                        }
                        None
                    }
                }
            })
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.key.cmp(&b.key)));
        records
    }

    fn save_index(&self, index: &[IndexRecord]) -> Result<()> {
        write_atomic(&self.index_path(), &serde_json::to_vec(index)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::fingerprint::fingerprint;
    use crate::core::GenerationOptions;
    use tempfile::TempDir;

    fn key(prompt: &str) -> Fingerprint {
        fingerprint(&[], prompt, "default", &GenerationOptions::default(), &[]).unwrap()
    }

    fn cache(capacity: usize) -> (ResponseCache, TempDir) {
        let temp = TempDir::new().unwrap();
        (ResponseCache::new(temp.path().join("cache"), capacity), temp)
    }

    #[test]
    fn test_miss_on_empty_cache() {
        let (cache, _temp) = cache(3);
        assert_eq!(cache.get(&key("a")), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_then_get() {
        let (cache, _temp) = cache(3);
        cache.put(&key("a"), "ls -la").unwrap();
        assert_eq!(cache.get(&key("a")).as_deref(), Some("ls -la"));
    }

    #[test]
    fn test_repeated_put_does_not_grow() {
        let (cache, _temp) = cache(3);
        cache.put(&key("a"), "one").unwrap();
        cache.put(&key("a"), "one").unwrap();
        cache.put(&key("a"), "two").unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key("a")).as_deref(), Some("two"));
    }

    #[test]
    fn test_bound_evicts_oldest() {
        let (cache, _temp) = cache(3);
        for p in ["a", "b", "c", "d"] {
            cache.put(&key(p), p).unwrap();
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(&key("a")), None);
        for p in ["b", "c", "d"] {
            assert_eq!(cache.get(&key(p)).as_deref(), Some(p));
        }
    }

    #[test]
    fn test_overwrite_keeps_creation_order() {
        let (cache, _temp) = cache(2);
        cache.put(&key("a"), "1").unwrap();
        cache.put(&key("b"), "2").unwrap();
        // rewriting "a" does not make it the newest
        cache.put(&key("a"), "3").unwrap();
        cache.put(&key("c"), "4").unwrap();
        assert_eq!(cache.get(&key("a")), None);
        assert_eq!(cache.get(&key("b")).as_deref(), Some("2"));
    }

    #[test]
    fn test_corrupt_entry_is_miss() {
        let (cache, _temp) = cache(3);
        cache.put(&key("a"), "ok").unwrap();
        fs::write(cache.entry_path(&key("a")), "{truncated").unwrap();
        assert_eq!(cache.get(&key("a")), None);

        // a fresh put recovers the slot
        cache.put(&key("a"), "again").unwrap();
        assert_eq!(cache.get(&key("a")).as_deref(), Some("again"));
    }

    #[test]
    fn test_corrupt_index_is_rebuilt() {
        let (cache, _temp) = cache(2);
        cache.put(&key("a"), "1").unwrap();
        cache.put(&key("b"), "2").unwrap();
        fs::write(cache.index_path(), "garbage").unwrap();

        cache.put(&key("c"), "3").unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key("a")), None);
        assert_eq!(cache.get(&key("c")).as_deref(), Some("3"));
    }

    #[test]
    fn test_rebuild_survives_unremovable_entry() {
        let (cache, _temp) = cache(2);
        cache.put(&key("a"), "1").unwrap();
        // 디렉터리는 읽을 수도 지울 수도 없음 → 경고 후 건너뜀
        let blocked = cache.entry_path(&key("x"));
        fs::create_dir_all(&blocked).unwrap();
        fs::write(cache.index_path(), "garbage").unwrap();

        cache.put(&key("b"), "2").unwrap();
        assert!(blocked.is_dir());
        assert_eq!(cache.get(&key("a")).as_deref(), Some("1"));
        assert_eq!(cache.get(&key("b")).as_deref(), Some("2"));
    }

    #[test]
    fn test_clear() {
        let (cache, _temp) = cache(3);
        cache.put(&key("a"), "1").unwrap();
        cache.clear().unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&key("a")), None);
    }
}
