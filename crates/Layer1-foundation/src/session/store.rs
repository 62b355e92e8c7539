//! Session Store - 대화 세션 영구 저장
//!
//! 세션 하나당 JSON 파일 하나 (`<id>.json`).
//! 마지막으로 사용한 세션 ID는 숨김 파일 `.last_chat_id`에 기록합니다.

use crate::core::{Message, MessageRole, SessionInfo};
use crate::storage::{remove_if_exists, write_atomic};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Ephemeral session, cleared when another identifier is used
pub const TEMP: &str = "temp";

/// Implicit session used when no identifier is supplied
pub const DEFAULT: &str = "default";

/// Alias for the most recently used session
pub const LAST: &str = "last";

/// Named after the first turn
pub const AUTO: &str = "auto";

/// Sentinels offered by `complete_chat_id`
pub const SENTINELS: [&str; 3] = [LAST, TEMP, AUTO];

const LAST_USED_FILE: &str = ".last_chat_id";
const SESSION_EXT: &str = "json";

/// 세션 파일 포맷
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionFile {
    id: String,
    updated_at: DateTime<Utc>,
    messages: Vec<Message>,
}

/// 세션 저장소
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
    /// system 메시지를 제외하고 보관할 최대 메시지 수
    max_messages: usize,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>, max_messages: usize) -> Self {
        Self {
            dir: dir.into(),
            max_messages,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn session_path(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.dir.join(format!("{}.{}", id, SESSION_EXT)))
    }

    // ========================================================================
    // Read
    // ========================================================================

    /// 세션 메시지 로드. 세션이 없으면 빈 목록.
    pub fn load(&self, id: &str) -> Result<Vec<Message>> {
        Ok(self
            .read_file(id)?
            .map(|file| file.messages)
            .unwrap_or_default())
    }

    /// 메시지가 하나 이상 있는 세션인지
    pub fn exists(&self, id: &str) -> Result<bool> {
        Ok(self
            .read_file(id)?
            .map(|file| !file.messages.is_empty())
            .unwrap_or(false))
    }

    fn read_file(&self, id: &str) -> Result<Option<SessionFile>> {
        let path = self.session_path(id)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::corrupt_session(id, e.to_string())),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::corrupt_session(id, e.to_string()))
    }

    /// 모든 세션, 최근 수정 순
    pub fn list(&self) -> Result<Vec<SessionInfo>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut sessions = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(id) = session_id_of(&path) else {
                continue;
            };
            match self.read_file(&id) {
                Ok(Some(file)) => sessions.push(SessionInfo {
                    id,
                    last_modified: file.updated_at,
                    message_count: file.messages.len(),
                }),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable session {}: {}", id, e),
            }
        }

        sessions.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(sessions)
    }

    /// 가장 최근에 수정된 세션 ID
    pub fn most_recent(&self) -> Result<Option<String>> {
        Ok(self.list()?.into_iter().next().map(|info| info.id))
    }

    // ========================================================================
    // Write
    // ========================================================================

    /// 메시지 추가
    ///
    /// 빈 세션에 처음 추가되는 메시지는 system 메시지로 저장된다.
    /// 저장 후 system 메시지 + 최근 `max_messages`개로 잘라낸다.
    pub fn append(&self, id: &str, messages: Vec<Message>) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut log = self.load(id)?;
        let was_empty = log.is_empty();
        log.extend(messages);
        if was_empty {
            log[0].role = MessageRole::System;
        }

        self.write(id, truncate(log, self.max_messages))
    }

    /// 세션 전체를 주어진 메시지로 교체
    pub fn replace(&self, id: &str, messages: Vec<Message>) -> Result<()> {
        if messages.is_empty() {
            return self.reset(id);
        }
        self.write(id, truncate(messages, self.max_messages))
    }

    fn write(&self, id: &str, messages: Vec<Message>) -> Result<()> {
        let path = self.session_path(id)?;
        let file = SessionFile {
            id: id.to_string(),
            updated_at: Utc::now(),
            messages,
        };
        write_atomic(&path, &serde_json::to_vec_pretty(&file)?)?;
        debug!("Saved session {} ({} messages)", id, file.messages.len());
        Ok(())
    }

    /// 세션 비우기
    pub fn reset(&self, id: &str) -> Result<()> {
        debug!("Resetting session {}", id);
        remove_if_exists(&self.session_path(id)?)
    }

    /// 세션 이름 변경. 이미 존재하는 이름이면 `-2`, `-3`, ... 을 붙인다.
    ///
    /// 실제로 사용된 ID를 반환한다. 원본이 없으면 `old_id` 그대로.
    pub fn rename(&self, old_id: &str, new_id: &str) -> Result<String> {
        let Some(mut file) = self.read_file(old_id)? else {
            return Ok(old_id.to_string());
        };
        if old_id == new_id {
            return Ok(old_id.to_string());
        }

        let mut final_id = new_id.to_string();
        let mut counter = 2;
        while self.session_path(&final_id)?.exists() {
            final_id = format!("{}-{}", new_id, counter);
            counter += 1;
        }

        file.id = final_id.clone();
        write_atomic(
            &self.session_path(&final_id)?,
            &serde_json::to_vec_pretty(&file)?,
        )?;
        remove_if_exists(&self.session_path(old_id)?)?;

        if self.last_used()?.as_deref() == Some(old_id) {
            self.set_last_used(&final_id)?;
        }
        debug!("Renamed session {} -> {}", old_id, final_id);
        Ok(final_id)
    }

    // ========================================================================
    // Last-used record
    // ========================================================================

    /// 마지막으로 사용한 세션 ID
    pub fn last_used(&self) -> Result<Option<String>> {
        match fs::read_to_string(self.dir.join(LAST_USED_FILE)) {
            Ok(content) => {
                let id = content.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_last_used(&self, id: &str) -> Result<()> {
        validate_id(id)?;
        write_atomic(&self.dir.join(LAST_USED_FILE), id.as_bytes())
    }

    // ========================================================================
    // Sentinels
    // ========================================================================

    /// `last` → 실제 세션 ID. 그 외 토큰은 그대로.
    ///
    /// Prefers the last-used record while that session still exists, then the
    /// most recently modified session.
    pub fn resolve_special(&self, token: &str) -> Result<String> {
        if token != LAST {
            return Ok(token.to_string());
        }

        if let Some(id) = self.last_used()? {
            if self.exists(&id)? {
                return Ok(id);
            }
        }
        self.most_recent()?.ok_or(Error::NoPreviousChat)
    }

    /// 셸 자동완성용 chat ID 후보
    pub fn complete_chat_id(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .list()
            .unwrap_or_default()
            .into_iter()
            .map(|info| info.id)
            .collect();
        names.sort();

        SENTINELS
            .iter()
            .map(|s| s.to_string())
            .chain(names)
            .filter(|name| name.starts_with(prefix))
            .collect()
    }
}

/// 첫 메시지(system) + 최근 `max_messages`개
fn truncate(mut messages: Vec<Message>, max_messages: usize) -> Vec<Message> {
    let tail = messages.len().saturating_sub(1);
    if tail > max_messages {
        messages.drain(1..1 + tail - max_messages);
    }
    messages
}

/// 세션 ID는 파일명으로 쓰이므로 경로 구분자와 숨김 파일 이름을 금지
fn validate_id(id: &str) -> Result<()> {
    let invalid = id.is_empty()
        || id.starts_with('.')
        || id.contains(['/', '\\', '\0'])
        || id == LAST;
    if invalid {
        return Err(Error::InvalidInput(format!("Invalid chat id: {:?}", id)));
    }
    Ok(())
}

fn session_id_of(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some(SESSION_EXT) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    (!stem.starts_with('.')).then(|| stem.to_string())
}
