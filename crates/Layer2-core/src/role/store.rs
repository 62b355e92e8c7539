//! Role Store - 사용자 정의 역할 파일 (CRUD)
//!
//! `<roles_path>/<name>.json`:
//!
//! ```json
//! { "name": "pirate", "role": "Answer like a pirate.", "functions": ["weather"] }
//! ```
//!
//! `functions`가 없으면 등록된 모든 함수를 허용합니다.

use super::definition::{FunctionScope, RoleDefinition};
use serde::{Deserialize, Serialize};
use shellforge_foundation::{Error, JsonStore, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

const ROLE_EXT: &str = "json";

/// On-disk custom role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleFile {
    pub name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<String>>,
}

impl RoleFile {
    pub fn into_definition(self) -> RoleDefinition {
        let mut definition = RoleDefinition::custom(self.name, self.role);
        if let Some(functions) = self.functions {
            definition.allowed_functions = FunctionScope::Only(functions.into_iter().collect());
        }
        definition
    }
}

/// 사용자 정의 역할 저장소
#[derive(Debug, Clone)]
pub struct RoleStore {
    store: JsonStore,
}

impl RoleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonStore::new(dir),
        }
    }

    pub fn dir(&self) -> &Path {
        self.store.base_dir()
    }

    fn file_name(name: &str) -> Result<String> {
        let invalid = name.trim().is_empty()
            || name.starts_with('.')
            || name.contains(['/', '\\', '\0', '\n']);
        if invalid {
            return Err(Error::InvalidInput(format!("Invalid role name: {:?}", name)));
        }
        Ok(format!("{}.{}", name, ROLE_EXT))
    }

    /// 역할 생성 (같은 이름이 있으면 덮어씀)
    ///
    /// Built-in names and display names are reserved, since sessions are
    /// matched to their role by display name.
    pub fn create(&self, name: &str, description: &str) -> Result<PathBuf> {
        if RoleDefinition::builtins()
            .iter()
            .any(|r| r.name == name || r.display_name == name)
        {
            return Err(Error::Validation(format!(
                "Role \"{}\" is built-in and cannot be redefined",
                name
            )));
        }
        let file_name = Self::file_name(name)?;
        let file = RoleFile {
            name: name.to_string(),
            role: description.trim().to_string(),
            functions: None,
        };
        self.store.save(&file_name, &file)?;
        Ok(self.store.file_path(&file_name))
    }

    pub fn exists(&self, name: &str) -> bool {
        Self::file_name(name)
            .map(|f| self.store.exists(&f))
            .unwrap_or(false)
    }

    pub fn get(&self, name: &str) -> Result<Option<RoleFile>> {
        self.store.load_optional(&Self::file_name(name)?)
    }

    /// 저장된 역할 이름 (정렬)
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(self.dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(ROLE_EXT) {
                    return None;
                }
                let stem = path.file_stem()?.to_str()?;
                (!stem.starts_with('.')).then(|| stem.to_string())
            })
            .collect();
        names.sort();
        Ok(names)
    }

    /// 모든 역할 로드. 읽을 수 없는 파일은 경고 후 건너뜀
    pub fn load_all(&self) -> Result<Vec<RoleDefinition>> {
        let mut roles = Vec::new();
        for name in self.list()? {
            match self.get(&name) {
                Ok(Some(file)) => roles.push(file.into_definition()),
                Ok(None) => {}
                Err(e) => warn!("Skipping role {}: {}", name, e),
            }
        }
        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_show_list() {
        let temp = TempDir::new().unwrap();
        let store = RoleStore::new(temp.path().join("roles"));

        store.create("pirate", "Answer like a pirate.\n").unwrap();
        store.create("poet", "Answer in verse.").unwrap();

        assert_eq!(store.list().unwrap(), vec!["pirate", "poet"]);
        let file = store.get("pirate").unwrap().unwrap();
        assert_eq!(file.role, "Answer like a pirate.");
        assert!(store.exists("poet"));
        assert!(store.get("ghost").unwrap().is_none());
    }

    #[test]
    fn test_builtin_names_are_reserved() {
        let temp = TempDir::new().unwrap();
        let store = RoleStore::new(temp.path());
        assert!(matches!(
            store.create("shell", "nope"),
            Err(Error::Validation(_))
        ));
        assert!(store.create("../escape", "nope").is_err());
    }

    #[test]
    fn test_builtin_display_names_are_reserved() {
        let temp = TempDir::new().unwrap();
        let store = RoleStore::new(temp.path());
        assert!(matches!(
            store.create("ShellForge", "nope"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.create("Code Generator", "nope"),
            Err(Error::Validation(_))
        ));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_functions_field_limits_scope() {
        let file: RoleFile = serde_json::from_str(
            r#"{"name": "forecaster", "role": "Talk weather.", "functions": ["weather"]}"#,
        )
        .unwrap();
        let role = file.into_definition();
        assert!(role.allowed_functions.allows("weather"));
        assert!(!role.allowed_functions.allows("execute_shell_command"));
    }

    #[test]
    fn test_load_all_skips_corrupt_files() {
        let temp = TempDir::new().unwrap();
        let store = RoleStore::new(temp.path());
        store.create("pirate", "Arr.").unwrap();
        std::fs::write(temp.path().join("broken.json"), "{").unwrap();

        let roles = store.load_all().unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].system_prompt_for("Linux", "bash"), "You are pirate\nArr.");
    }
}
