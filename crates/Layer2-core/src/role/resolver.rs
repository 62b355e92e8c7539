//! Role Resolver - 역할 이름 → RoleDefinition
//!
//! 프로세스 시작 시 한 번 로드하고, 이후에는 읽기 전용입니다.

use super::definition::{display_name_of, RoleDefinition};
use super::store::RoleStore;
use shellforge_foundation::{Error, Message, Result};
use std::path::Path;
use tracing::{debug, warn};

/// 역할 조회기
#[derive(Debug, Clone)]
pub struct RoleResolver {
    roles: Vec<RoleDefinition>,
}

impl Default for RoleResolver {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl RoleResolver {
    /// Built-in roles plus the given custom roles
    ///
    /// A custom role cannot shadow a built-in one, by name or display name.
    pub fn new(custom: Vec<RoleDefinition>) -> Self {
        let mut roles = RoleDefinition::builtins();
        for role in custom {
            if roles
                .iter()
                .any(|r| r.name == role.name || r.display_name == role.display_name)
            {
                warn!("Ignoring custom role {}: name is already taken", role.name);
                continue;
            }
            roles.push(role);
        }
        Self { roles }
    }

    /// Built-ins plus every role found in `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let custom = RoleStore::new(dir).load_all()?;
        debug!("Loaded {} custom roles from {}", custom.len(), dir.display());
        Ok(Self::new(custom))
    }

    pub fn resolve(&self, name: &str) -> Result<&RoleDefinition> {
        self.roles
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| Error::RoleNotFound(name.to_string()))
    }

    /// Role that started a session, recovered from its system message
    pub fn role_of_session(&self, history: &[Message]) -> Option<&RoleDefinition> {
        let first = history.first().filter(|m| m.is_system())?;
        let display_name = display_name_of(first.text())?;
        // new()가 표시 이름 충돌을 막으므로 일치는 최대 하나
        self.roles.iter().find(|r| r.display_name == display_name)
    }

    pub fn all(&self) -> &[RoleDefinition] {
        &self.roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::{CODE_ROLE, DEFAULT_ROLE, SHELL_ROLE};
    use tempfile::TempDir;

    #[test]
    fn test_resolve_builtin_and_missing() {
        let resolver = RoleResolver::default();
        assert_eq!(resolver.resolve(SHELL_ROLE).unwrap().name, "shell");
        assert!(matches!(
            resolver.resolve("pirate"),
            Err(Error::RoleNotFound(name)) if name == "pirate"
        ));
    }

    #[test]
    fn test_load_custom_roles() {
        let temp = TempDir::new().unwrap();
        RoleStore::new(temp.path()).create("pirate", "Arr.").unwrap();

        let resolver = RoleResolver::load(temp.path()).unwrap();
        let pirate = resolver.resolve("pirate").unwrap();
        assert!(!pirate.builtin);
        assert!(!pirate.one_shot);
    }

    #[test]
    fn test_load_from_missing_dir() {
        let temp = TempDir::new().unwrap();
        let resolver = RoleResolver::load(&temp.path().join("nope")).unwrap();
        assert_eq!(resolver.all().len(), 4);
    }

    #[test]
    fn test_custom_cannot_shadow_builtin() {
        let resolver = RoleResolver::new(vec![RoleDefinition::custom(CODE_ROLE, "sneaky")]);
        assert!(resolver.resolve(CODE_ROLE).unwrap().builtin);
    }

    #[test]
    fn test_role_of_session() {
        let resolver = RoleResolver::default();
        let shell = resolver.resolve(SHELL_ROLE).unwrap();
        let history = vec![Message::system(shell.system_prompt()), Message::user("ls")];
        assert_eq!(resolver.role_of_session(&history).unwrap().name, SHELL_ROLE);

        let default = resolver.resolve(DEFAULT_ROLE).unwrap();
        let history = vec![Message::system(default.system_prompt())];
        assert_eq!(resolver.role_of_session(&history).unwrap().name, DEFAULT_ROLE);

        assert!(resolver
            .role_of_session(&[Message::system("Be nice")])
            .is_none());
        assert!(resolver.role_of_session(&[]).is_none());
    }

    #[test]
    fn test_hand_written_role_cannot_take_builtin_display_name() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("ShellForge.json"),
            r#"{"name": "ShellForge", "role": "Impostor."}"#,
        )
        .unwrap();

        let resolver = RoleResolver::load(temp.path()).unwrap();
        assert!(matches!(
            resolver.resolve("ShellForge"),
            Err(Error::RoleNotFound(_))
        ));

        let default = resolver.resolve(DEFAULT_ROLE).unwrap();
        let history = vec![Message::system(default.system_prompt())];
        let role = resolver.role_of_session(&history).unwrap();
        assert!(role.builtin);
        assert_eq!(role.name, DEFAULT_ROLE);
    }
}
