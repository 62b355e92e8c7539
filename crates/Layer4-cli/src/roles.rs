//! Role commands - `--create-role`, `--show-role`, `--list-roles`

use shellforge_core::{RoleResolver, RoleStore};
use shellforge_foundation::{Error, Result};
use std::path::Path;

pub fn create_role(roles_path: &Path, name: &str, description: &str) -> Result<()> {
    if description.trim().is_empty() {
        return Err(Error::InvalidInput("Role description cannot be empty".to_string()));
    }
    let path = RoleStore::new(roles_path).create(name, description)?;
    eprintln!("Created role {} ({})", name, path.display());
    Ok(())
}

pub fn show_role(resolver: &RoleResolver, name: &str) -> Result<()> {
    let role = resolver.resolve(name)?;
    println!("{}", role.system_prompt());
    Ok(())
}

/// Role names, built-ins first
pub fn role_rows(resolver: &RoleResolver) -> Vec<String> {
    resolver
        .all()
        .iter()
        .map(|role| {
            let kind = if role.builtin { "built-in" } else { "custom" };
            format!("{} ({})", role.name, kind)
        })
        .collect()
}

pub fn list_roles(resolver: &RoleResolver) {
    for row in role_rows(resolver) {
        println!("{}", row);
    }
}
