//! Vault management commands. Thin orchestration over [`VaultStore`]:
//! secrets only appear in output when the caller asked to reveal them.

use super::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::vault::VaultStore;

pub fn set(
    vault: &VaultStore,
    id: &str,
    username: &str,
    password: &str,
    description: &str,
) -> Result<CmdResult> {
    let existed = vault.get(id, false).is_ok();
    vault.set(id, username, password, description)?;

    let mut result = CmdResult::default();
    let verb = if existed { "Updated" } else { "Stored" };
    result.add_message(CmdMessage::success(format!("{} credential '{}'.", verb, id)));
    Ok(result)
}

pub fn get(vault: &VaultStore, id: &str, reveal: bool) -> Result<CmdResult> {
    let credential = vault.get(id, reveal)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::info(format!("id:       {}", credential.id)));
    result.add_message(CmdMessage::info(format!("username: {}", credential.username)));
    if reveal {
        result.add_message(CmdMessage::info(format!("password: {}", credential.password)));
    } else {
        result.add_message(CmdMessage::info("password: (hidden, pass --reveal)"));
    }
    if !credential.metadata.description.is_empty() {
        result.add_message(CmdMessage::info(format!(
            "note:     {}",
            credential.metadata.description
        )));
    }
    Ok(result)
}

pub fn remove(vault: &VaultStore, id: &str) -> Result<CmdResult> {
    vault.remove(id)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Removed credential '{}'.", id)));
    Ok(result)
}

pub fn list(vault: &VaultStore) -> Result<CmdResult> {
    let credentials = vault.list()?;
    let mut result = CmdResult::default();
    if credentials.is_empty() {
        result.add_message(CmdMessage::info("Vault is empty."));
    }
    Ok(result.with_credentials(credentials))
}

pub fn info(vault: &VaultStore) -> Result<CmdResult> {
    let info = vault.info()?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::info(format!(
        "Vault at {} holds {} credential(s), {} bytes on disk.",
        vault.path().display(),
        info.credential_count,
        info.file_size
    )));
    result.add_message(CmdMessage::info(
        "Keyed to this host: copying the file elsewhere will not decrypt.",
    ));
    result.vault_info = Some(info);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SavepointError;

    fn vault_in(dir: &tempfile::TempDir) -> VaultStore {
        VaultStore::open_with_identity(dir.path().join("vault.enc"), "test-host")
    }

    #[test]
    fn set_distinguishes_create_from_update() {
        let dir = tempfile::tempdir().unwrap();
        let vault = vault_in(&dir);

        let first = set(&vault, "c1", "u", "p", "").unwrap();
        assert!(first.messages[0].content.starts_with("Stored"));

        let second = set(&vault, "c1", "u2", "p2", "").unwrap();
        assert!(second.messages[0].content.starts_with("Updated"));
    }

    #[test]
    fn get_hides_password_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let vault = vault_in(&dir);
        vault.set("c1", "backup", "hunter2", "").unwrap();

        let hidden = get(&vault, "c1", false).unwrap();
        assert!(hidden.messages.iter().all(|m| !m.content.contains("hunter2")));

        let revealed = get(&vault, "c1", true).unwrap();
        assert!(revealed
            .messages
            .iter()
            .any(|m| m.content.contains("hunter2")));
    }

    #[test]
    fn remove_unknown_credential_fails() {
        let dir = tempfile::tempdir().unwrap();
        let vault = vault_in(&dir);
        assert!(matches!(
            remove(&vault, "ghost"),
            Err(SavepointError::NotFound(_))
        ));
    }

    #[test]
    fn list_carries_summaries_without_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let vault = vault_in(&dir);
        vault.set("c1", "u", "topsecret", "prod db").unwrap();

        let result = list(&vault).unwrap();
        assert_eq!(result.credentials.len(), 1);
        assert_eq!(result.credentials[0].id, "c1");
        assert_eq!(result.credentials[0].description, "prod db");
    }

    #[test]
    fn info_reports_host_binding() {
        let dir = tempfile::tempdir().unwrap();
        let vault = vault_in(&dir);
        vault.set("c1", "u", "p", "").unwrap();

        let result = info(&vault).unwrap();
        assert_eq!(result.vault_info.as_ref().unwrap().credential_count, 1);
        assert!(result
            .messages
            .iter()
            .any(|m| m.content.contains("Keyed to this host")));
    }
}
