//! Connectivity check: resolve the credential and probe the server (or
//! root directory) without dumping anything.

use super::{CmdMessage, CmdResult};
use crate::adapter::{adapter_for, EngineAdapter};
use crate::config::{InstanceConfig, SavepointPaths};
use crate::error::{Result, SavepointError};
use crate::resolve;
use crate::vault::VaultStore;

pub fn run(paths: &SavepointPaths, vault: &VaultStore, id: &str) -> Result<CmdResult> {
    let cfg = InstanceConfig::load(paths)?;
    let instance = cfg
        .find(id)
        .ok_or_else(|| SavepointError::NotFound(format!("instance '{}'", id)))?;

    let adapter = adapter_for(instance.engine);
    check(instance, vault, adapter.as_ref())
}

pub fn check(
    instance: &crate::model::Instance,
    vault: &VaultStore,
    adapter: &dyn EngineAdapter,
) -> Result<CmdResult> {
    let conn = resolve::resolve(instance, vault)?;
    adapter.test_connection(&conn)?;

    let targets = adapter.list_targets(&conn)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Instance '{}' is reachable; {} target(s) visible.",
        instance.id,
        targets.len()
    )));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::MockAdapter;
    use crate::model::{EngineKind, Instance};

    fn instance() -> Instance {
        Instance {
            id: "db1".to_string(),
            engine: EngineKind::Mysql,
            host: "localhost".to_string(),
            port: 3306,
            credential_name: "db1-cred".to_string(),
            root_path: None,
            whitelist: vec![],
            blacklist: vec![],
            ssl_enabled: false,
            enabled: true,
        }
    }

    #[test]
    fn reports_visible_target_count() {
        let dir = tempfile::tempdir().unwrap();
        let vault = VaultStore::open_with_identity(dir.path().join("vault.enc"), "test-host");
        vault.set("db1-cred", "u", "p", "").unwrap();

        let adapter = MockAdapter::with_targets(&["a", "b"]);
        let result = check(&instance(), &vault, &adapter).unwrap();
        assert!(result.messages[0].content.contains("2 target(s)"));
    }

    #[test]
    fn refused_connection_surfaces_as_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let vault = VaultStore::open_with_identity(dir.path().join("vault.enc"), "test-host");
        vault.set("db1-cred", "u", "p", "").unwrap();

        let adapter = MockAdapter::with_targets(&["a"]).refusing_connections();
        assert!(matches!(
            check(&instance(), &vault, &adapter),
            Err(SavepointError::Connection(_))
        ));
    }

    #[test]
    fn missing_credential_fails_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let vault = VaultStore::open_with_identity(dir.path().join("vault.enc"), "test-host");

        let adapter = MockAdapter::with_targets(&["a"]);
        assert!(matches!(
            check(&instance(), &vault, &adapter),
            Err(SavepointError::CredentialResolution { .. })
        ));
    }
}
