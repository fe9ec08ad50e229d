//! Binds an instance definition to a vault credential.
//!
//! A [`ResolvedConnection`] exists only for the duration of one backup or
//! restore job and is never persisted. Resolution failures are scoped to
//! the one instance — callers processing multiple instances must treat
//! them as per-instance failures, not run aborts.

use std::path::PathBuf;

use crate::error::{Result, SavepointError};
use crate::model::{EngineKind, Instance};
use crate::vault::VaultStore;

/// Live connection parameters for one job. Carries the plaintext
/// password; keep it off disk and out of logs.
#[derive(Debug, Clone)]
pub struct ResolvedConnection {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub ssl_enabled: bool,
    /// Filesystem root for the files engine.
    pub root_path: Option<PathBuf>,
}

pub fn resolve(instance: &Instance, vault: &VaultStore) -> Result<ResolvedConnection> {
    // The files engine reads the local filesystem directly; a credential
    // reference is optional there.
    if instance.engine == EngineKind::Files && instance.credential_name.is_empty() {
        return Ok(ResolvedConnection {
            host: instance.host.clone(),
            port: instance.port,
            username: String::new(),
            password: String::new(),
            ssl_enabled: instance.ssl_enabled,
            root_path: instance.root_path.clone(),
        });
    }

    if instance.credential_name.is_empty() {
        return Err(SavepointError::Config(format!(
            "instance '{}' has no credential_name",
            instance.id
        )));
    }

    let credential =
        vault
            .get(&instance.credential_name, true)
            .map_err(|e| SavepointError::CredentialResolution {
                credential: instance.credential_name.clone(),
                detail: match e {
                    SavepointError::NotFound(_) => "not present in vault".to_string(),
                    SavepointError::Decryption(msg) => msg,
                    other => other.to_string(),
                },
            })?;

    Ok(ResolvedConnection {
        host: instance.host.clone(),
        port: instance.port,
        username: credential.username,
        password: credential.password,
        ssl_enabled: instance.ssl_enabled,
        root_path: instance.root_path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mysql_instance(credential: &str) -> Instance {
        Instance {
            id: "db1".to_string(),
            engine: EngineKind::Mysql,
            host: "localhost".to_string(),
            port: 3306,
            credential_name: credential.to_string(),
            root_path: None,
            whitelist: vec![],
            blacklist: vec![],
            ssl_enabled: true,
            enabled: true,
        }
    }

    #[test]
    fn resolves_credential_from_vault() {
        let dir = tempfile::tempdir().unwrap();
        let vault = VaultStore::open_with_identity(dir.path().join("vault.enc"), "test-host");
        vault.set("db1-cred", "backup", "hunter2", "").unwrap();

        let conn = resolve(&mysql_instance("db1-cred"), &vault).unwrap();
        assert_eq!(conn.host, "localhost");
        assert_eq!(conn.port, 3306);
        assert_eq!(conn.username, "backup");
        assert_eq!(conn.password, "hunter2");
        assert!(conn.ssl_enabled);
    }

    #[test]
    fn missing_credential_maps_to_resolution_error() {
        let dir = tempfile::tempdir().unwrap();
        let vault = VaultStore::open_with_identity(dir.path().join("vault.enc"), "test-host");

        let err = resolve(&mysql_instance("ghost"), &vault).unwrap_err();
        match err {
            SavepointError::CredentialResolution { credential, detail } => {
                assert_eq!(credential, "ghost");
                assert!(detail.contains("not present"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn empty_credential_name_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let vault = VaultStore::open_with_identity(dir.path().join("vault.enc"), "test-host");

        assert!(matches!(
            resolve(&mysql_instance(""), &vault),
            Err(SavepointError::Config(_))
        ));
    }

    #[test]
    fn files_instance_without_credential_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let vault = VaultStore::open_with_identity(dir.path().join("vault.enc"), "test-host");

        let instance = Instance {
            id: "homes".to_string(),
            engine: EngineKind::Files,
            host: String::new(),
            port: 0,
            credential_name: String::new(),
            root_path: Some(PathBuf::from("/srv/data")),
            whitelist: vec![],
            blacklist: vec![],
            ssl_enabled: false,
            enabled: true,
        };

        let conn = resolve(&instance, &vault).unwrap();
        assert_eq!(conn.root_path.as_deref(), Some(std::path::Path::new("/srv/data")));
        assert!(conn.username.is_empty());
    }
}
