//! # API Facade
//!
//! Thin facade over the command layer and the single entry point for
//! every savepoint operation, regardless of the UI driving it.
//!
//! The facade dispatches to `commands/*`, normalizes inputs (instance
//! id lists, artifact paths), and returns structured `Result<CmdResult>`
//! values. It does no business logic, no terminal I/O, and no
//! formatting; those belong to the command layer and the CLI layer
//! respectively.

use std::path::{Path, PathBuf};

use crate::commands;
use crate::commands::config::ConfigUpdate;
use crate::config::{InstanceConfig, SavepointPaths, ToolConfig};
use crate::error::{Result, SavepointError};
use crate::model::Instance;
use crate::vault::VaultStore;

pub struct SavepointApi {
    paths: SavepointPaths,
    vault: VaultStore,
}

impl SavepointApi {
    pub fn open(paths: SavepointPaths) -> Result<Self> {
        let vault = VaultStore::open(paths.vault_path())?;
        Ok(Self { paths, vault })
    }

    /// Test constructor with a fixed host identity, so vault state can be
    /// created and read back regardless of the machine running the tests.
    pub fn open_with_identity(paths: SavepointPaths, identity: &str) -> Self {
        let vault = VaultStore::open_with_identity(paths.vault_path(), identity);
        Self { paths, vault }
    }

    pub fn paths(&self) -> &SavepointPaths {
        &self.paths
    }

    // --- vault ---

    pub fn vault_set(
        &self,
        id: &str,
        username: &str,
        password: &str,
        description: &str,
    ) -> Result<commands::CmdResult> {
        commands::vault::set(&self.vault, id, username, password, description)
    }

    pub fn vault_get(&self, id: &str, reveal: bool) -> Result<commands::CmdResult> {
        commands::vault::get(&self.vault, id, reveal)
    }

    pub fn vault_remove(&self, id: &str) -> Result<commands::CmdResult> {
        commands::vault::remove(&self.vault, id)
    }

    pub fn vault_list(&self) -> Result<commands::CmdResult> {
        commands::vault::list(&self.vault)
    }

    pub fn vault_info(&self) -> Result<commands::CmdResult> {
        commands::vault::info(&self.vault)
    }

    // --- instances ---

    pub fn instance_add(&self, instance: Instance) -> Result<commands::CmdResult> {
        commands::instance::add(&self.paths, &self.vault, instance)
    }

    pub fn instance_list(&self) -> Result<commands::CmdResult> {
        commands::instance::list(&self.paths)
    }

    pub fn instance_show(&self, id: &str) -> Result<commands::CmdResult> {
        commands::instance::show(&self.paths, id)
    }

    pub fn instance_set_enabled(&self, id: &str, enabled: bool) -> Result<commands::CmdResult> {
        commands::instance::set_enabled(&self.paths, id, enabled)
    }

    pub fn instance_remove(&self, id: &str) -> Result<commands::CmdResult> {
        commands::instance::remove(&self.paths, id)
    }

    // --- backup / restore ---

    /// Back up the named instances, or every enabled instance when `ids`
    /// is empty. Naming an unknown instance is an error; naming a
    /// disabled one runs it anyway (an explicit request wins).
    pub fn backup(&self, ids: &[String]) -> Result<commands::CmdResult> {
        let cfg = ToolConfig::load(&self.paths)?;
        let instances = InstanceConfig::load(&self.paths)?;

        let selected: Vec<Instance> = if ids.is_empty() {
            instances.instances.clone()
        } else {
            let mut selected = Vec::with_capacity(ids.len());
            for id in ids {
                let mut instance = instances
                    .find(id)
                    .cloned()
                    .ok_or_else(|| SavepointError::NotFound(format!("instance '{}'", id)))?;
                instance.enabled = true;
                selected.push(instance);
            }
            selected
        };

        commands::backup::run(&selected, &self.vault, &cfg, &self.paths)
    }

    pub fn restore(
        &self,
        artifact_path: &Path,
        instance_override: Option<&str>,
        target_override: Option<&str>,
    ) -> Result<commands::CmdResult> {
        let cfg = ToolConfig::load(&self.paths)?;
        let instances = InstanceConfig::load(&self.paths)?;
        commands::restore::run(
            artifact_path,
            instance_override,
            target_override,
            &instances,
            &self.vault,
            &cfg,
        )
    }

    pub fn restore_list(&self, instance_id: Option<&str>) -> Result<commands::CmdResult> {
        let cfg = ToolConfig::load(&self.paths)?;
        commands::restore::list(&cfg, &self.paths, instance_id)
    }

    pub fn test_connection(&self, id: &str) -> Result<commands::CmdResult> {
        commands::test_conn::run(&self.paths, &self.vault, id)
    }

    // --- retention / config ---

    pub fn prune(&self, dry_run: bool) -> Result<commands::CmdResult> {
        let cfg = ToolConfig::load(&self.paths)?;
        commands::prune::run(&cfg, &self.paths, dry_run)
    }

    pub fn config_show(&self) -> Result<commands::CmdResult> {
        let cfg = ToolConfig::load(&self.paths)?;
        commands::config::show(&cfg, &self.paths)
    }

    pub fn config_set(&self, update: ConfigUpdate) -> Result<commands::CmdResult> {
        commands::config::set(&self.paths, update)
    }
}

/// Resolve the savepoint home directory: `SAVEPOINT_HOME` when set,
/// otherwise the platform config directory.
pub fn default_home() -> PathBuf {
    if let Ok(home) = std::env::var("SAVEPOINT_HOME") {
        if !home.is_empty() {
            return PathBuf::from(home);
        }
    }
    directories::ProjectDirs::from("com", "savepoint", "savepoint")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".savepoint"))
}

pub use crate::commands::config::ConfigUpdate as ConfigUpdateArgs;
pub use crate::commands::{CmdMessage, CmdResult, MessageLevel};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EngineKind;

    fn api_in(dir: &tempfile::TempDir) -> SavepointApi {
        SavepointApi::open_with_identity(
            SavepointPaths::new(dir.path().to_path_buf()),
            "test-host",
        )
    }

    #[test]
    fn backup_of_unknown_instance_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let api = api_in(&dir);
        assert!(matches!(
            api.backup(&["ghost".to_string()]),
            Err(SavepointError::NotFound(_))
        ));
    }

    #[test]
    fn explicit_backup_overrides_disabled_flag() {
        let dir = tempfile::tempdir().unwrap();
        let api = api_in(&dir);

        let data = dir.path().join("data");
        std::fs::create_dir_all(data.join("docs")).unwrap();
        std::fs::write(data.join("docs/a.txt"), b"hello").unwrap();

        api.instance_add(Instance {
            id: "homes".to_string(),
            engine: EngineKind::Files,
            host: String::new(),
            port: 0,
            credential_name: String::new(),
            root_path: Some(data),
            whitelist: vec![],
            blacklist: vec![],
            ssl_enabled: false,
            enabled: false,
        })
        .unwrap();

        // An all-instance run skips it...
        let all = api.backup(&[]).unwrap();
        assert!(all.reports.is_empty());

        // ...a named run does not.
        let named = api.backup(&["homes".to_string()]).unwrap();
        assert_eq!(named.reports.len(), 1);
        assert_eq!(named.exit_code(), 0);
    }

    #[test]
    fn vault_roundtrip_through_facade() {
        let dir = tempfile::tempdir().unwrap();
        let api = api_in(&dir);

        api.vault_set("c1", "u", "p", "desc").unwrap();
        let listed = api.vault_list().unwrap();
        assert_eq!(listed.credentials.len(), 1);

        api.vault_remove("c1").unwrap();
        assert!(api.vault_list().unwrap().credentials.is_empty());
    }

    #[test]
    fn default_home_honours_env_override() {
        // Set + read back in one test to avoid ordering races with other
        // tests touching the same variable.
        std::env::set_var("SAVEPOINT_HOME", "/tmp/savepoint-test-home");
        assert_eq!(
            default_home(),
            PathBuf::from("/tmp/savepoint-test-home")
        );
        std::env::remove_var("SAVEPOINT_HOME");
    }
}
