//! Tool-level configuration and the instance registry.
//!
//! Both are plain JSON files in the savepoint config directory. Parsing
//! is serde's problem; this module only defines the typed structures and
//! the load-or-default / save cycle. The vault file lives beside them
//! but is owned by [`crate::vault`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SavepointError};
use crate::model::Instance;
use crate::retention::RetentionPolicy;

const CONFIG_FILENAME: &str = "config.json";
const INSTANCES_FILENAME: &str = "instances.json";
const VAULT_FILENAME: &str = "vault.enc";
const DEFAULT_DUMP_TIMEOUT_SECS: u64 = 900;

/// Where savepoint keeps its state. Everything hangs off one home
/// directory so tests can point the whole tool at a temp dir.
#[derive(Debug, Clone)]
pub struct SavepointPaths {
    pub home: PathBuf,
}

impl SavepointPaths {
    pub fn new(home: PathBuf) -> Self {
        Self { home }
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join(CONFIG_FILENAME)
    }

    pub fn instances_path(&self) -> PathBuf {
        self.home.join(INSTANCES_FILENAME)
    }

    pub fn vault_path(&self) -> PathBuf {
        self.home.join(VAULT_FILENAME)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolConfig {
    /// Root directory for backup artifacts. Defaults to `backups/` under
    /// the savepoint home.
    #[serde(default)]
    pub storage_root: Option<PathBuf>,

    #[serde(default)]
    pub retention: RetentionPolicy,

    /// Per-target dump/restore timeout in seconds.
    #[serde(default = "default_dump_timeout")]
    pub dump_timeout_secs: u64,
}

fn default_dump_timeout() -> u64 {
    DEFAULT_DUMP_TIMEOUT_SECS
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            storage_root: None,
            retention: RetentionPolicy::default(),
            dump_timeout_secs: default_dump_timeout(),
        }
    }
}

impl ToolConfig {
    pub fn load(paths: &SavepointPaths) -> Result<Self> {
        load_json_or_default(&paths.config_path())
    }

    pub fn save(&self, paths: &SavepointPaths) -> Result<()> {
        save_json(&paths.config_path(), self)
    }

    pub fn storage_root(&self, paths: &SavepointPaths) -> PathBuf {
        self.storage_root
            .clone()
            .unwrap_or_else(|| paths.home.join("backups"))
    }
}

/// The full set of configured instances, upserted by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceConfig {
    #[serde(default)]
    pub instances: Vec<Instance>,
}

impl InstanceConfig {
    pub fn load(paths: &SavepointPaths) -> Result<Self> {
        load_json_or_default(&paths.instances_path())
    }

    pub fn save(&self, paths: &SavepointPaths) -> Result<()> {
        save_json(&paths.instances_path(), self)
    }

    pub fn find(&self, id: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Instance> {
        self.instances.iter_mut().find(|i| i.id == id)
    }

    /// Insert or replace by id. Returns true when an existing definition
    /// was replaced.
    pub fn upsert(&mut self, instance: Instance) -> bool {
        if let Some(existing) = self.find_mut(&instance.id) {
            *existing = instance;
            true
        } else {
            self.instances.push(instance);
            false
        }
    }

    pub fn remove(&mut self, id: &str) -> Result<Instance> {
        let pos = self
            .instances
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| SavepointError::NotFound(format!("instance '{}'", id)))?;
        Ok(self.instances.remove(pos))
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Instance> {
        self.instances.iter().filter(|i| i.enabled)
    }
}

fn load_json_or_default<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let content = fs::read_to_string(path).map_err(SavepointError::Io)?;
    let value = serde_json::from_str(&content)?;
    Ok(value)
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(SavepointError::Io)?;
    }
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).map_err(SavepointError::Io)?;
    Ok(())
}
