//! Instance registry commands: add, list, show, enable/disable, remove.
//! Definitions are plaintext JSON; anything secret stays in the vault and
//! is referenced here by credential name only.

use super::{CmdMessage, CmdResult};
use crate::config::{InstanceConfig, SavepointPaths};
use crate::error::{Result, SavepointError};
use crate::model::{EngineKind, Instance};
use crate::vault::VaultStore;

/// Add or replace an instance definition. Warns (but does not fail) when
/// the referenced credential is not in the vault yet.
pub fn add(
    paths: &SavepointPaths,
    vault: &VaultStore,
    instance: Instance,
) -> Result<CmdResult> {
    validate(&instance)?;

    let mut result = CmdResult::default();
    if !instance.credential_name.is_empty() && vault.get(&instance.credential_name, false).is_err()
    {
        result.add_message(CmdMessage::warning(format!(
            "credential '{}' is not in the vault yet; backups will fail until it is added",
            instance.credential_name
        )));
    }

    let mut cfg = InstanceConfig::load(paths)?;
    let replaced = cfg.upsert(instance.clone());
    cfg.save(paths)?;

    let verb = if replaced { "Updated" } else { "Added" };
    result.add_message(CmdMessage::success(format!(
        "{} {} instance '{}'.",
        verb, instance.engine, instance.id
    )));
    Ok(result)
}

pub fn list(paths: &SavepointPaths) -> Result<CmdResult> {
    let cfg = InstanceConfig::load(paths)?;
    let mut result = CmdResult::default();
    if cfg.instances.is_empty() {
        result.add_message(CmdMessage::info("No instances configured."));
    }
    Ok(result.with_instances(cfg.instances))
}

pub fn show(paths: &SavepointPaths, id: &str) -> Result<CmdResult> {
    let cfg = InstanceConfig::load(paths)?;
    let instance = cfg
        .find(id)
        .cloned()
        .ok_or_else(|| SavepointError::NotFound(format!("instance '{}'", id)))?;
    Ok(CmdResult::default().with_instances(vec![instance]))
}

pub fn set_enabled(paths: &SavepointPaths, id: &str, enabled: bool) -> Result<CmdResult> {
    let mut cfg = InstanceConfig::load(paths)?;
    let instance = cfg
        .find_mut(id)
        .ok_or_else(|| SavepointError::NotFound(format!("instance '{}'", id)))?;
    instance.enabled = enabled;
    cfg.save(paths)?;

    let mut result = CmdResult::default();
    let state = if enabled { "enabled" } else { "disabled" };
    result.add_message(CmdMessage::success(format!("Instance '{}' {}.", id, state)));
    Ok(result)
}

pub fn remove(paths: &SavepointPaths, id: &str) -> Result<CmdResult> {
    let mut cfg = InstanceConfig::load(paths)?;
    let removed = cfg.remove(id)?;
    cfg.save(paths)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Removed instance '{}'. Its artifacts and credential '{}' were left in place.",
        removed.id, removed.credential_name
    )));
    Ok(result)
}

fn validate(instance: &Instance) -> Result<()> {
    if instance.id.is_empty() {
        return Err(SavepointError::Config(
            "instance id cannot be empty".to_string(),
        ));
    }
    match instance.engine {
        EngineKind::Files => {
            if instance.root_path.is_none() {
                return Err(SavepointError::Config(format!(
                    "files instance '{}' needs a root_path",
                    instance.id
                )));
            }
        }
        EngineKind::Mysql | EngineKind::Postgresql => {
            if instance.host.is_empty() {
                return Err(SavepointError::Config(format!(
                    "instance '{}' needs a host",
                    instance.id
                )));
            }
            if instance.credential_name.is_empty() {
                return Err(SavepointError::Config(format!(
                    "instance '{}' needs a credential_name",
                    instance.id
                )));
            }
        }
    }
    Ok(())
}
