//! Restore orchestration.
//!
//! A restore replays exactly one artifact. For the database engines the
//! artifact is gunzipped, run through the rewrite pass pointing it at
//! the requested target, and streamed to the client binary. For the
//! files engine the archive is handed to the adapter as-is and unpacked
//! under the instance root.
//!
//! The artifact's checksum is verified against its sidecar before any
//! bytes reach a server; a mismatch aborts the restore.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use walkdir::WalkDir;

use super::helpers::{read_sidecar, scan_artifacts};
use super::{CmdMessage, CmdResult};
use crate::adapter::{adapter_for, sha256_file, EngineAdapter, RestorePayload};
use crate::config::{InstanceConfig, SavepointPaths, ToolConfig};
use crate::error::{Result, SavepointError};
use crate::model::{EngineKind, Instance};
use crate::resolve::{self, ResolvedConnection};
use crate::rewrite::rewrite_script;
use crate::vault::VaultStore;

/// Restore one artifact, optionally into a different instance and/or
/// target than the ones it was dumped from. The instance defaults to
/// the one recorded in the artifact's sidecar; either way its engine
/// must match the artifact's.
pub fn run(
    artifact_path: &Path,
    instance_override: Option<&str>,
    target_override: Option<&str>,
    instances: &InstanceConfig,
    vault: &VaultStore,
    cfg: &ToolConfig,
) -> Result<CmdResult> {
    let artifact = read_sidecar(artifact_path).map_err(|e| match e {
        SavepointError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
            SavepointError::NotFound(format!(
                "no artifact metadata beside {}",
                artifact_path.display()
            ))
        }
        other => other,
    })?;

    let instance_id = instance_override.unwrap_or(&artifact.instance_id);
    let instance = instances.find(instance_id).ok_or_else(|| {
        SavepointError::NotFound(format!("instance '{}'", instance_id))
    })?;

    // A stale or redirected instance definition must not feed a dump
    // through the wrong engine's rewrite rules and client.
    if instance.engine != artifact.engine {
        return Err(SavepointError::Config(format!(
            "artifact was dumped by the {} engine but instance '{}' is {}",
            artifact.engine, instance.id, instance.engine
        )));
    }

    let target = target_override.unwrap_or(&artifact.target);
    let conn = resolve::resolve(instance, vault)?;
    let adapter = adapter_for(instance.engine);
    let timeout = Duration::from_secs(cfg.dump_timeout_secs);

    let mut result = CmdResult::default();
    // Replay the file the caller pointed at, not the path recorded in
    // the sidecar; the artifact tree may have been relocated.
    let warnings = restore_artifact(
        artifact_path,
        &artifact.checksum,
        instance,
        &conn,
        adapter.as_ref(),
        target,
        timeout,
    )?;
    for warning in warnings {
        result.add_message(CmdMessage::warning(warning));
    }

    verify_restore(instance, &conn, target, artifact.expected_object_count, &mut result);

    result.add_message(CmdMessage::success(format!(
        "Restored {} into '{}' on instance '{}'.",
        artifact_path.display(),
        target,
        instance.id
    )));
    Ok(result)
}

/// Core replay: checksum check, payload preparation, adapter dispatch.
/// Returns the rewrite warnings (dropped statements and the like).
pub fn restore_artifact(
    artifact_path: &Path,
    expected_checksum: &str,
    instance: &Instance,
    conn: &ResolvedConnection,
    adapter: &dyn EngineAdapter,
    target: &str,
    timeout: Duration,
) -> Result<Vec<String>> {
    if !artifact_path.exists() {
        return Err(SavepointError::NotFound(format!(
            "artifact {}",
            artifact_path.display()
        )));
    }

    let actual = sha256_file(artifact_path)?;
    if actual != expected_checksum {
        return Err(SavepointError::Adapter(format!(
            "artifact {} failed checksum verification; refusing to restore",
            artifact_path.display()
        )));
    }

    info!(instance = %instance.id, target = %target, artifact = %artifact_path.display(), "starting restore");

    match instance.engine {
        EngineKind::Files => {
            adapter.restore_target(conn, RestorePayload::Archive(artifact_path), target, timeout)?;
            Ok(Vec::new())
        }
        EngineKind::Mysql | EngineKind::Postgresql => {
            let script = gunzip_to_string(artifact_path)?;
            let outcome = rewrite_script(&script, target, instance.engine)?;
            adapter.restore_target(
                conn,
                RestorePayload::Script(&outcome.script),
                target,
                timeout,
            )?;
            Ok(outcome.warnings)
        }
    }
}

/// List every restorable artifact under the storage root, newest first,
/// optionally narrowed to one instance.
pub fn list(cfg: &ToolConfig, paths: &SavepointPaths, instance_id: Option<&str>) -> Result<CmdResult> {
    let scan = scan_artifacts(&cfg.storage_root(paths))?;

    let mut result = CmdResult::default();
    for warning in scan.warnings {
        result.add_message(CmdMessage::warning(warning));
    }

    let artifacts: Vec<_> = scan
        .artifacts
        .into_iter()
        .filter(|a| instance_id.map(|id| a.instance_id == id).unwrap_or(true))
        .collect();

    if artifacts.is_empty() {
        result.add_message(CmdMessage::info("No artifacts found."));
    }
    Ok(result.with_artifacts(artifacts))
}

fn gunzip_to_string(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(SavepointError::Io)?;
    let mut decoder = GzDecoder::new(file);
    let mut script = String::new();
    decoder
        .read_to_string(&mut script)
        .map_err(SavepointError::Io)?;
    Ok(script)
}

/// Post-restore count check for the files engine. A mismatch is worth a
/// warning, not a failure: the data is already on disk.
fn verify_restore(
    instance: &Instance,
    conn: &ResolvedConnection,
    target: &str,
    expected_object_count: Option<u64>,
    result: &mut CmdResult,
) {
    if instance.engine != EngineKind::Files {
        return;
    }
    let (Some(root), Some(expected)) = (conn.root_path.as_ref(), expected_object_count) else {
        return;
    };

    let actual = WalkDir::new(root.join(target))
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count() as u64;

    if actual != expected {
        result.add_message(CmdMessage::warning(format!(
            "restored {} file(s) but the artifact recorded {}",
            actual, expected
        )));
    }
}
