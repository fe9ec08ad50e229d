//! Artifact path construction and sidecar handling shared by the
//! backup, restore, and prune commands.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Result, SavepointError};
use crate::model::{Artifact, EngineKind};

pub const SIDECAR_SUFFIX: &str = ".meta.json";

pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .map(|h| h.to_string_lossy().into_owned())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Deterministic artifact path:
/// `{root}/{hostname}/{instance}/{target}/{date}/{timestamp}_{engine}_{target}.{ext}`.
/// The timestamp carries microseconds, so concurrent runs of the same
/// instance and target on one host still land on distinct paths.
pub fn artifact_dest(
    storage_root: &Path,
    instance_id: &str,
    target: &str,
    engine: EngineKind,
    created_at: DateTime<Utc>,
) -> PathBuf {
    storage_root
        .join(local_hostname())
        .join(instance_id)
        .join(target)
        .join(created_at.format("%Y-%m-%d").to_string())
        .join(format!(
            "{}_{}_{}.{}",
            created_at.format("%Y%m%dT%H%M%S%6f"),
            engine,
            target,
            engine.artifact_ext()
        ))
}

pub fn sidecar_path(artifact_path: &Path) -> PathBuf {
    let mut name = artifact_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(SIDECAR_SUFFIX);
    artifact_path.with_file_name(name)
}

pub fn write_sidecar(artifact: &Artifact) -> Result<()> {
    let path = sidecar_path(&artifact.storage_path);
    let content = serde_json::to_string_pretty(artifact)?;
    fs::write(path, content).map_err(SavepointError::Io)?;
    Ok(())
}

pub fn read_sidecar(artifact_path: &Path) -> Result<Artifact> {
    let path = sidecar_path(artifact_path);
    let content = fs::read_to_string(&path).map_err(SavepointError::Io)?;
    let artifact = serde_json::from_str(&content)?;
    Ok(artifact)
}

pub struct ArtifactScan {
    pub artifacts: Vec<Artifact>,
    /// (instance, target) groups with at least one unreadable sidecar;
    /// retention must not prune them.
    pub poisoned_groups: HashSet<(String, String)>,
    pub warnings: Vec<String>,
}

/// Walk the storage root and load every artifact sidecar. Groups with
/// malformed metadata are reported, not guessed at.
pub fn scan_artifacts(storage_root: &Path) -> Result<ArtifactScan> {
    let mut scan = ArtifactScan {
        artifacts: Vec::new(),
        poisoned_groups: HashSet::new(),
        warnings: Vec::new(),
    };

    if !storage_root.exists() {
        return Ok(scan);
    }

    for entry in WalkDir::new(storage_root) {
        let entry =
            entry.map_err(|e| SavepointError::RetentionComputation(format!("scan failed: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !name.ends_with(SIDECAR_SUFFIX) {
            continue;
        }

        let content = fs::read_to_string(entry.path()).map_err(SavepointError::Io)?;
        match serde_json::from_str::<Artifact>(&content) {
            Ok(artifact) => scan.artifacts.push(artifact),
            Err(e) => {
                scan.warnings.push(format!(
                    "unreadable artifact metadata at {}: {}",
                    entry.path().display(),
                    e
                ));
                if let Some(group) = group_from_path(storage_root, entry.path()) {
                    scan.poisoned_groups.insert(group);
                }
            }
        }
    }

    scan.artifacts
        .sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(scan)
}

/// Recover (instance, target) from the fixed path layout when the
/// sidecar itself cannot be trusted.
fn group_from_path(storage_root: &Path, sidecar: &Path) -> Option<(String, String)> {
    let rel = sidecar.strip_prefix(storage_root).ok()?;
    let mut components = rel.components().map(|c| c.as_os_str().to_string_lossy());
    let _hostname = components.next()?;
    let instance = components.next()?.into_owned();
    let target = components.next()?.into_owned();
    Some((instance, target))
}
