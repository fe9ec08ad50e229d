//! # Backup Orchestration
//!
//! Drives the per-instance state machine:
//!
//! `ResolvingCredentials → Connecting → Listing → Filtering →
//! Dumping(target)* → Finalizing`
//!
//! Failure isolation is the whole point of the shape here. A failing
//! pre-dump phase fails that instance and nothing else; a failing target
//! dump is recorded and its siblings still run. The run's status is
//! `success` only when every target succeeded, `partial` when some did,
//! `failed` when none did or a pre-dump phase broke.

use chrono::Utc;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::helpers::{artifact_dest, write_sidecar};
use super::{BackupReport, CmdMessage, CmdResult, FailureDetail};
use crate::adapter::{adapter_for, EngineAdapter};
use crate::config::{SavepointPaths, ToolConfig};
use crate::error::{ErrorCategory, Result, SavepointError};
use crate::filter::effective_targets;
use crate::model::{Artifact, ArtifactStatus, Instance, RunStatus};
use crate::resolve;
use crate::vault::VaultStore;

/// Back up every given instance, isolating failures at the instance
/// boundary. Disabled instances are skipped with a note.
pub fn run(
    instances: &[Instance],
    vault: &VaultStore,
    cfg: &ToolConfig,
    paths: &SavepointPaths,
) -> Result<CmdResult> {
    let storage_root = cfg.storage_root(paths);
    let timeout = Duration::from_secs(cfg.dump_timeout_secs);
    let mut result = CmdResult::default();

    for instance in instances {
        if !instance.enabled {
            result.add_message(CmdMessage::info(format!(
                "Instance '{}' is disabled, skipping.",
                instance.id
            )));
            continue;
        }

        let adapter = adapter_for(instance.engine);
        let report = backup_instance(instance, vault, adapter.as_ref(), &storage_root, timeout);
        summarize(&report, &mut result);
        result.reports.push(report);
    }

    Ok(result)
}

/// Run the state machine for one instance. Never returns `Err`: every
/// failure lands in the report so sibling instances keep running.
pub fn backup_instance(
    instance: &Instance,
    vault: &VaultStore,
    adapter: &dyn EngineAdapter,
    storage_root: &Path,
    timeout: Duration,
) -> BackupReport {
    let run_id = Uuid::new_v4();
    let mut report = BackupReport {
        run_id,
        instance_id: instance.id.clone(),
        status: RunStatus::Failed,
        artifacts: Vec::new(),
        failures: Vec::new(),
    };

    info!(instance = %instance.id, run = %run_id, "starting backup run");

    // ResolvingCredentials
    let conn = match resolve::resolve(instance, vault) {
        Ok(conn) => conn,
        Err(e) => return phase_failure(report, "resolving-credentials", e),
    };

    // Connecting
    if let Err(e) = adapter.test_connection(&conn) {
        return phase_failure(report, "connecting", e);
    }

    // Listing
    let all_targets = match adapter.list_targets(&conn) {
        Ok(targets) => targets,
        Err(e) => return phase_failure(report, "listing", e),
    };

    // Filtering
    let targets = effective_targets(
        &all_targets,
        &instance.whitelist,
        &instance.blacklist,
        adapter.system_excludes(),
    );
    info!(
        instance = %instance.id,
        total = all_targets.len(),
        effective = targets.len(),
        "resolved effective target set"
    );

    if targets.is_empty() {
        report.status = RunStatus::Success;
        return report;
    }

    // Dumping: each target independent, best effort.
    for target in &targets {
        let created_at = Utc::now();
        let dest = artifact_dest(storage_root, &instance.id, target, instance.engine, created_at);

        match adapter.dump_target(&conn, target, &dest, timeout) {
            Ok(output) => {
                let artifact = Artifact {
                    instance_id: instance.id.clone(),
                    target: target.clone(),
                    engine: instance.engine,
                    created_at,
                    storage_path: dest,
                    size_bytes: output.size_bytes,
                    checksum: output.checksum.clone(),
                    compression_ratio: output.compression_ratio(),
                    status: ArtifactStatus::Success,
                    expected_object_count: output.object_count,
                };
                // Finalizing: the artifact is immutable once its sidecar
                // exists.
                if let Err(e) = write_sidecar(&artifact) {
                    report.failures.push(FailureDetail {
                        scope: target.clone(),
                        category: e.category(),
                        message: format!("dump succeeded but metadata write failed: {}", e),
                    });
                    continue;
                }
                info!(
                    instance = %instance.id,
                    target = %target,
                    bytes = artifact.size_bytes,
                    "target dumped"
                );
                report.artifacts.push(artifact);
            }
            Err(e) => {
                warn!(instance = %instance.id, target = %target, error = %e, "target dump failed");
                report.failures.push(FailureDetail {
                    scope: target.clone(),
                    category: e.category(),
                    message: e.to_string(),
                });
            }
        }
    }

    report.status = if report.failures.is_empty() {
        RunStatus::Success
    } else if report.artifacts.is_empty() {
        RunStatus::Failed
    } else {
        RunStatus::Partial
    };
    report
}

fn phase_failure(mut report: BackupReport, phase: &str, e: SavepointError) -> BackupReport {
    warn!(instance = %report.instance_id, phase, error = %e, "backup run failed before dumping");
    report.failures.push(FailureDetail {
        scope: phase.to_string(),
        category: e.category(),
        message: e.to_string(),
    });
    report.status = RunStatus::Failed;
    report
}

fn summarize(report: &BackupReport, result: &mut CmdResult) {
    match report.status {
        RunStatus::Success => result.add_message(CmdMessage::success(format!(
            "Instance '{}': {} target(s) backed up.",
            report.instance_id,
            report.artifacts.len()
        ))),
        RunStatus::Partial => result.add_message(CmdMessage::warning(format!(
            "Instance '{}': {} target(s) backed up, {} failed.",
            report.instance_id,
            report.artifacts.len(),
            report.failures.len()
        ))),
        RunStatus::Failed => result.add_message(CmdMessage::error(format!(
            "Instance '{}': backup failed ({}).",
            report.instance_id,
            report
                .failures
                .first()
                .map(|f| f.message.as_str())
                .unwrap_or("unknown error")
        ))),
    }
    for failure in &report.failures {
        result.add_message(CmdMessage::error(format!(
            "  {}: {}",
            failure.scope, failure.message
        )));
    }
}

/// Exit code for a whole run. All success → 0; anything salvaged → 5
/// (partial); a total loss reports the first failure's category.
pub fn exit_code_for(reports: &[BackupReport]) -> i32 {
    if reports.iter().all(|r| r.status == RunStatus::Success) {
        return 0;
    }
    let any_success = reports
        .iter()
        .any(|r| r.status != RunStatus::Failed || !r.artifacts.is_empty());
    if any_success {
        return ErrorCategory::PartialBackup.exit_code();
    }
    reports
        .iter()
        .flat_map(|r| r.failures.first())
        .map(|f| f.category.exit_code())
        .next()
        .unwrap_or(1)
}
