//! Apply the retention policy to the storage root.
//!
//! The plan is recomputed from the artifacts on disk every time; nothing
//! about bucket membership is persisted. Groups whose metadata cannot be
//! read are excluded from planning entirely and left untouched, with a
//! warning, until someone repairs or removes the broken sidecars.

use std::fs;
use tracing::info;

use super::helpers::{scan_artifacts, sidecar_path};
use super::{CmdMessage, CmdResult, RetentionSummary};
use crate::config::{SavepointPaths, ToolConfig};
use crate::error::{Result, SavepointError};
use crate::retention;

pub fn run(cfg: &ToolConfig, paths: &SavepointPaths, dry_run: bool) -> Result<CmdResult> {
    let storage_root = cfg.storage_root(paths);
    let scan = scan_artifacts(&storage_root)?;

    let mut result = CmdResult::default();
    for warning in &scan.warnings {
        result.add_message(CmdMessage::warning(warning.clone()));
    }
    for (instance, target) in &scan.poisoned_groups {
        result.add_message(CmdMessage::warning(format!(
            "skipping retention for {}/{}: unreadable artifact metadata in the group",
            instance, target
        )));
    }

    let plannable: Vec<_> = scan
        .artifacts
        .into_iter()
        .filter(|a| {
            !scan
                .poisoned_groups
                .contains(&(a.instance_id.clone(), a.target.clone()))
        })
        .collect();

    let plan = retention::plan(&plannable, &cfg.retention);
    info!(
        keep = plan.keep.len(),
        delete = plan.delete.len(),
        dry_run,
        "computed retention plan"
    );

    let mut summary = RetentionSummary {
        kept: plan.keep.len(),
        deleted: 0,
        freed_bytes: 0,
        dry_run,
    };

    for artifact in &plan.delete {
        if dry_run {
            result.add_message(CmdMessage::info(format!(
                "would delete {} ({} bytes)",
                artifact.storage_path.display(),
                artifact.size_bytes
            )));
            summary.deleted += 1;
            summary.freed_bytes += artifact.size_bytes;
            continue;
        }

        // Sidecar goes first so an interrupted prune never leaves
        // metadata pointing at a missing artifact.
        fs::remove_file(sidecar_path(&artifact.storage_path)).map_err(SavepointError::Io)?;
        fs::remove_file(&artifact.storage_path).map_err(SavepointError::Io)?;
        summary.deleted += 1;
        summary.freed_bytes += artifact.size_bytes;
        info!(artifact = %artifact.storage_path.display(), "pruned artifact");
    }

    let verb = if dry_run { "would delete" } else { "deleted" };
    result.add_message(CmdMessage::success(format!(
        "Retention: kept {}, {} {} artifact(s), {} bytes freed.",
        summary.kept, verb, summary.deleted, summary.freed_bytes
    )));
    result.retention = Some(summary);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::helpers::write_sidecar;
    use crate::model::{Artifact, ArtifactStatus, EngineKind};
    use crate::retention::RetentionPolicy;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::path::Path;

    fn seed_artifact(root: &Path, instance: &str, target: &str, age_days: i64) -> Artifact {
        let created_at = Utc::now() - ChronoDuration::days(age_days);
        let leaf = root.join(format!(
            "host/{}/{}/{}",
            instance,
            target,
            created_at.format("%Y-%m-%d")
        ));
        fs::create_dir_all(&leaf).unwrap();
        let path = leaf.join(format!(
            "{}_mysql_{}.sql.gz",
            created_at.format("%Y%m%dT%H%M%S"),
            target
        ));
        fs::write(&path, b"gzip-bytes").unwrap();

        let artifact = Artifact {
            instance_id: instance.to_string(),
            target: target.to_string(),
            engine: EngineKind::Mysql,
            created_at,
            storage_path: path,
            size_bytes: 10,
            checksum: "00".repeat(32),
            compression_ratio: 1.0,
            status: ArtifactStatus::Success,
            expected_object_count: None,
        };
        write_sidecar(&artifact).unwrap();
        artifact
    }

    fn setup(daily: usize) -> (tempfile::TempDir, SavepointPaths, ToolConfig) {
        let dir = tempfile::tempdir().unwrap();
        let paths = SavepointPaths::new(dir.path().to_path_buf());
        let mut cfg = ToolConfig::default();
        cfg.retention = RetentionPolicy {
            daily,
            weekly: 0,
            monthly: 0,
        };
        (dir, paths, cfg)
    }

    #[test]
    fn dry_run_reports_without_deleting() {
        let (_dir, paths, cfg) = setup(2);
        let root = cfg.storage_root(&paths);
        let artifacts: Vec<_> = (0..4)
            .map(|age| seed_artifact(&root, "db1", "app", age))
            .collect();

        let result = run(&cfg, &paths, true).unwrap();
        let summary = result.retention.as_ref().unwrap();
        assert!(summary.dry_run);
        assert_eq!(summary.kept, 2);
        assert_eq!(summary.deleted, 2);
        assert_eq!(summary.freed_bytes, 20);

        for a in &artifacts {
            assert!(a.storage_path.exists());
        }
    }

    #[test]
    fn prune_deletes_artifact_and_sidecar() {
        let (_dir, paths, cfg) = setup(1);
        let root = cfg.storage_root(&paths);
        let newest = seed_artifact(&root, "db1", "app", 0);
        let old = seed_artifact(&root, "db1", "app", 5);

        let result = run(&cfg, &paths, false).unwrap();
        let summary = result.retention.as_ref().unwrap();
        assert_eq!(summary.deleted, 1);

        assert!(newest.storage_path.exists());
        assert!(sidecar_path(&newest.storage_path).exists());
        assert!(!old.storage_path.exists());
        assert!(!sidecar_path(&old.storage_path).exists());
    }

    #[test]
    fn poisoned_group_is_left_alone() {
        let (_dir, paths, cfg) = setup(1);
        let root = cfg.storage_root(&paths);
        let old = seed_artifact(&root, "db1", "app", 5);
        seed_artifact(&root, "db1", "app", 0);

        // A second group with one broken sidecar and one stale artifact.
        let stale = seed_artifact(&root, "db2", "other", 9);
        let broken_dir = root.join("host/db2/other/2026-01-01");
        fs::create_dir_all(&broken_dir).unwrap();
        fs::write(broken_dir.join("b.sql.gz.meta.json"), b"{garbage").unwrap();

        let result = run(&cfg, &paths, false).unwrap();

        // db1 pruned normally, db2 untouched.
        assert!(!old.storage_path.exists());
        assert!(stale.storage_path.exists());
        assert!(result
            .messages
            .iter()
            .any(|m| m.content.contains("skipping retention for db2/other")));
    }

    #[test]
    fn most_recent_survives_zero_policy() {
        let (_dir, paths, mut cfg) = setup(0);
        cfg.retention = RetentionPolicy {
            daily: 0,
            weekly: 0,
            monthly: 0,
        };
        let root = cfg.storage_root(&paths);
        let newest = seed_artifact(&root, "db1", "app", 1);
        let old = seed_artifact(&root, "db1", "app", 30);

        run(&cfg, &paths, false).unwrap();
        assert!(newest.storage_path.exists());
        assert!(!old.storage_path.exists());
    }

    #[test]
    fn empty_storage_root_is_a_noop() {
        let (_dir, paths, cfg) = setup(2);
        let result = run(&cfg, &paths, false).unwrap();
        let summary = result.retention.as_ref().unwrap();
        assert_eq!(summary.kept, 0);
        assert_eq!(summary.deleted, 0);
    }
}
