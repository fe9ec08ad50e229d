//! Show and edit tool-level settings: storage root, retention quotas,
//! dump timeout.

use std::path::PathBuf;

use super::{CmdMessage, CmdResult};
use crate::config::{SavepointPaths, ToolConfig};
use crate::error::Result;

pub fn show(cfg: &ToolConfig, paths: &SavepointPaths) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::info(format!(
        "home:           {}",
        paths.home.display()
    )));
    result.add_message(CmdMessage::info(format!(
        "storage_root:   {}",
        cfg.storage_root(paths).display()
    )));
    result.add_message(CmdMessage::info(format!(
        "retention:      {} daily / {} weekly / {} monthly",
        cfg.retention.daily, cfg.retention.weekly, cfg.retention.monthly
    )));
    result.add_message(CmdMessage::info(format!(
        "dump timeout:   {}s",
        cfg.dump_timeout_secs
    )));
    Ok(result)
}

pub struct ConfigUpdate {
    pub storage_root: Option<PathBuf>,
    pub daily: Option<usize>,
    pub weekly: Option<usize>,
    pub monthly: Option<usize>,
    pub dump_timeout_secs: Option<u64>,
}

impl ConfigUpdate {
    fn is_empty(&self) -> bool {
        self.storage_root.is_none()
            && self.daily.is_none()
            && self.weekly.is_none()
            && self.monthly.is_none()
            && self.dump_timeout_secs.is_none()
    }
}

pub fn set(paths: &SavepointPaths, update: ConfigUpdate) -> Result<CmdResult> {
    let mut cfg = ToolConfig::load(paths)?;
    let mut result = CmdResult::default();

    if update.is_empty() {
        result.add_message(CmdMessage::info("Nothing to change."));
        return Ok(result);
    }

    if let Some(root) = update.storage_root {
        cfg.storage_root = Some(root);
    }
    if let Some(daily) = update.daily {
        cfg.retention.daily = daily;
    }
    if let Some(weekly) = update.weekly {
        cfg.retention.weekly = weekly;
    }
    if let Some(monthly) = update.monthly {
        cfg.retention.monthly = monthly;
    }
    if let Some(timeout) = update.dump_timeout_secs {
        cfg.dump_timeout_secs = timeout;
    }

    cfg.save(paths)?;
    result.add_message(CmdMessage::success("Configuration updated."));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_persists_only_the_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SavepointPaths::new(dir.path().to_path_buf());

        set(
            &paths,
            ConfigUpdate {
                storage_root: None,
                daily: Some(3),
                weekly: None,
                monthly: None,
                dump_timeout_secs: Some(120),
            },
        )
        .unwrap();

        let cfg = ToolConfig::load(&paths).unwrap();
        assert_eq!(cfg.retention.daily, 3);
        assert_eq!(cfg.retention.weekly, 4);
        assert_eq!(cfg.dump_timeout_secs, 120);
        assert!(cfg.storage_root.is_none());
    }

    #[test]
    fn empty_update_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SavepointPaths::new(dir.path().to_path_buf());

        let result = set(
            &paths,
            ConfigUpdate {
                storage_root: None,
                daily: None,
                weekly: None,
                monthly: None,
                dump_timeout_secs: None,
            },
        )
        .unwrap();
        assert!(result.messages[0].content.contains("Nothing"));
        assert!(!paths.config_path().exists());
    }

    #[test]
    fn show_reports_effective_storage_root() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SavepointPaths::new(dir.path().to_path_buf());
        let cfg = ToolConfig::default();

        let result = show(&cfg, &paths).unwrap();
        let joined: String = result
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(joined.contains("backups"));
        assert!(joined.contains("7 daily / 4 weekly / 6 monthly"));
    }
}
