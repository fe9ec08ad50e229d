//! Business logic for each command. Pure with respect to terminal I/O:
//! everything returns a [`CmdResult`] and never prints.

use crate::error::ErrorCategory;
use crate::model::{Artifact, Instance, RunStatus};
use crate::vault::{CredentialSummary, VaultInfo};
use uuid::Uuid;

pub mod backup;
pub mod config;
pub mod helpers;
pub mod instance;
pub mod prune;
pub mod restore;
pub mod test_conn;
pub mod vault;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// One failed step inside a backup run, scoped to a target or a
/// pre-dump phase. Carries the error category so callers can pick an
/// exit code without parsing messages.
#[derive(Debug, Clone)]
pub struct FailureDetail {
    pub scope: String,
    pub category: ErrorCategory,
    pub message: String,
}

/// Outcome of one instance's backup run.
#[derive(Debug)]
pub struct BackupReport {
    pub run_id: Uuid,
    pub instance_id: String,
    pub status: RunStatus,
    pub artifacts: Vec<Artifact>,
    pub failures: Vec<FailureDetail>,
}

#[derive(Debug, Default)]
pub struct RetentionSummary {
    pub kept: usize,
    pub deleted: usize,
    pub freed_bytes: u64,
    pub dry_run: bool,
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub messages: Vec<CmdMessage>,
    pub credentials: Vec<CredentialSummary>,
    pub vault_info: Option<VaultInfo>,
    pub instances: Vec<Instance>,
    pub artifacts: Vec<Artifact>,
    pub reports: Vec<BackupReport>,
    pub retention: Option<RetentionSummary>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_credentials(mut self, credentials: Vec<CredentialSummary>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_instances(mut self, instances: Vec<Instance>) -> Self {
        self.instances = instances;
        self
    }

    pub fn with_artifacts(mut self, artifacts: Vec<Artifact>) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// Exit code for a finished invocation: backup reports dominate, the
    /// worst message level breaks ties.
    pub fn exit_code(&self) -> i32 {
        if !self.reports.is_empty() {
            return backup::exit_code_for(&self.reports);
        }
        if self
            .messages
            .iter()
            .any(|m| m.level == MessageLevel::Error)
        {
            return 1;
        }
        0
    }
}
