use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Mysql,
    Postgresql,
    Files,
}

impl EngineKind {
    /// File extension for artifacts produced by this engine.
    pub fn artifact_ext(self) -> &'static str {
        match self {
            EngineKind::Mysql | EngineKind::Postgresql => "sql.gz",
            EngineKind::Files => "tar.gz",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineKind::Mysql => "mysql",
            EngineKind::Postgresql => "postgresql",
            EngineKind::Files => "files",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "mysql" => Ok(EngineKind::Mysql),
            "postgresql" | "postgres" => Ok(EngineKind::Postgresql),
            "files" => Ok(EngineKind::Files),
            other => Err(format!("Unknown engine type: {}", other)),
        }
    }
}

/// One configured backup source: a database server or a filesystem root,
/// plus its target filters. The credential is a weak reference into the
/// vault, resolved at run time and never cached to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub engine: EngineKind,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub credential_name: String,
    /// Root directory for the files engine; unused for SQL engines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_path: Option<PathBuf>,
    /// Non-empty whitelist overrides the blacklist entirely.
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default)]
    pub ssl_enabled: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialMetadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
}

impl CredentialMetadata {
    pub fn new(description: String) -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            description,
        }
    }
}

/// A named credential. The password is plaintext only inside decrypted
/// vault memory; on disk it exists only as part of the vault ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub username: String,
    pub password: String,
    pub metadata: CredentialMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    Success,
    Partial,
    Failed,
}

/// One finalized backup output file plus its metadata. Immutable once
/// written; persisted as a `.meta.json` sidecar beside the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub instance_id: String,
    pub target: String,
    pub engine: EngineKind,
    pub created_at: DateTime<Utc>,
    pub storage_path: PathBuf,
    pub size_bytes: u64,
    pub checksum: String,
    pub compression_ratio: f64,
    pub status: ArtifactStatus,
    /// Entry count for archive artifacts, used for post-restore verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_object_count: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}
