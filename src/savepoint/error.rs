use thiserror::Error;

#[derive(Error, Debug)]
pub enum SavepointError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credential resolution failed for '{credential}': {detail}")]
    CredentialResolution { credential: String, detail: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Partial backup failure: {0}")]
    PartialBackup(String),

    #[error("Restore rewrite error: {0}")]
    RestoreRewrite(String),

    #[error("Retention computation error: {0}")]
    RetentionComputation(String),

    #[error("Vault error: {0}")]
    Vault(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Adapter error: {0}")]
    Adapter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure category used by callers (and scripts driving the binary)
/// to branch on what went wrong without parsing error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Credential,
    Connection,
    PartialBackup,
    Other,
}

impl ErrorCategory {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorCategory::Config => 2,
            ErrorCategory::Credential => 3,
            ErrorCategory::Connection => 4,
            ErrorCategory::PartialBackup => 5,
            ErrorCategory::Other => 1,
        }
    }
}

impl SavepointError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SavepointError::Config(_) => ErrorCategory::Config,
            SavepointError::CredentialResolution { .. } | SavepointError::Decryption(_) => {
                ErrorCategory::Credential
            }
            SavepointError::Connection(_) => ErrorCategory::Connection,
            SavepointError::PartialBackup(_) => ErrorCategory::PartialBackup,
            _ => ErrorCategory::Other,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }
}

pub type Result<T> = std::result::Result<T, SavepointError>;
