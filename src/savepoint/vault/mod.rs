//! # Credential Vault
//!
//! An encrypted, versioned key/value store of connection credentials,
//! kept strictly separate from plaintext instance configuration.
//!
//! The vault is persisted as a single encrypted file. Its invariant: the
//! file is either fully valid ciphertext of a well-formed JSON document
//! or does not exist. Every mutation decrypts the whole document,
//! applies the change in memory, re-encrypts, and writes atomically
//! (temp file + rename) while holding an exclusive [`lock::VaultLock`].
//! Reads take no lock — a reader always sees a complete ciphertext
//! snapshot.
//!
//! Secrets never leave the store unless a caller passes an explicit
//! reveal flag; listing returns metadata only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SavepointError};
use crate::model::{Credential, CredentialMetadata};

pub mod crypto;
pub mod lock;

use crypto::EncryptionService;
use lock::VaultLock;

const VAULT_VERSION: u32 = 1;

/// Decrypted vault document. Exists only in memory.
#[derive(Debug, Serialize, Deserialize)]
struct VaultDocument {
    version: u32,
    credentials: BTreeMap<String, StoredCredential>,
}

impl Default for VaultDocument {
    fn default() -> Self {
        Self {
            version: VAULT_VERSION,
            credentials: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCredential {
    username: String,
    password: String,
    metadata: CredentialMetadata,
}

/// Metadata-only view of a credential, safe to list and log.
#[derive(Debug, Clone)]
pub struct CredentialSummary {
    pub id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VaultInfo {
    pub credential_count: usize,
    pub file_size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

pub struct VaultStore {
    path: PathBuf,
    crypto: EncryptionService,
}

impl VaultStore {
    /// Open the vault at `path`, keyed to the local host identity. The
    /// file is created lazily on the first mutation.
    pub fn open(path: PathBuf) -> Result<Self> {
        Ok(Self {
            path,
            crypto: EncryptionService::for_local_host()?,
        })
    }

    /// Open with an explicit host identity. Used by tests to simulate a
    /// vault file moved between machines.
    pub fn open_with_identity(path: PathBuf, identity: &str) -> Self {
        Self {
            path,
            crypto: EncryptionService::with_host_identity(identity),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Upsert a credential. Preserves `created_at` on update; refreshes
    /// `updated_at` either way.
    pub fn set(
        &self,
        id: &str,
        username: &str,
        password: &str,
        description: &str,
    ) -> Result<()> {
        if id.is_empty() {
            return Err(SavepointError::Vault(
                "credential id cannot be empty".to_string(),
            ));
        }

        let _lock = VaultLock::acquire(&self.path)?;
        let mut doc = self.load_document()?;

        let metadata = match doc.credentials.get(id) {
            Some(existing) => CredentialMetadata {
                created_at: existing.metadata.created_at,
                updated_at: Utc::now(),
                description: description.to_string(),
            },
            None => CredentialMetadata::new(description.to_string()),
        };

        doc.credentials.insert(
            id.to_string(),
            StoredCredential {
                username: username.to_string(),
                password: password.to_string(),
                metadata,
            },
        );

        self.persist(&doc)
    }

    /// Fetch a credential. The password is blanked unless `reveal` is
    /// set; internal callers (the resolver) pass `true`.
    pub fn get(&self, id: &str, reveal: bool) -> Result<Credential> {
        let doc = self.load_document()?;
        let stored = doc
            .credentials
            .get(id)
            .ok_or_else(|| SavepointError::NotFound(format!("credential '{}'", id)))?;

        Ok(Credential {
            id: id.to_string(),
            username: stored.username.clone(),
            password: if reveal {
                stored.password.clone()
            } else {
                String::new()
            },
            metadata: stored.metadata.clone(),
        })
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        let _lock = VaultLock::acquire(&self.path)?;
        let mut doc = self.load_document()?;
        if doc.credentials.remove(id).is_none() {
            return Err(SavepointError::NotFound(format!("credential '{}'", id)));
        }
        self.persist(&doc)
    }

    /// Metadata for every credential, sorted by id. Never contains secrets.
    pub fn list(&self) -> Result<Vec<CredentialSummary>> {
        let doc = self.load_document()?;
        Ok(doc
            .credentials
            .iter()
            .map(|(id, stored)| CredentialSummary {
                id: id.clone(),
                description: stored.metadata.description.clone(),
                created_at: stored.metadata.created_at,
                updated_at: stored.metadata.updated_at,
            })
            .collect())
    }

    pub fn info(&self) -> Result<VaultInfo> {
        let doc = self.load_document()?;
        let (file_size, last_modified) = match fs::metadata(&self.path) {
            Ok(meta) => (meta.len(), meta.modified().ok().map(DateTime::from)),
            Err(_) => (0, None),
        };
        Ok(VaultInfo {
            credential_count: doc.credentials.len(),
            file_size,
            last_modified,
        })
    }

    fn load_document(&self) -> Result<VaultDocument> {
        if !self.path.exists() {
            return Ok(VaultDocument::default());
        }
        let blob = fs::read(&self.path).map_err(SavepointError::Io)?;
        let plaintext = self.crypto.decrypt(&blob)?;
        let doc: VaultDocument = serde_json::from_slice(&plaintext)?;
        Ok(doc)
    }

    /// Re-encrypt and atomically replace the vault file. The temp file is
    /// created owner-only before any ciphertext lands in it.
    fn persist(&self, doc: &VaultDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(SavepointError::Io)?;
        }

        let plaintext = serde_json::to_vec(doc)?;
        let blob = self.crypto.encrypt(&plaintext)?;

        let tmp = self.path.with_extension("tmp");
        write_private(&tmp, &blob)?;
        fs::rename(&tmp, &self.path).map_err(SavepointError::Io)?;
        Ok(())
    }
}

#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(SavepointError::Io)?;
    file.write_all(bytes).map_err(SavepointError::Io)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(SavepointError::Io)
}
