//! Process-wide exclusive lock for vault mutations.
//!
//! Every vault mutation is a decrypt-modify-encrypt-write cycle over the
//! whole file, so concurrent writers would silently drop each other's
//! changes. The lock is a sibling lock file created with `create_new`,
//! which is atomic on every platform we care about; the guard removes it
//! on drop.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{Result, SavepointError};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_INTERVAL: Duration = Duration::from_millis(100);

pub struct VaultLock {
    path: PathBuf,
}

impl VaultLock {
    /// Acquire the lock for the vault at `vault_path`, waiting up to ten
    /// seconds for a concurrent writer to finish.
    pub fn acquire(vault_path: &Path) -> Result<Self> {
        Self::acquire_with_timeout(vault_path, ACQUIRE_TIMEOUT)
    }

    fn acquire_with_timeout(vault_path: &Path, timeout: Duration) -> Result<Self> {
        let path = lock_path(vault_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(SavepointError::Io)?;
        }

        let deadline = Instant::now() + timeout;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let _ = write!(file, "{}", std::process::id());
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(SavepointError::Vault(format!(
                            "vault is locked by another process (lock file: {})",
                            path.display()
                        )));
                    }
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err(e) => return Err(SavepointError::Io(e)),
            }
        }
    }
}

impl Drop for VaultLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn lock_path(vault_path: &Path) -> PathBuf {
    let mut name = vault_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vault".to_string());
    name.push_str(".lock");
    vault_path.with_file_name(name)
}
