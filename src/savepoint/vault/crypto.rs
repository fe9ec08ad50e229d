//! Symmetric encryption for the vault file.
//!
//! The key is derived deterministically from the machine hostname, so a
//! vault file copied to a different host fails decryption instead of
//! producing garbage — AES-GCM's authentication tag makes the check
//! structural. There is no external key management on purpose; the vault
//! is host-bound and that limitation is part of its contract.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use sha2::{Digest, Sha256};

use crate::error::{Result, SavepointError};

/// Magic prefix + format version, so foreign files fail fast with a
/// readable error instead of an AEAD failure.
const MAGIC: &[u8; 8] = b"SVPVLT01";
const NONCE_LEN: usize = 12;
const KEY_CONTEXT: &[u8] = b"savepoint-vault-key-v1";

pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl EncryptionService {
    /// Build the service keyed to this machine's hostname.
    pub fn for_local_host() -> Result<Self> {
        let host = hostname::get()
            .map_err(SavepointError::Io)?
            .to_string_lossy()
            .into_owned();
        Ok(Self::with_host_identity(&host))
    }

    /// Build the service from an explicit host identity string.
    pub fn with_host_identity(identity: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(KEY_CONTEXT);
        hasher.update(identity.as_bytes());
        let digest = hasher.finalize();
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| SavepointError::Vault("encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>> {
        if blob.len() < MAGIC.len() + NONCE_LEN || &blob[..MAGIC.len()] != MAGIC {
            return Err(SavepointError::Decryption(
                "not a recognized vault file".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = blob[MAGIC.len()..].split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher.decrypt(nonce, ciphertext).map_err(|_| {
            SavepointError::Decryption(
                "vault cannot be decrypted on this host (moved from another machine, or corrupted)"
                    .to_string(),
            )
        })
    }
}
