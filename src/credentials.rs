//! Encrypted storage of the account email and global API key.
//!
//! Each field is sealed with AES-256-GCM and stored as `base64(nonce || ciphertext)`.
//! The key is derived from the local user and machine identity, so the file can only
//! be opened on the machine and account that wrote it. Anyone with that same local
//! access can derive the key too; what the cipher adds is tamper detection.

use std::fs;
use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use log::{debug, info, warn};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Settings;
use crate::constants::CREDENTIALS_FILE_NAME;
use crate::error::{AppError, Result};

const NONCE_LENGTH: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub api_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredentials {
    email_encrypted: String,
    api_key_encrypted: String,
}

/// What `save` reports back instead of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub success: bool,
    pub message: String,
}

pub struct CredentialStore {
    path: PathBuf,
    cipher: Aes256Gcm,
}

impl CredentialStore {
    /// Store under the per-user config directory, keyed by this machine and user.
    pub fn open_default() -> Result<Self> {
        let path = Settings::config_dir()?.join(CREDENTIALS_FILE_NAME);
        Ok(CredentialStore::new(path, &local_identity()))
    }

    pub fn new(path: PathBuf, identity: &str) -> Self {
        let digest = Sha256::digest(identity.as_bytes());
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(digest.as_slice()));

        CredentialStore { path, cipher }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `None` when nothing usable is stored. Never fails.
    pub fn load(&self) -> Option<Credentials> {
        if !self.path.exists() {
            debug!("No credentials stored at {}.", self.path.display());
            return None;
        }

        match self.read() {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                warn!("Ignoring stored credentials at {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, credentials: &Credentials) -> SaveOutcome {
        match self.write(credentials) {
            Ok(()) => {
                info!("Credentials saved to {}.", self.path.display());
                SaveOutcome {
                    success: true,
                    message: "Credentials encrypted and saved.".to_string(),
                }
            }
            Err(e) => {
                warn!("Unable to save credentials: {}", e);
                SaveOutcome {
                    success: false,
                    message: format!("Failed to save credentials: {}", e),
                }
            }
        }
    }

    fn read(&self) -> Result<Credentials> {
        let contents = fs::read_to_string(&self.path)?;
        let stored: StoredCredentials = serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("invalid credentials file: {}", e)))?;

        if stored.email_encrypted.is_empty() || stored.api_key_encrypted.is_empty() {
            return Err(AppError::Config("credentials file has empty fields".to_string()));
        }

        let credentials = Credentials {
            email: self.open(&stored.email_encrypted)?,
            api_key: self.open(&stored.api_key_encrypted)?,
        };
        if credentials.email.trim().is_empty() || credentials.api_key.trim().is_empty() {
            return Err(AppError::Config("stored email or API key is blank".to_string()));
        }
        Ok(credentials)
    }

    fn write(&self, credentials: &Credentials) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let stored = StoredCredentials {
            email_encrypted: self.seal(&credentials.email)?,
            api_key_encrypted: self.seal(&credentials.api_key)?,
        };
        let json = serde_json::to_string_pretty(&stored)
            .map_err(|e| AppError::Config(e.to_string()))?;

        fs::write(&self.path, json)?;
        Ok(())
    }

    fn seal(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        rand::rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| AppError::Config(format!("encryption failed: {}", e)))?;

        let mut sealed = nonce_bytes.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    fn open(&self, encoded: &str) -> Result<String> {
        let sealed = BASE64
            .decode(encoded.trim())
            .map_err(|e| AppError::Config(format!("invalid base64: {}", e)))?;
        if sealed.len() <= NONCE_LENGTH {
            return Err(AppError::Config("sealed value is too short".to_string()));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LENGTH);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                AppError::Config("decryption failed: wrong machine/user or corrupted data".to_string())
            })?;

        String::from_utf8(plaintext).map_err(|e| AppError::Config(format!("invalid UTF-8: {}", e)))
    }
}

/// Stable string naming this user on this machine.
pub fn local_identity() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .or_else(|| dirs::home_dir().map(|home| home.display().to_string()))
        .unwrap_or_else(|| "defaultuser".to_string());

    let machine = ["/etc/machine-id", "/var/lib/dbus/machine-id"]
        .iter()
        .find_map(|path| fs::read_to_string(path).ok())
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .or_else(|| std::env::var("COMPUTERNAME").ok())
        .unwrap_or_else(|| "unknown-machine".to_string());

    format!("cloudflare-dns-manager-{}-{}-credential-key", user, machine)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Credentials {
        Credentials {
            email: "owner@example.com".to_string(),
            api_key: "0123456789abcdef".to_string(),
        }
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("nested/credentials.json"), "me-on-box");

        let outcome = store.save(&sample());
        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(store.load(), Some(sample()));
    }

    #[test]
    fn stored_file_does_not_contain_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"), "me-on-box");
        store.save(&sample());

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(!raw.contains("owner@example.com"));
        assert!(raw.contains("email_encrypted"));
    }

    #[test]
    fn missing_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"), "me-on-box");
        assert_eq!(store.load(), None);
    }

    #[test]
    fn corrupt_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(CredentialStore::new(path, "me-on-box").load(), None);
    }

    #[test]
    fn tampered_value_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = CredentialStore::new(path.clone(), "me-on-box");
        store.save(&sample());

        let mut stored: StoredCredentials =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let mut bytes = BASE64.decode(&stored.api_key_encrypted).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        stored.api_key_encrypted = BASE64.encode(bytes);
        fs::write(&path, serde_json::to_string(&stored).unwrap()).unwrap();

        assert_eq!(store.load(), None);
    }

    #[test]
    fn blank_stored_values_load_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"), "me-on-box");
        let outcome = store.save(&Credentials {
            email: String::new(),
            api_key: "0123456789abcdef".to_string(),
        });
        assert!(outcome.success);

        assert_eq!(store.load(), None);
    }

    #[test]
    fn other_identity_cannot_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        CredentialStore::new(path.clone(), "me-on-box").save(&sample());

        assert_eq!(CredentialStore::new(path, "someone-else").load(), None);
    }

    #[test]
    fn unwritable_location_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();
        let store = CredentialStore::new(blocker.join("credentials.json"), "me-on-box");

        let outcome = store.save(&sample());
        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Failed to save credentials"));
    }
}
