//! Credential storage (encrypted file-based, or in-memory where no disk is available)
//!
//! The session token is stored encrypted with AES-256-GCM in
//! ~/.config/ynet/credentials.enc. The encryption key is derived from
//! machine-specific identifiers.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Context, anyhow};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::paths;

const NONCE_SIZE: usize = 12;

/// Key the session token is stored under
pub const TOKEN_KEY: &str = "token";

/// Secure key-value storage for secrets
pub trait CredentialStore: Send + Sync + 'static {
    /// Read a value
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; removing a missing key is not an error
    fn delete_item(&self, key: &str) -> Result<()>;
}

impl<T: CredentialStore> CredentialStore for std::sync::Arc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn delete_item(&self, key: &str) -> Result<()> {
        (**self).delete_item(key)
    }
}

/// Encrypted JSON map on disk
#[derive(Debug, Clone)]
pub struct EncryptedFileStore {
    path: PathBuf,
}

impl EncryptedFileStore {
    /// Store at the default location (~/.config/ynet/credentials.enc)
    pub fn open() -> anyhow::Result<Self> {
        Ok(Self::at(paths::credentials_path()?))
    }

    /// Store at a specific path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all credentials from encrypted file
    fn load(&self) -> anyhow::Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let encrypted = fs::read(&self.path).context("Failed to read credentials file")?;

        if encrypted.len() < NONCE_SIZE {
            return Ok(HashMap::new());
        }

        let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(&derive_key())
            .map_err(|_| anyhow!("Invalid key length"))?;

        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| anyhow!("Failed to decrypt credentials"))?;

        let creds: HashMap<String, String> =
            serde_json::from_slice(&plaintext).context("Invalid credentials payload")?;

        Ok(creds)
    }

    /// Save all credentials to encrypted file
    fn save(&self, creds: &HashMap<String, String>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create credentials directory")?;
        }

        let json = serde_json::to_vec(creds)?;

        let cipher = Aes256Gcm::new_from_slice(&derive_key())
            .map_err(|_| anyhow!("Invalid key length"))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, json.as_slice())
            .map_err(|_| anyhow!("Failed to encrypt credentials"))?;

        let mut output = nonce_bytes.to_vec();
        output.extend(ciphertext);

        fs::write(&self.path, output).context("Failed to write credentials file")?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }
}

impl CredentialStore for EncryptedFileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let creds = self.load().map_err(storage_error)?;
        Ok(creds.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        // An unreadable file (e.g. key changed with the machine id) is replaced
        let mut creds = self.load().unwrap_or_default();
        creds.insert(key.to_string(), value.to_string());
        self.save(&creds).map_err(storage_error)
    }

    fn delete_item(&self, key: &str) -> Result<()> {
        let mut creds = self.load().map_err(storage_error)?;
        if creds.remove(key).is_none() {
            return Ok(());
        }
        self.save(&creds).map_err(storage_error)
    }
}

fn storage_error(err: anyhow::Error) -> Error {
    Error::Storage(format!("{err:#}"))
}

/// Process-local store for platforms without secure storage, and for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| Error::Storage("memory store poisoned".to_string()))
    }
}

impl CredentialStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_item(&self, key: &str) -> Result<()> {
        self.items()?.remove(key);
        Ok(())
    }
}

/// Get machine ID for key derivation (cross-platform)
fn get_machine_id() -> String {
    // Linux: /etc/machine-id or /var/lib/dbus/machine-id
    #[cfg(target_os = "linux")]
    {
        for path in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
            if let Ok(id) = fs::read_to_string(path) {
                return id.trim().to_string();
            }
        }
    }

    // macOS: IOPlatformUUID via ioreg
    #[cfg(target_os = "macos")]
    {
        if let Ok(output) = std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
        {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if let Some(uuid) = stdout
                .lines()
                .find(|line| line.contains("IOPlatformUUID"))
                .and_then(|line| line.split('"').nth(3))
            {
                return uuid.to_string();
            }
        }
    }

    // Fallback: home directory path
    dirs::home_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "ynet-fallback-key".to_string())
}

/// Derive encryption key from machine-specific data
fn derive_key() -> [u8; 32] {
    let mut hasher = Sha256::new();

    hasher.update(get_machine_id().as_bytes());

    if let Some(home) = dirs::home_dir() {
        hasher.update(home.to_string_lossy().as_bytes());
    }

    // Fixed salt for this app
    hasher.update(b"ynet-session-store-v1");

    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = EncryptedFileStore::at(dir.path().join("credentials.enc"));

        assert_eq!(store.get_item(TOKEN_KEY).unwrap(), None);
        store.set_item(TOKEN_KEY, "abc.def.ghi").unwrap();
        assert_eq!(store.get_item(TOKEN_KEY).unwrap().as_deref(), Some("abc.def.ghi"));

        // Value is not stored in clear text
        let raw = fs::read(store.path()).unwrap();
        assert!(!String::from_utf8_lossy(&raw).contains("abc.def.ghi"));

        store.delete_item(TOKEN_KEY).unwrap();
        assert_eq!(store.get_item(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_delete_missing_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = EncryptedFileStore::at(dir.path().join("nested").join("credentials.enc"));
        store.delete_item(TOKEN_KEY).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.enc");
        fs::write(&path, vec![7u8; 64]).unwrap();
        let store = EncryptedFileStore::at(&path);
        assert!(matches!(store.get_item(TOKEN_KEY), Err(Error::Storage(_))));

        // Writing recovers the file
        store.set_item(TOKEN_KEY, "t").unwrap();
        assert_eq!(store.get_item(TOKEN_KEY).unwrap().as_deref(), Some("t"));
    }

    #[test]
    fn test_delete_from_unreadable_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.enc");
        fs::write(&path, vec![7u8; 64]).unwrap();
        let store = EncryptedFileStore::at(&path);

        assert!(matches!(store.delete_item(TOKEN_KEY), Err(Error::Storage(_))));
        assert_eq!(fs::read(&path).unwrap(), vec![7u8; 64]);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        store.set_item("a", "1").unwrap();
        assert_eq!(store.get_item("a").unwrap().as_deref(), Some("1"));
        store.delete_item("a").unwrap();
        store.delete_item("a").unwrap();
        assert_eq!(store.get_item("a").unwrap(), None);
    }
}
