//! Secure Storage Module
//!
//! Durable on-disk blobs, one JSON document per key. Encrypted with
//! Windows DPAPI where available.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const EXTENSION: &str = "dat";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Secure storage rooted at a single directory
#[derive(Debug, Clone)]
pub struct SecureStorage {
    storage_path: PathBuf,
}

impl SecureStorage {
    /// Open storage at `root`, creating the directory if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let storage_path = root.into();

        std::fs::create_dir_all(&storage_path)
            .map_err(|e| StorageError::Io(e.to_string()))?;

        debug!("Secure storage initialized at: {:?}", storage_path);

        Ok(Self { storage_path })
    }

    /// Platform data directory used when nothing else is configured
    pub fn default_location() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("KHigh")
    }

    pub fn root(&self) -> &Path {
        &self.storage_path
    }

    /// Save a value under `key`.
    ///
    /// The blob is written to a temp file private to this call, flushed, and
    /// renamed over the previous one, so a crash leaves either the old or the
    /// new value. Concurrent saves of one key never share a temp file.
    pub async fn save<T: Serialize + ?Sized>(&self, key: &str, data: &T) -> Result<(), StorageError> {
        let json = serde_json::to_vec(data)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let encrypted = self.encrypt(&json)?;

        let file_path = self.path_for(key);
        let tmp_path = self.storage_path.join(format!(
            "{}.{}.{}.tmp",
            key,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = write_then_rename(&tmp_path, &file_path, &encrypted).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(e.to_string()));
        }

        debug!("Saved encrypted data for key: {}", key);
        Ok(())
    }

    /// Load the value under `key`, `None` if it was never saved
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let file_path = self.path_for(key);

        let encrypted = match tokio::fs::read(&file_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e.to_string())),
        };

        let decrypted = self.decrypt(&encrypted)?;

        serde_json::from_slice(&decrypted)
            .map(Some)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Delete stored data
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let file_path = self.path_for(key);

        match tokio::fs::remove_file(&file_path).await {
            Ok(()) => {
                info!("Deleted stored data for key: {}", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    /// Check if key exists
    pub async fn exists(&self, key: &str) -> bool {
        tokio::fs::try_exists(self.path_for(key)).await.unwrap_or(false)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.storage_path.join(format!("{}.{}", key, EXTENSION))
    }

    #[cfg(windows)]
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, StorageError> {
        dpapi::transform(data, dpapi::Direction::Protect)
            .ok_or_else(|| StorageError::Encryption("DPAPI encryption failed".into()))
    }

    #[cfg(windows)]
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, StorageError> {
        dpapi::transform(data, dpapi::Direction::Unprotect)
            .ok_or_else(|| StorageError::Decryption("DPAPI decryption failed".into()))
    }

    #[cfg(not(windows))]
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, StorageError> {
        // Plaintext off Windows; rely on the data directory's permissions
        Ok(data.to_vec())
    }

    #[cfg(not(windows))]
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, StorageError> {
        Ok(data.to_vec())
    }
}

/// Current-user DPAPI over byte buffers
#[cfg(windows)]
mod dpapi {
    use windows::Win32::Foundation::{LocalFree, HLOCAL};
    use windows::Win32::Security::Cryptography::{
        CryptProtectData, CryptUnprotectData, CRYPTPROTECT_UI_FORBIDDEN, CRYPT_INTEGER_BLOB,
    };

    pub(super) enum Direction {
        Protect,
        Unprotect,
    }

    /// `None` when the system call fails
    pub(super) fn transform(data: &[u8], direction: Direction) -> Option<Vec<u8>> {
        let input = CRYPT_INTEGER_BLOB {
            cbData: u32::try_from(data.len()).ok()?,
            pbData: data.as_ptr() as *mut u8,
        };
        let mut output = CRYPT_INTEGER_BLOB {
            cbData: 0,
            pbData: std::ptr::null_mut(),
        };

        // SAFETY: `input` borrows `data` for the duration of the call; on
        // success the system allocates `output`, which is copied and freed.
        unsafe {
            let result = match direction {
                Direction::Protect => CryptProtectData(
                    &input, None, None, None, None, CRYPTPROTECT_UI_FORBIDDEN, &mut output,
                ),
                Direction::Unprotect => CryptUnprotectData(
                    &input, None, None, None, None, CRYPTPROTECT_UI_FORBIDDEN, &mut output,
                ),
            };
            if result.is_err() {
                return None;
            }

            let bytes = std::slice::from_raw_parts(output.pbData, output.cbData as usize).to_vec();
            LocalFree(HLOCAL(output.pbData as *mut std::ffi::c_void));
            Some(bytes)
        }
    }
}

async fn write_then_rename(tmp_path: &Path, file_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(tmp_path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(tmp_path, file_path).await
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),
}
