//! Preference Store Module
//!
//! Asynchronous string key-value store holding the client's credentials.
//! Every committed change is published as a whole snapshot to subscribers.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::storage::{SecureStorage, StorageError};

/// A committed view of every key in the store
pub type Preferences = BTreeMap<String, String>;

/// One change inside an [`PreferenceStore::edit`] batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceEdit {
    Set(String, String),
    Remove(String),
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Latest committed value for `key`
    async fn read(&self, key: &str) -> Result<Option<String>, PreferenceError>;

    /// Apply a batch of edits as a single committed snapshot
    async fn edit(&self, edits: Vec<PreferenceEdit>) -> Result<(), PreferenceError>;

    /// Upsert one key
    async fn write(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.edit(vec![PreferenceEdit::Set(key.to_string(), value.to_string())])
            .await
    }

    async fn remove(&self, key: &str) -> Result<(), PreferenceError> {
        self.edit(vec![PreferenceEdit::Remove(key.to_string())]).await
    }

    /// Receiver that always holds the latest committed snapshot
    fn subscribe(&self) -> watch::Receiver<Arc<Preferences>>;
}

/// Preference store persisted through [`SecureStorage`] as one document.
///
/// Writers are serialised; the new snapshot is published before `edit`
/// returns, so a read issued after a completed write observes it.
pub struct FilePreferenceStore {
    backing: Option<(SecureStorage, String)>,
    state: watch::Sender<Arc<Preferences>>,
    write_lock: Mutex<()>,
}

impl FilePreferenceStore {
    /// Open (or create) the document `name` inside `storage`
    pub async fn open(storage: SecureStorage, name: &str) -> Result<Self, PreferenceError> {
        let initial = match storage.load::<Preferences>(name).await {
            Ok(Some(prefs)) => prefs,
            Ok(None) => Preferences::new(),
            Err(StorageError::Serialization(_)) | Err(StorageError::Decryption(_)) => {
                warn!("Preference document '{}' is unreadable, starting empty", name);
                Preferences::new()
            }
            Err(e) => return Err(e.into()),
        };

        debug!("Opened preference document '{}' with {} keys", name, initial.len());

        Ok(Self {
            backing: Some((storage, name.to_string())),
            state: watch::Sender::new(Arc::new(initial)),
            write_lock: Mutex::new(()),
        })
    }

    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self {
            backing: None,
            state: watch::Sender::new(Arc::new(Preferences::new())),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl PreferenceStore for FilePreferenceStore {
    async fn read(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.state.borrow().get(key).cloned())
    }

    async fn edit(&self, edits: Vec<PreferenceEdit>) -> Result<(), PreferenceError> {
        let _guard = self.write_lock.lock().await;

        let current = self.state.borrow().clone();
        let mut next = (*current).clone();
        for edit in edits {
            match edit {
                PreferenceEdit::Set(key, value) => {
                    next.insert(key, value);
                }
                PreferenceEdit::Remove(key) => {
                    next.remove(&key);
                }
            }
        }

        if next == *current {
            return Ok(());
        }

        if let Some((storage, name)) = &self.backing {
            storage.save(name, &next).await?;
        }

        // Keys only; values may be credentials
        debug!("Committed preferences: {:?}", next.keys().collect::<Vec<_>>());
        self.state.send_replace(Arc::new(next));
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Arc<Preferences>> {
        self.state.subscribe()
    }
}

/// Preference store errors
#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Preference store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn never_written_key_reads_none() {
        let store = FilePreferenceStore::in_memory();
        assert_eq!(store.read("access_token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn write_replaces_previous_value() {
        let store = FilePreferenceStore::in_memory();
        store.write("access_token", "one").await.unwrap();
        store.write("access_token", "two").await.unwrap();
        assert_eq!(store.read("access_token").await.unwrap().as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn edit_batch_is_published_as_one_snapshot() {
        let store = FilePreferenceStore::in_memory();
        let mut rx = store.subscribe();

        store
            .edit(vec![
                PreferenceEdit::Set("access_token".into(), "a".into()),
                PreferenceEdit::Set("refresh_token".into(), "r".into()),
            ])
            .await
            .unwrap();

        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.get("access_token").map(String::as_str), Some("a"));
        assert_eq!(snapshot.get("refresh_token").map(String::as_str), Some("r"));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn noop_edit_does_not_notify() {
        let store = FilePreferenceStore::in_memory();
        let rx = store.subscribe();
        store.remove("missing").await.unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SecureStorage::new(dir.path()).unwrap();

        {
            let store = FilePreferenceStore::open(storage.clone(), "prefs").await.unwrap();
            store.write("refresh_token", "keep-me").await.unwrap();
        }

        let reopened = FilePreferenceStore::open(storage, "prefs").await.unwrap();
        assert_eq!(
            reopened.read("refresh_token").await.unwrap().as_deref(),
            Some("keep-me")
        );
    }

    #[cfg(not(windows))]
    #[tokio::test]
    async fn corrupt_document_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("prefs.dat"), b"garbage").await.unwrap();
        let storage = SecureStorage::new(dir.path()).unwrap();

        let store = FilePreferenceStore::open(storage, "prefs").await.unwrap();
        assert_eq!(store.read("access_token").await.unwrap(), None);
    }
}
