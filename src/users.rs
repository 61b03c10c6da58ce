//! Local users table
//!
//! One stored row per user id, stamped with the time it was fetched.

use chrono::{Duration, Utc};
use tracing::debug;

use crate::models::UserEntity;
use crate::storage::{SecureStorage, StorageError};

pub struct UserCache {
    storage: SecureStorage,
}

impl UserCache {
    pub fn new(storage: SecureStorage) -> Self {
        Self { storage }
    }

    pub async fn upsert(&self, user: &UserEntity) -> Result<(), StorageError> {
        self.storage.save(&row_key(&user.id), user).await?;
        debug!(user_id = %user.id, "Cached user row");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<UserEntity>, StorageError> {
        self.storage.load(&row_key(id)).await
    }

    /// Row for `id` only if it was synced within `max_age`
    pub async fn fresh(&self, id: &str, max_age: Duration) -> Result<Option<UserEntity>, StorageError> {
        Ok(self
            .get(id)
            .await?
            .filter(|user| !user.is_stale(Utc::now(), max_age)))
    }

    pub async fn remove(&self, id: &str) -> Result<(), StorageError> {
        self.storage.delete(&row_key(id)).await
    }
}

/// File-safe key for a backend-issued id
fn row_key(id: &str) -> String {
    let safe: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("users-{}", safe)
}
