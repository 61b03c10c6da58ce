//! Authentication Module
//!
//! Credential persistence and synchronous token access for the request
//! pipeline.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::preferences::{PreferenceEdit, PreferenceError, PreferenceStore, Preferences};

/// Preference key of the access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Preference key of the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Bearer token pair issued by the backend
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Render a token for display without revealing it
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 8 {
        return "****".to_string();
    }
    let prefix: String = token.chars().take(4).collect();
    format!("{}****", prefix)
}

/// Writes and reads the credential pair in a [`PreferenceStore`]
#[derive(Clone)]
pub struct CredentialStore {
    prefs: Arc<dyn PreferenceStore>,
}

impl CredentialStore {
    pub fn new(prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { prefs }
    }

    pub fn preferences(&self) -> Arc<dyn PreferenceStore> {
        Arc::clone(&self.prefs)
    }

    /// Replace both tokens in one commit. A missing refresh token clears
    /// the stored one.
    pub async fn save(&self, credential: &Credential) -> Result<(), PreferenceError> {
        let refresh = match &credential.refresh_token {
            Some(token) => PreferenceEdit::Set(REFRESH_TOKEN_KEY.to_string(), token.clone()),
            None => PreferenceEdit::Remove(REFRESH_TOKEN_KEY.to_string()),
        };

        self.prefs
            .edit(vec![
                PreferenceEdit::Set(ACCESS_TOKEN_KEY.to_string(), credential.access_token.clone()),
                refresh,
            ])
            .await?;

        info!(has_refresh = credential.refresh_token.is_some(), "Credential saved");
        Ok(())
    }

    /// Rotate only the access token
    pub async fn write_access_token(&self, token: &str) -> Result<(), PreferenceError> {
        self.prefs.write(ACCESS_TOKEN_KEY, token).await?;
        debug!("Access token replaced");
        Ok(())
    }

    /// Stored credential, `None` when no access token is present
    pub async fn load(&self) -> Result<Option<Credential>, PreferenceError> {
        let Some(access_token) = self.prefs.read(ACCESS_TOKEN_KEY).await? else {
            return Ok(None);
        };
        let refresh_token = self.prefs.read(REFRESH_TOKEN_KEY).await?;
        Ok(Some(Credential { access_token, refresh_token }))
    }

    /// Forget both tokens
    pub async fn clear(&self) -> Result<(), PreferenceError> {
        self.prefs
            .edit(vec![
                PreferenceEdit::Remove(ACCESS_TOKEN_KEY.to_string()),
                PreferenceEdit::Remove(REFRESH_TOKEN_KEY.to_string()),
            ])
            .await?;
        info!("Credential cleared");
        Ok(())
    }
}

/// Synchronous, best-effort token access.
///
/// `None` means "no credential available right now", whether the user never
/// logged in or the store could not be read.
pub trait TokenProvider: Send + Sync {
    fn access_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
}

/// Reads the store on every call, blocking the calling thread until the
/// asynchronous read finishes.
pub struct BlockingTokenProvider {
    prefs: Arc<dyn PreferenceStore>,
}

impl BlockingTokenProvider {
    pub fn new(prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { prefs }
    }

    fn read_blocking(&self, key: &str) -> Option<String> {
        let result = match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(self.prefs.read(key)))
            }
            // A current-thread runtime cannot be parked from inside; read on a
            // helper thread with its own runtime instead.
            _ => std::thread::scope(|scope| {
                scope
                    .spawn(|| {
                        let runtime = tokio::runtime::Builder::new_current_thread()
                            .enable_all()
                            .build()
                            .map_err(|e| PreferenceError::Unavailable(e.to_string()))?;
                        runtime.block_on(self.prefs.read(key))
                    })
                    .join()
                    .unwrap_or_else(|_| {
                        Err(PreferenceError::Unavailable("reader thread panicked".into()))
                    })
            }),
        };

        match result {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Token read failed, treating as absent");
                None
            }
        }
    }
}

impl TokenProvider for BlockingTokenProvider {
    fn access_token(&self) -> Option<String> {
        self.read_blocking(ACCESS_TOKEN_KEY)
    }

    fn refresh_token(&self) -> Option<String> {
        self.read_blocking(REFRESH_TOKEN_KEY)
    }
}

/// Serves tokens from the store's latest published snapshot without waiting
/// on any I/O.
pub struct CachedTokenProvider {
    snapshot: watch::Receiver<Arc<Preferences>>,
}

impl CachedTokenProvider {
    pub fn new(prefs: &dyn PreferenceStore) -> Self {
        Self {
            snapshot: prefs.subscribe(),
        }
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.snapshot.borrow().get(key).cloned()
    }
}

impl TokenProvider for CachedTokenProvider {
    fn access_token(&self) -> Option<String> {
        self.lookup(ACCESS_TOKEN_KEY)
    }

    fn refresh_token(&self) -> Option<String> {
        self.lookup(REFRESH_TOKEN_KEY)
    }
}
