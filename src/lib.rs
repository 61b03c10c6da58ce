//! K-HIGH Client Library
//!
//! Credential storage, the authenticated request pipeline and the backend
//! records of the K-HIGH tracking client.

pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod interceptor;
pub mod logging;
pub mod models;
pub mod preferences;
pub mod storage;
pub mod users;

use std::sync::Arc;

use api::{ApiClient, ApiError};
use auth::{BlockingTokenProvider, CachedTokenProvider, CredentialStore, TokenProvider};
use config::{AppConfig, TokenProviderKind};
use interceptor::{AuthInterceptor, Interceptor};
use preferences::{FilePreferenceStore, PreferenceError, PreferenceStore};
use storage::{SecureStorage, StorageError};
use tracing::info;
use users::UserCache;

/// Name of the preference document holding the tokens
pub const PREFERENCES_NAME: &str = "preferences";

/// Long-lived client objects, constructed once and passed by reference
pub struct AppState {
    pub config: AppConfig,
    pub credentials: CredentialStore,
    pub tokens: Arc<dyn TokenProvider>,
    pub api: ApiClient,
    pub users: UserCache,
}

impl AppState {
    /// Open on-disk stores under `config.data_dir` and build the pipeline
    pub async fn open(config: AppConfig) -> Result<Self, StartupError> {
        let storage = SecureStorage::new(&config.data_dir)?;
        let prefs = FilePreferenceStore::open(storage.clone(), PREFERENCES_NAME).await?;
        let users = UserCache::new(SecureStorage::new(config.data_dir.join("users"))?);

        Self::with_stores(config, Arc::new(prefs), users)
    }

    /// Build around caller-supplied stores
    pub fn with_stores(
        config: AppConfig,
        prefs: Arc<dyn PreferenceStore>,
        users: UserCache,
    ) -> Result<Self, StartupError> {
        let tokens: Arc<dyn TokenProvider> = match config.token_provider {
            TokenProviderKind::Cached => Arc::new(CachedTokenProvider::new(prefs.as_ref())),
            TokenProviderKind::Blocking => Arc::new(BlockingTokenProvider::new(Arc::clone(&prefs))),
        };

        let interceptors: Vec<Arc<dyn Interceptor>> =
            vec![Arc::new(AuthInterceptor::new(Arc::clone(&tokens)))];
        let api = ApiClient::new(&config.api_url, config.http_timeout, interceptors)?;

        info!(
            api = %api.base_url(),
            provider = ?config.token_provider,
            "Client initialized"
        );

        Ok(Self {
            credentials: CredentialStore::new(prefs),
            tokens,
            api,
            users,
            config,
        })
    }
}

/// Errors raised while assembling [`AppState`]
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Preferences(#[from] PreferenceError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
