//! Commands Module
//!
//! Operations behind the `khigh` command line, returning printable results.

use serde::Serialize;
use tracing::{debug, info};

use crate::api::ApiError;
use crate::auth::{mask_token, Credential};
use crate::models::{UserEntity, UserProfile};
use crate::preferences::PreferenceError;
use crate::storage::StorageError;
use crate::AppState;

/// Cache key of the signed-in user's row
pub const CURRENT_USER_ID: &str = "me";

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub api_url: String,
    pub logged_in: bool,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResult {
    pub profile: UserProfile,
    pub from_cache: bool,
    pub last_sync_time: i64,
}

/// Report which tokens are stored, masked
pub async fn status(state: &AppState) -> Result<StatusReport, CommandError> {
    debug!("Getting stored credential");

    let credential = state.credentials.load().await?;

    Ok(StatusReport {
        api_url: state.api.base_url().to_string(),
        logged_in: credential.is_some(),
        access_token: credential.as_ref().map(|c| mask_token(&c.access_token)),
        refresh_token: credential
            .as_ref()
            .and_then(|c| c.refresh_token.as_deref())
            .map(mask_token),
    })
}

/// Store a token pair obtained from the login flow and drop the cached
/// profile
pub async fn login(
    state: &AppState,
    access_token: String,
    refresh_token: Option<String>,
) -> Result<(), CommandError> {
    if access_token.trim().is_empty() {
        return Err(CommandError::InvalidInput("access token must not be empty".into()));
    }

    state
        .credentials
        .save(&Credential::new(access_token, refresh_token))
        .await?;
    // The cached profile belonged to whoever held the previous credential
    state.users.remove(CURRENT_USER_ID).await?;
    Ok(())
}

/// Forget the stored credential and the cached profile
pub async fn logout(state: &AppState) -> Result<(), CommandError> {
    info!("Logging out");

    state.credentials.clear().await?;
    state.users.remove(CURRENT_USER_ID).await?;

    Ok(())
}

/// Authenticated GET of an arbitrary backend path
pub async fn get(state: &AppState, path: &str) -> Result<serde_json::Value, CommandError> {
    Ok(state.api.get_json(path).await?)
}

/// The signed-in user's profile, served from the local table while fresh
pub async fn profile(state: &AppState, force_refresh: bool) -> Result<ProfileResult, CommandError> {
    if !force_refresh {
        if let Some(row) = state
            .users
            .fresh(CURRENT_USER_ID, state.config.user_stale_after)
            .await?
        {
            debug!("Serving profile from local cache");
            return Ok(ProfileResult {
                profile: row.to_profile(),
                from_cache: true,
                last_sync_time: row.last_sync_time,
            });
        }
    }

    let profile: UserProfile = state.api.get_json("users/me").await?;
    let row = UserEntity::from_profile(CURRENT_USER_ID, &profile, chrono::Utc::now());
    state.users.upsert(&row).await?;

    Ok(ProfileResult {
        profile,
        from_cache: false,
        last_sync_time: row.last_sync_time,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Preferences(#[from] PreferenceError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
