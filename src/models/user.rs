//! Auth and user profile records

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Credential;

/// Token pair returned by the login and refresh endpoints
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    pub fn into_credential(self) -> Credential {
        Credential::new(self.access_token, self.refresh_token)
    }
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenResponse { .. }")
    }
}

/// Profile as exchanged with `/users/me`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_caregiver: bool,
    #[serde(default)]
    pub is_helper: bool,
    #[serde(default)]
    pub is_alert: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcm_token: Option<String>,
}

/// Row of the local `users` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    pub id: String,
    pub user_name: String,
    pub phone: Option<String>,
    pub is_caregiver: bool,
    pub is_helper: bool,
    pub is_alert: bool,
    pub fcm_token: Option<String>,
    /// Epoch milliseconds of the last successful fetch
    pub last_sync_time: i64,
}

impl UserEntity {
    pub fn from_profile(id: impl Into<String>, profile: &UserProfile, synced_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            user_name: profile.user_name.clone(),
            phone: profile.phone.clone(),
            is_caregiver: profile.is_caregiver,
            is_helper: profile.is_helper,
            is_alert: profile.is_alert,
            fcm_token: profile.fcm_token.clone(),
            last_sync_time: synced_at.timestamp_millis(),
        }
    }

    pub fn to_profile(&self) -> UserProfile {
        UserProfile {
            user_name: self.user_name.clone(),
            phone: self.phone.clone(),
            is_caregiver: self.is_caregiver,
            is_helper: self.is_helper,
            is_alert: self.is_alert,
            fcm_token: self.fcm_token.clone(),
        }
    }

    /// True once the row is older than `max_age` at `now`
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now.timestamp_millis() - self.last_sync_time > max_age.num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn profile_uses_backend_field_names() {
        let profile: UserProfile = serde_json::from_value(json!({
            "user_name": "Kim",
            "phone": "010-0000-0000",
            "is_caregiver": true,
            "is_helper": false,
            "is_alert": true,
            "fcm_token": "device-token"
        }))
        .unwrap();

        assert_eq!(profile.user_name, "Kim");
        assert!(profile.is_caregiver);
        assert!(profile.is_alert);
        assert_eq!(profile.fcm_token.as_deref(), Some("device-token"));
    }

    #[test]
    fn optional_profile_fields_may_be_absent() {
        let profile: UserProfile = serde_json::from_value(json!({ "user_name": "Lee" })).unwrap();
        assert_eq!(profile, UserProfile { user_name: "Lee".into(), ..Default::default() });

        let encoded = serde_json::to_value(&profile).unwrap();
        assert!(encoded.get("phone").is_none());
        assert!(encoded.get("fcm_token").is_none());
    }

    #[test]
    fn entity_records_sync_time_in_millis() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let profile = UserProfile { user_name: "Park".into(), is_helper: true, ..Default::default() };

        let entity = UserEntity::from_profile("u-1", &profile, at);

        assert_eq!(entity.last_sync_time, at.timestamp_millis());
        assert_eq!(entity.to_profile(), profile);
        let encoded = serde_json::to_value(&entity).unwrap();
        assert!(encoded.get("lastSyncTime").is_some());
    }

    #[test]
    fn staleness_is_relative_to_max_age() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let entity = UserEntity::from_profile("u-1", &UserProfile::default(), at);

        assert!(!entity.is_stale(at + Duration::minutes(59), Duration::hours(1)));
        assert!(entity.is_stale(at + Duration::minutes(61), Duration::hours(1)));
    }

    #[test]
    fn token_response_debug_is_opaque() {
        let tokens: TokenResponse =
            serde_json::from_value(json!({ "access_token": "secret-a" })).unwrap();
        assert!(!format!("{:?}", tokens).contains("secret-a"));
        assert_eq!(tokens.into_credential().refresh_token, None);
    }
}
