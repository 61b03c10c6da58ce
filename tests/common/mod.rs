use std::sync::Arc;

use khigh_client::config::{AppConfig, TokenProviderKind};
use khigh_client::preferences::{FilePreferenceStore, PreferenceStore};
use khigh_client::storage::SecureStorage;
use khigh_client::users::UserCache;
use khigh_client::AppState;
use wiremock::MockServer;

#[allow(dead_code)]
pub struct TestClient {
    pub state: AppState,
    pub prefs: Arc<dyn PreferenceStore>,
    pub _dir: tempfile::TempDir,
}

pub fn client(server: &MockServer, provider: TokenProviderKind) -> TestClient {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        api_url: server.uri(),
        data_dir: dir.path().to_path_buf(),
        token_provider: provider,
        ..AppConfig::default()
    };

    let prefs: Arc<dyn PreferenceStore> = Arc::new(FilePreferenceStore::in_memory());
    let users = UserCache::new(SecureStorage::new(dir.path().join("users")).unwrap());
    let state = AppState::with_stores(config, Arc::clone(&prefs), users).unwrap();

    TestClient {
        state,
        prefs,
        _dir: dir,
    }
}
