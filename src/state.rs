use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{
    repo::{CredentialStore, PgCredentialStore},
    session::SessionManager,
};
use crate::config::{AppConfig, SessionConfig};
use crate::db;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        db::migrate(&pool).await?;
        let store = Arc::new(PgCredentialStore::new(pool)) as Arc<dyn CredentialStore>;
        Ok(Self::from_parts(store, &config.session))
    }

    pub fn from_parts(store: Arc<dyn CredentialStore>, session: &SessionConfig) -> Self {
        Self {
            store,
            sessions: Arc::new(SessionManager::new(session)),
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::with_store(Arc::new(crate::auth::repo::MemoryCredentialStore::default()))
    }

    #[cfg(test)]
    pub fn with_store(store: Arc<dyn CredentialStore>) -> Self {
        let session = SessionConfig {
            secret: "test-secret-key-for-testing-only".into(),
            issuer: "test".into(),
            ttl_minutes: 5,
            cookie_name: "session".into(),
            secure_cookie: false,
        };
        Self::from_parts(store, &session)
    }
}

impl FromRef<AppState> for Arc<SessionManager> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
