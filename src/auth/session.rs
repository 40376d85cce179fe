use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{Arc, PoisonError, RwLock},
};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::flash::{self, Notice},
    config::SessionConfig,
};

/// Payload of the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: i64,     // user ID
    pub sid: Uuid,    // server-side session ID
    pub iat: usize,   // issued at (unix timestamp)
    pub exp: usize,   // expires at (unix timestamp)
    pub iss: String,  // issuer
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(i64),
}

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(cfg: &SessionConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            ttl: Duration::minutes(cfg.ttl_minutes),
        }
    }

    fn sign(&self, user_id: i64, sid: Uuid) -> anyhow::Result<(String, OffsetDateTime)> {
        let now = OffsetDateTime::now_utc();
        let exp = now
            .checked_add(self.ttl)
            .ok_or_else(|| anyhow::anyhow!("session expiry out of range"))?;
        let claims = SessionClaims {
            sub: user_id,
            sid,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok((token, exp))
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<SessionClaims> {
        let mut validation = Validation::default();
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<SessionClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

struct LiveSession {
    user_id: i64,
    expires_at: OffsetDateTime,
}

/// Sessions the server still honours. A signed token whose `sid` is not in here is dead.
#[derive(Default)]
pub struct SessionRegistry {
    live: RwLock<HashMap<Uuid, LiveSession>>,
}

impl SessionRegistry {
    pub fn open(&self, sid: Uuid, user_id: i64, expires_at: OffsetDateTime) {
        let now = OffsetDateTime::now_utc();
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        live.retain(|_, s| s.expires_at > now);
        live.insert(sid, LiveSession { user_id, expires_at });
    }

    pub fn is_live(&self, sid: Uuid, user_id: i64) -> bool {
        let now = OffsetDateTime::now_utc();
        let live = self.live.read().unwrap_or_else(PoisonError::into_inner);
        live.get(&sid)
            .map(|s| s.user_id == user_id && s.expires_at > now)
            .unwrap_or(false)
    }

    pub fn close(&self, sid: Uuid) -> bool {
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        live.remove(&sid).is_some()
    }

    pub fn len(&self) -> usize {
        self.live.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Issues, checks and destroys the session cookie.
pub struct SessionManager {
    keys: SessionKeys,
    registry: SessionRegistry,
    cookie_name: String,
    secure: bool,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(cfg: &SessionConfig) -> Self {
        Self {
            keys: SessionKeys::new(cfg),
            registry: SessionRegistry::default(),
            cookie_name: cfg.cookie_name.clone(),
            secure: cfg.secure_cookie,
            ttl: Duration::minutes(cfg.ttl_minutes),
        }
    }

    /// Queue a one-shot notice, with the same `Secure` setting as the session cookie.
    pub fn flash(&self, jar: CookieJar, notice: Notice) -> CookieJar {
        flash::set(jar, notice, self.secure)
    }

    /// Anonymous -> Authenticated. Always mints a fresh session ID.
    pub fn login(&self, jar: CookieJar, user_id: i64) -> anyhow::Result<CookieJar> {
        self.close_presented(&jar);

        let sid = Uuid::new_v4();
        let (token, expires_at) = self.keys.sign(user_id, sid)?;
        self.registry.open(sid, user_id, expires_at);
        debug!(user_id, %sid, live = self.registry.len(), "session opened");

        let cookie = Cookie::build((self.cookie_name.clone(), token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(self.ttl);
        Ok(jar.add(cookie))
    }

    pub fn current(&self, jar: &CookieJar) -> SessionState {
        let Some(cookie) = jar.get(&self.cookie_name) else {
            return SessionState::Anonymous;
        };
        match self.keys.verify(cookie.value()) {
            Ok(claims) if self.registry.is_live(claims.sid, claims.sub) => {
                SessionState::Authenticated(claims.sub)
            }
            Ok(claims) => {
                debug!(sid = %claims.sid, "session no longer live");
                SessionState::Anonymous
            }
            Err(e) => {
                debug!(error = %e, "session token rejected");
                SessionState::Anonymous
            }
        }
    }

    /// Authenticated -> Anonymous. Safe to call without a session.
    pub fn logout(&self, jar: CookieJar) -> CookieJar {
        self.close_presented(&jar);
        self.clear(jar)
    }

    /// Drop the cookie without touching the registry.
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build((self.cookie_name.clone(), "")).path("/"))
    }

    fn close_presented(&self, jar: &CookieJar) {
        let claims = jar
            .get(&self.cookie_name)
            .and_then(|c| self.keys.verify(c.value()).ok());
        if let Some(claims) = claims {
            if self.registry.close(claims.sid) {
                debug!(user_id = claims.sub, sid = %claims.sid, "session closed");
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionState
where
    S: Send + Sync,
    Arc<SessionManager>: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = Arc::<SessionManager>::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(sessions.current(&jar))
    }
}
