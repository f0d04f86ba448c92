use std::{collections::HashMap, sync::Arc, time::Duration};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::config::SessionConfig;

pub const SESSION_COOKIE: &str = "session";

/// Payload of the signed session cookie. It names a session, not a user:
/// the user id is only ever read from the server-side store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,   // session id
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}

/// Signing and verification keys for session cookies.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    pub ttl: Duration,
}

impl SessionKeys {
    pub fn from_config(cfg: &SessionConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes.max(1) as u64) * 60),
        }
    }

    pub fn sign(&self, session_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: session_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(%session_id, "session token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

#[derive(Debug, Clone, Copy)]
struct SessionEntry {
    user_id: i64,
    expires_at: OffsetDateTime,
}

/// Server-side map of live session ids to user ids.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session for `user_id` and drops any expired ones.
    pub async fn create(&self, user_id: i64, ttl: Duration) -> Uuid {
        let now = OffsetDateTime::now_utc();
        let id = Uuid::new_v4();
        let mut map = self.inner.write().await;
        map.retain(|_, e| e.expires_at > now);
        map.insert(
            id,
            SessionEntry {
                user_id,
                expires_at: now + TimeDuration::seconds(ttl.as_secs() as i64),
            },
        );
        id
    }

    pub async fn resolve(&self, session_id: Uuid) -> Option<i64> {
        let map = self.inner.read().await;
        map.get(&session_id)
            .filter(|e| e.expires_at > OffsetDateTime::now_utc())
            .map(|e| e.user_id)
    }

    /// Removes the session. Unknown ids are ignored.
    pub async fn revoke(&self, session_id: Uuid) {
        self.inner.write().await.remove(&session_id);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
