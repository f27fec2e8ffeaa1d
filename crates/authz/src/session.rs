use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use staybook_kernel::clock::Clock;
use staybook_kernel::model::UserId;
use uuid::Uuid;

use crate::{Identity, TokenVerifier};

/// Upper bound on session lifetime (ten years).
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
struct Session {
    identity: Identity,
    expires_at: DateTime<Utc>,
}

/// In-process session table mapping opaque tokens to identities.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: Duration::seconds(i64::try_from(ttl_secs.min(MAX_TTL_SECS)).unwrap_or(0)),
            clock,
        }
    }

    /// Issue a fresh token for `identity`. Expired sessions are reclaimed first.
    pub fn issue(&self, identity: Identity) -> String {
        self.purge_expired();
        let token = Uuid::new_v4().simple().to_string();
        let expires_at = self.clock.now() + self.ttl;
        self.sessions
            .insert(token.clone(), Session { identity, expires_at });
        tracing::debug!(
            target: "staybook-authz",
            user_id = %identity.user_id,
            role = identity.role.as_str(),
            "session issued"
        );
        token
    }

    /// Drop every session past its expiry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.expires_at > now);
        before.saturating_sub(self.sessions.len())
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop every session of `user_id`; returns how many were removed.
    pub fn revoke_user(&self, user_id: UserId) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.identity.user_id != user_id);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl TokenVerifier for SessionStore {
    fn verify(&self, token: &str) -> Option<Identity> {
        let session = self.sessions.get(token).map(|s| s.value().clone())?;
        if session.expires_at <= self.clock.now() {
            self.sessions.remove(token);
            return None;
        }
        Some(session.identity)
    }
}
