//! In-memory session store correlating the bank redirect with the original request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::types::{Consent, Tokens};
use crate::error::{AisError, AisResult};

/// Upper bound on the cleanup interval when a TTL is configured.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Where a session stands in the authorization-code flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationState {
    /// No session exists for the token.
    Unstarted,
    /// Consent created, waiting for the bank to redirect back with a code.
    AwaitingCallback,
    /// Tokens have been obtained.
    Authorized,
}

/// Eviction policy. The default keeps every session for the process lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Sessions older than this are treated as absent.
    pub ttl: Option<Duration>,
    /// Oldest session is evicted when a new one would exceed this count.
    pub max_sessions: Option<usize>,
}

/// One authorization attempt.
#[derive(Clone)]
pub struct Session {
    pub consent: Consent,
    pub code_verifier: String,
    pub tokens: Option<Tokens>,
    pub created_at: Instant,
}

impl Session {
    #[must_use]
    pub const fn state(&self) -> AuthorizationState {
        if self.tokens.is_some() {
            AuthorizationState::Authorized
        } else {
            AuthorizationState::AwaitingCallback
        }
    }

    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| self.created_at.elapsed() > ttl)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("consent_id", &self.consent.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Session table keyed by an opaque session token.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    policy: SessionPolicy,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(SessionPolicy::default())
    }

    #[must_use]
    pub fn with_policy(policy: SessionPolicy) -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), policy }
    }

    #[must_use]
    pub const fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Generate a random token using two UUIDs (256 bits).
    fn generate_token() -> String {
        format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
    }

    /// Store a new session and return its token.
    pub async fn create(&self, consent: Consent, code_verifier: String) -> String {
        let token = Self::generate_token();
        let mut sessions = self.sessions.write().await;

        if let Some(max) = self.policy.max_sessions {
            let ttl = self.policy.ttl;
            sessions.retain(|_, session| !session.is_expired(ttl));

            while max > 0 && sessions.len() >= max {
                let Some(oldest) = sessions
                    .iter()
                    .min_by_key(|(_, session)| session.created_at)
                    .map(|(token, _)| token.clone())
                else {
                    break;
                };
                sessions.remove(&oldest);
                tracing::debug!(max_sessions = max, "Evicted oldest session");
            }
        }

        sessions.insert(
            token.clone(),
            Session { consent, code_verifier, tokens: None, created_at: Instant::now() },
        );

        token
    }

    /// Look up a session. Unknown and expired tokens yield `None`.
    pub async fn get(&self, token: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(token).filter(|s| !s.is_expired(self.policy.ttl)).cloned()
    }

    /// Flow state for a token.
    pub async fn state(&self, token: &str) -> AuthorizationState {
        self.get(token).await.map_or(AuthorizationState::Unstarted, |s| s.state())
    }

    /// Attach tokens to a session, replacing any earlier ones.
    pub async fn attach_tokens(&self, token: &str, tokens: Tokens) -> AisResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(token)
            .filter(|s| !s.is_expired(self.policy.ttl))
            .ok_or(AisError::InvalidState)?;
        session.tokens = Some(tokens);
        Ok(())
    }

    /// Number of stored sessions, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop expired sessions. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let ttl = self.policy.ttl;
        if ttl.is_none() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(ttl));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(count = removed, "Cleaned up expired sessions");
        }
        removed
    }

    /// Start background cleanup of expired sessions. Does nothing without a TTL.
    pub fn start_cleanup_task(&self) -> Option<JoinHandle<()>> {
        let ttl = self.policy.ttl?;
        let store = self.clone();
        let period = ttl.clamp(Duration::from_secs(1), CLEANUP_INTERVAL);

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                store.purge_expired().await;
            }
        }))
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").field("policy", &self.policy).finish_non_exhaustive()
    }
}
