//! In-memory session tokens and the `SessionUser` extractor.
//!
//! Tokens are opaque UUIDs handed out at login and presented back as
//! `Authorization: Bearer <token>`. Sessions live in memory only; a
//! remember-me token stored on the account can revive one after a
//! restart.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct Session {
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub remember: bool,
}

/// Token → session map shared across handlers.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    /// Mint a fresh token for `email`.
    pub async fn issue(&self, email: &str, ttl: Duration, remember: bool) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.adopt(&token, email, ttl, remember).await;
        token
    }

    /// Register a session under a caller-provided token (remember-me
    /// revival keeps the browser's existing token).
    pub async fn adopt(&self, token: &str, email: &str, ttl: Duration, remember: bool) {
        let session = Session {
            email: email.to_string(),
            expires_at: Utc::now() + ttl,
            remember,
        };
        self.inner.write().await.insert(token.to_string(), session);
    }

    /// Look up a live session. Expired entries are dropped on touch.
    pub async fn resolve(&self, token: &str) -> Option<Session> {
        let mut guard = self.inner.write().await;
        match guard.get(token) {
            Some(s) if s.expires_at > Utc::now() => Some(s.clone()),
            Some(_) => {
                guard.remove(token);
                None
            }
            None => None,
        }
    }

    /// Drop one session, returning it if it existed.
    pub async fn revoke(&self, token: &str) -> Option<Session> {
        self.inner.write().await.remove(token)
    }

    /// Drop every session belonging to `email` (password changes).
    pub async fn revoke_all_for(&self, email: &str) {
        self.inner.write().await.retain(|_, s| s.email != email);
    }
}

/// Authenticated caller, extracted from the bearer token.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub email: String,
    pub token: String,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;
        if let Some(session) = state.sessions.resolve(&token).await {
            return Ok(SessionUser { email: session.email, token });
        }
        // A remembered browser may present its long-lived token after the
        // in-memory session was lost across a restart. Revive it.
        if let Some(email) = state.find_remember_token(&token).await {
            let ttl = Duration::days(state.config.sessions.remember_days);
            state.sessions.adopt(&token, &email, ttl, true).await;
            debug!(target: "account", %email, "Session revived from remember token");
            return Ok(SessionUser { email, token });
        }
        Err(ApiError::Unauthorized)
    }
}
