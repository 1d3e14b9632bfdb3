//! The one authoritative session.
//!
//! A client holds exactly one [`Session`] and passes it by reference to
//! whatever needs the actor or the bearer token. Signing out, or noticing the
//! token expired, goes through [`Session::invalidate`], which is the only
//! place actor-specific state is dropped.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Coded, ErrorCode};
use crate::model::Author;
use crate::store::ContentStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("no active session for {actor}")]
    Missing { actor: String },

    #[error("session for {actor} expired at {expired_at}")]
    Expired {
        actor: String,
        expired_at: DateTime<Utc>,
    },
}

impl Coded for AuthError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::Missing { .. } => ErrorCode::SessionMissing,
            Self::Expired { .. } => ErrorCode::SessionExpired,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub actor: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub token: Option<SessionToken>,
}

impl Session {
    /// A signed-out session for `actor`.
    #[must_use]
    pub fn anonymous(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            display_name: None,
            token: None,
        }
    }

    #[must_use]
    pub fn login(actor: impl Into<String>, token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        let session = Self {
            actor: actor.into(),
            display_name: None,
            token: Some(SessionToken {
                value: token.into(),
                expires_at,
            }),
        };
        info!(actor = %session.actor, %expires_at, "session started");
        session
    }

    /// Log in for `ttl` starting at `now`.
    #[must_use]
    pub fn login_for(actor: impl Into<String>, token: impl Into<String>, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self::login(actor, token, now + ttl)
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// The author record new content is attributed to.
    #[must_use]
    pub fn author(&self) -> Author {
        let author = Author::new(self.actor.clone());
        match &self.display_name {
            Some(name) => author.with_display_name(name.clone()),
            None => author,
        }
    }

    /// The token, if it is present and still valid at `now`.
    ///
    /// # Errors
    ///
    /// [`AuthError::Missing`] when signed out, [`AuthError::Expired`] past
    /// the expiry.
    pub fn check(&self, now: DateTime<Utc>) -> Result<&SessionToken, AuthError> {
        let token = self.token.as_ref().ok_or_else(|| AuthError::Missing {
            actor: self.actor.clone(),
        })?;
        if token.is_expired(now) {
            return Err(AuthError::Expired {
                actor: self.actor.clone(),
                expired_at: token.expires_at,
            });
        }
        Ok(token)
    }

    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.check(now).is_ok()
    }

    /// `Bearer <token>` for an outbound request.
    ///
    /// # Errors
    ///
    /// Same as [`Self::check`].
    pub fn authorization_header(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        self.check(now).map(|t| format!("Bearer {}", t.value))
    }

    /// Drop the token and every piece of actor-specific state in `store`.
    ///
    /// Public counts survive; the actor's vote, like and save flags and the
    /// pending command ledger do not.
    pub fn invalidate(&mut self, store: &mut ContentStore) {
        let had_token = self.token.take().is_some();
        store.clear_actor_state();
        info!(actor = %self.actor, had_token, "session invalidated");
    }
}
