//! Identity provider seam.
//!
//! SYSTEM CONTEXT
//! ==============
//! Token issuance and refresh belong to the external identity service. This
//! module defines what the rest of the crate needs from it (a trait, the
//! session/user types and a change-event stream) so the session manager can
//! be driven by the real provider or by a scripted one in tests.
//!
//! EVENTS
//! ======
//! Changes fan out over a tokio broadcast channel. A subscriber owns an
//! [`AuthSubscription`]; dropping it is the unsubscription, so a consumer
//! torn down mid-flight can never leak a listener.

pub mod storage;
pub mod supabase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use supabase::SupabaseAuth;

const EVENT_CAPACITY: usize = 32;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider rejected the call; `message` is its own wording.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("identity provider unreachable: {0}")]
    Transport(String),

    #[error("unexpected identity provider response: {0}")]
    Decode(String),

    #[error("Auth session missing!")]
    MissingSession,

    #[error("session storage failed: {0}")]
    Storage(String),
}

impl ProviderError {
    /// Whether the text is the provider's own and fit to show a user as is.
    #[must_use]
    pub fn is_provider_message(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::MissingSession)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

// =============================================================================
// SESSION TYPES
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl User {
    /// String entry of `user_metadata`, if present and non-empty.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.metadata_str("name")
    }
}

/// Token bundle for one signed-in user.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

impl Session {
    /// True when the token expires within `margin` seconds of `now`.
    /// Sessions without an expiry never expire locally.
    #[must_use]
    pub fn expires_within(&self, now: i64, margin: i64) -> bool {
        self.expires_at.is_some_and(|at| at - margin <= now)
    }
}

/// Result of sign-up. `session` is absent while e-mail confirmation is pending.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SignUpOutcome {
    pub user: Option<User>,
    pub session: Option<Session>,
}

/// Fields accepted by [`IdentityProvider::update_user`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UserAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Merged into `user_metadata`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// =============================================================================
// EVENTS
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

impl AuthChange {
    #[must_use]
    pub fn new(event: AuthEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }
}

/// Broadcast hub a provider publishes its session changes on.
#[derive(Clone, Debug)]
pub struct AuthEvents {
    tx: broadcast::Sender<AuthChange>,
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthEvents {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Publish a change. Having no subscribers is not an error.
    pub fn emit(&self, change: AuthChange) {
        tracing::debug!(event = ?change.event, receivers = self.tx.receiver_count(), "auth change");
        let _ = self.tx.send(change);
    }

    #[must_use]
    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription { rx: self.tx.subscribe() }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Live subscription to provider changes; dropping it unsubscribes.
#[derive(Debug)]
pub struct AuthSubscription {
    rx: broadcast::Receiver<AuthChange>,
}

impl AuthSubscription {
    /// Next change, or `None` once the provider is gone. A lagging
    /// subscriber skips what it missed; only the latest state matters.
    pub async fn recv(&mut self) -> Option<AuthChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "auth subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// =============================================================================
// PROVIDER TRAIT
// =============================================================================

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session, refreshed first if it is about to expire.
    async fn get_session(&self) -> Result<Option<Session>, ProviderError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, ProviderError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ProviderError>;

    /// Revoke the remote session. Local state is cleared even when this fails.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    async fn reset_password_for_email(&self, email: &str, redirect_to: Option<&str>) -> Result<(), ProviderError>;

    async fn update_user(&self, attributes: &UserAttributes) -> Result<User, ProviderError>;

    fn subscribe(&self) -> AuthSubscription;
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
