//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! The navigation gate and every page read the session from one explicitly
//! owned [`SessionStore`]; nothing reaches for a global. The
//! [`SessionManager`] is the only writer besides explicit sign-in/out: it
//! performs the initial session check and mirrors provider change events
//! into the store for as long as it is mounted.
//!
//! LOADING
//! =======
//! `loading` is set synchronously by `mount` and cleared exactly once, when
//! the initial check resolves. Event mirroring never touches it, so callers
//! that wait on [`SessionManager::settled`] cannot observe a logged-out flash
//! before the check completes.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::identity::{AuthSubscription, IdentityProvider, ProviderError, Session, SignUpOutcome, User, UserAttributes};

/// Authentication state tracking the current session and loading status.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthState {
    pub session: Option<Session>,
    pub loading: bool,
}

impl AuthState {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.access_token.as_str())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Cloneable handle to the one live [`AuthState`]. Clones share state.
#[derive(Clone, Debug)]
pub struct SessionStore {
    tx: Arc<watch::Sender<AuthState>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self { tx: Arc::new(watch::Sender::new(AuthState::default())) }
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }

    pub fn set_session(&self, session: Option<Session>) {
        self.tx.send_modify(|state| state.session = session);
    }

    pub fn set_loading(&self, loading: bool) {
        self.tx.send_modify(|state| state.loading = loading);
    }

    /// Drop the session, user and token together.
    pub fn clear(&self) {
        self.set_session(None);
    }

    /// Replace the user inside the live session, if any.
    pub fn set_user(&self, user: User) {
        self.tx.send_modify(|state| {
            if let Some(session) = state.session.as_mut() {
                session.user = user;
            }
        });
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.tx.borrow().access_token().map(ToOwned::to_owned)
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.tx.borrow().user().cloned()
    }

    fn settle(&self, session: Option<Session>) {
        self.tx.send_modify(|state| {
            state.session = session;
            state.loading = false;
        });
    }
}

// =============================================================================
// MANAGER
// =============================================================================

/// Binds an [`IdentityProvider`] to a [`SessionStore`] for the lifetime of
/// the owning front end. Dropping or unmounting stops the mirroring task and
/// with it the provider subscription.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    store: SessionStore,
    reset_redirect: Option<String>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.store.snapshot())
            .field("mounted", &self.task.is_some())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Start synchronizing. `loading` is true when this returns and flips to
    /// false once the initial check resolves.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn mount(provider: Arc<dyn IdentityProvider>, store: SessionStore) -> Self {
        store.set_loading(true);
        let subscription = provider.subscribe();
        let task = tokio::spawn(sync_session(provider.clone(), store.clone(), subscription));
        Self { provider, store, reset_redirect: None, task: Some(task) }
    }

    /// Where password-reset e-mails should send the user back to.
    #[must_use]
    pub fn with_reset_redirect(mut self, redirect: Option<String>) -> Self {
        self.reset_redirect = redirect;
        self
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.store.snapshot()
    }

    /// Wait for the initial session check, then return the state.
    pub async fn settled(&self) -> AuthState {
        let mut rx = self.store.subscribe();
        match rx.wait_for(|state| !state.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.store.snapshot(),
        }
    }

    /// # Errors
    ///
    /// Returns the provider's error; the store is left untouched.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        let session = self.provider.sign_in_with_password(email, password).await?;
        self.store.set_session(Some(session.clone()));
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns the provider's error; the store is left untouched.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ProviderError> {
        let outcome = self.provider.sign_up(email, password).await?;
        if let Some(session) = &outcome.session {
            self.store.set_session(Some(session.clone()));
        }
        Ok(outcome)
    }

    /// Revoke the remote session and clear local state regardless.
    ///
    /// # Errors
    ///
    /// Returns the remote failure after local state has been cleared.
    pub async fn sign_out(&self) -> Result<(), ProviderError> {
        let remote = self.provider.sign_out().await;
        self.store.clear();
        if let Err(e) = &remote {
            tracing::warn!(error = %e, "remote sign-out failed");
        }
        remote
    }

    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn reset_password(&self, email: &str) -> Result<(), ProviderError> {
        self.provider
            .reset_password_for_email(email, self.reset_redirect.as_deref())
            .await
    }

    /// # Errors
    ///
    /// Returns the provider's error; the store is left untouched.
    pub async fn update_user(&self, attributes: &UserAttributes) -> Result<User, ProviderError> {
        let user = self.provider.update_user(attributes).await?;
        self.store.set_user(user.clone());
        Ok(user)
    }

    /// Stop mirroring provider changes.
    pub fn unmount(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sync_session(provider: Arc<dyn IdentityProvider>, store: SessionStore, mut subscription: AuthSubscription) {
    let initial = match provider.get_session().await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "initial session check failed; treating as signed out");
            None
        }
    };
    tracing::debug!(authenticated = initial.is_some(), "initial session check resolved");
    store.settle(initial);

    while let Some(change) = subscription.recv().await {
        tracing::debug!(event = ?change.event, "mirroring auth change");
        store.set_session(change.session);
    }
}
