//! Supabase GoTrue client.
//!
//! DESIGN
//! ======
//! Mirrors what the browser SDK does on the dashboard's behalf: password
//! grant and sign-up against `/auth/v1`, a locally persisted session that is
//! refreshed shortly before it expires, and a change event for every
//! transition. Every request carries the project's anon key in `apikey`;
//! user-scoped calls authenticate with the session's access token instead of
//! the anon key.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde_json::{Value, json};

use super::storage::SessionStorage;
use super::{
    AuthChange, AuthEvent, AuthEvents, AuthSubscription, IdentityProvider, ProviderError, Session, SignUpOutcome,
    User, UserAttributes,
};

/// Refresh this many seconds before the access token actually expires.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

const AUTH_PREFIX: &str = "/auth/v1";

pub struct SupabaseAuth {
    http: reqwest::Client,
    url: String,
    anon_key: String,
    storage: Arc<dyn SessionStorage>,
    events: AuthEvents,
}

impl std::fmt::Debug for SupabaseAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseAuth").field("url", &self.url).finish_non_exhaustive()
    }
}

fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

impl SupabaseAuth {
    #[must_use]
    pub fn new(url: &str, anon_key: &str, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_owned(),
            anon_key: anon_key.to_owned(),
            storage,
            events: AuthEvents::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{AUTH_PREFIX}{path}", self.url)
    }

    fn build(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(path))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, ProviderError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = error_message(status.as_u16(), &text);
            tracing::debug!(status = status.as_u16(), %message, "identity provider rejected request");
            return Err(ProviderError::Api { status: status.as_u16(), message });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ProviderError::Decode(e.to_string()))
    }

    /// Persist a freshly issued session, filling `expires_at` when the
    /// provider only sent `expires_in`.
    async fn store(&self, mut session: Session) -> Result<Session, ProviderError> {
        if session.expires_at.is_none() {
            session.expires_at = session.expires_in.map(|secs| now_unix() + secs);
        }
        self.storage.save(&session).await?;
        Ok(session)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        let body = self
            .send(
                self.build(Method::POST, "/token", None)
                    .query(&[("grant_type", "refresh_token")])
                    .json(&json!({ "refresh_token": refresh_token })),
            )
            .await?;
        let session = decode::<Session>(body)?;
        self.store(session).await
    }

    /// Drop the local session and tell subscribers.
    async fn clear_local(&self) {
        if let Err(e) = self.storage.clear().await {
            tracing::warn!(error = %e, "failed to clear stored session");
        }
        self.events.emit(AuthChange::new(AuthEvent::SignedOut, None));
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, ProviderError> {
    serde_json::from_value(body).map_err(|e| ProviderError::Decode(e.to_string()))
}

/// The provider's own error text: `error_description`, `msg`, `message` or
/// `error`, whichever comes first, else `HTTP <status>`.
#[must_use]
pub fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_owned))
        })
        .unwrap_or_else(|| format!("HTTP {status}"))
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        let Some(session) = self.storage.load().await? else {
            return Ok(None);
        };
        let now = now_unix();
        if !session.expires_within(now, EXPIRY_MARGIN_SECS) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.clone() else {
            if session.expires_within(now, 0) {
                tracing::info!("stored session expired without a refresh token");
                self.clear_local().await;
                return Ok(None);
            }
            return Ok(Some(session));
        };

        match self.refresh(&refresh_token).await {
            Ok(refreshed) => {
                tracing::debug!(user_id = %refreshed.user.id, "session refreshed");
                self.events
                    .emit(AuthChange::new(AuthEvent::TokenRefreshed, Some(refreshed.clone())));
                Ok(Some(refreshed))
            }
            Err(e) => {
                tracing::warn!(error = %e, "session refresh failed");
                self.clear_local().await;
                Err(e)
            }
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        let body = self
            .send(
                self.build(Method::POST, "/token", None)
                    .query(&[("grant_type", "password")])
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;
        let session = self.store(decode(body)?).await?;
        tracing::info!(user_id = %session.user.id, "signed in");
        self.events
            .emit(AuthChange::new(AuthEvent::SignedIn, Some(session.clone())));
        Ok(session)
    }

    /// With e-mail confirmation enabled the provider answers with the bare
    /// user; with auto-confirm it answers with a full session.
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ProviderError> {
        let body = self
            .send(
                self.build(Method::POST, "/signup", None)
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;

        if body.get("access_token").is_some() {
            let session = self.store(decode(body)?).await?;
            self.events
                .emit(AuthChange::new(AuthEvent::SignedIn, Some(session.clone())));
            return Ok(SignUpOutcome { user: Some(session.user.clone()), session: Some(session) });
        }

        let user = match body.get("user") {
            Some(user) if !user.is_null() => decode::<User>(user.clone())?,
            _ => decode::<User>(body)?,
        };
        tracing::info!(user_id = %user.id, "signed up, confirmation pending");
        Ok(SignUpOutcome { user: Some(user), session: None })
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let stored = match self.storage.load().await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored session during sign-out");
                None
            }
        };

        let remote = match stored {
            Some(session) => self
                .send(self.build(Method::POST, "/logout", Some(&session.access_token)))
                .await
                .map(|_| ()),
            None => Ok(()),
        };

        self.clear_local().await;
        if let Err(e) = &remote {
            tracing::warn!(error = %e, "remote sign-out failed; local session cleared");
        }
        remote
    }

    async fn reset_password_for_email(&self, email: &str, redirect_to: Option<&str>) -> Result<(), ProviderError> {
        let mut request = self
            .build(Method::POST, "/recover", None)
            .json(&json!({ "email": email }));
        if let Some(redirect) = redirect_to {
            request = request.query(&[("redirect_to", redirect)]);
        }
        self.send(request).await?;
        tracing::info!("password reset e-mail requested");
        Ok(())
    }

    async fn update_user(&self, attributes: &UserAttributes) -> Result<User, ProviderError> {
        let session = self.get_session().await?.ok_or(ProviderError::MissingSession)?;
        let body = self
            .send(
                self.build(Method::PUT, "/user", Some(&session.access_token))
                    .json(attributes),
            )
            .await?;
        let user: User = decode(body)?;

        let updated = Session { user: user.clone(), ..session };
        self.storage.save(&updated).await?;
        self.events
            .emit(AuthChange::new(AuthEvent::UserUpdated, Some(updated)));
        Ok(user)
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "supabase_test.rs"]
mod tests;
