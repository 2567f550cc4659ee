//! Login page: password sign-in, sign-up and the reset-password e-mail form.

#[cfg(test)]
#[path = "login_test.rs"]
mod login_test;

use crate::identity::ProviderError;
use crate::routes::Route;
use crate::state::auth::{AuthState, SessionManager};
use crate::state::request::{Phase, RequestState};
use crate::util::auth::{GateDecision, gate};

pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred. Please try again.";
pub const RESET_SENT: &str = "Password reset email sent!";
pub const CONFIRM_EMAIL: &str = "Check your email to confirm your account.";
pub const CREDENTIALS_REQUIRED: &str = "Email and password are required.";
pub const EMAIL_REQUIRED: &str = "Enter your email address.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoginMode {
    #[default]
    SignIn,
    SignUp,
    Reset,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginPage {
    pub email: String,
    pub password: String,
    pub reset_email: String,
    pub mode: LoginMode,
    pub request: RequestState,
}

/// Trimmed e-mail and the password as typed, both required.
///
/// # Errors
///
/// Returns the inline message when either is blank.
pub fn validate_credentials(email: &str, password: &str) -> Result<(String, String), &'static str> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(CREDENTIALS_REQUIRED);
    }
    Ok((email.to_owned(), password.to_owned()))
}

/// Text shown for a failed identity call: the provider's own wording when it
/// gave one, a generic apology for transport and decoding trouble.
#[must_use]
pub fn provider_message(err: &ProviderError) -> String {
    if err.is_provider_message() { err.to_string() } else { UNEXPECTED_ERROR.to_owned() }
}

/// Where a signed-in visitor of the login page should be sent instead.
#[must_use]
pub fn redirect_if_signed_in(state: &AuthState) -> Option<Route> {
    match gate(Route::Login, state) {
        GateDecision::Redirect(route) => Some(route),
        GateDecision::Loading | GateDecision::Render => None,
    }
}

impl LoginPage {
    pub fn set_mode(&mut self, mode: LoginMode) {
        self.mode = mode;
        self.request.reset();
    }

    /// Leave the reset confirmation and go back to the sign-in form.
    pub fn back_to_login(&mut self) {
        self.reset_email.clear();
        self.set_mode(LoginMode::SignIn);
    }

    #[must_use]
    pub fn reset_sent(&self) -> bool {
        self.mode == LoginMode::Reset && self.request.phase == Phase::Succeeded
    }

    /// Submit the form for the current mode. Returns the route to navigate to
    /// when the visitor ends up signed in.
    pub async fn submit(&mut self, manager: &SessionManager) -> Option<Route> {
        match self.mode {
            LoginMode::Reset => {
                self.send_reset(manager).await;
                None
            }
            LoginMode::SignIn | LoginMode::SignUp => self.authenticate(manager).await,
        }
    }

    async fn authenticate(&mut self, manager: &SessionManager) -> Option<Route> {
        let (email, password) = match validate_credentials(&self.email, &self.password) {
            Ok(creds) => creds,
            Err(message) => {
                self.request.reject(message);
                return None;
            }
        };

        self.request.begin();
        let result = if self.mode == LoginMode::SignUp {
            manager
                .sign_up(&email, &password)
                .await
                .map(|outcome| outcome.session.is_some())
        } else {
            manager.sign_in(&email, &password).await.map(|_| true)
        };

        match result {
            Ok(true) => {
                self.password.clear();
                self.request.succeed(None);
                Some(Route::Dashboard)
            }
            Ok(false) => {
                self.request.succeed(Some(CONFIRM_EMAIL.to_owned()));
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, mode = ?self.mode, "authentication failed");
                self.request.fail(provider_message(&e));
                None
            }
        }
    }

    async fn send_reset(&mut self, manager: &SessionManager) {
        let email = self.reset_email.trim().to_owned();
        if email.is_empty() {
            self.request.reject(EMAIL_REQUIRED);
            return;
        }
        self.request.begin();
        let outcome = match manager.reset_password(&email).await {
            Ok(()) => Ok(Some(RESET_SENT.to_owned())),
            Err(e) => {
                tracing::warn!(error = %e, "password reset error");
                Err(provider_message(&e))
            }
        };
        self.request.finish(outcome);
    }
}
