//! Choose a new password after following a reset e-mail link.
//!
//! The link signs the visitor in with a recovery session; this page only
//! updates the password on that session.

#[cfg(test)]
#[path = "reset_password_test.rs"]
mod reset_password_test;

use super::login::provider_message;
use crate::identity::UserAttributes;
use crate::routes::Route;
use crate::state::auth::SessionManager;
use crate::state::request::RequestState;

pub const MIN_PASSWORD_LEN: usize = 6;

pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters.";
pub const PASSWORDS_DIFFER: &str = "Passwords do not match.";
pub const LINK_EXPIRED: &str = "Your reset link is invalid or has expired.";
pub const PASSWORD_UPDATED: &str = "Password updated successfully!";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetPasswordPage {
    pub password: String,
    pub confirm: String,
    pub request: RequestState,
}

/// # Errors
///
/// Returns the inline message for a short or mismatched password.
pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), &'static str> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PASSWORD_TOO_SHORT);
    }
    if password != confirm {
        return Err(PASSWORDS_DIFFER);
    }
    Ok(())
}

impl ResetPasswordPage {
    /// Returns the dashboard route once the password has been changed.
    pub async fn submit(&mut self, manager: &SessionManager) -> Option<Route> {
        if let Err(message) = validate_new_password(&self.password, &self.confirm) {
            self.request.reject(message);
            return None;
        }
        if manager.state().session.is_none() {
            self.request.reject(LINK_EXPIRED);
            return None;
        }

        self.request.begin();
        let attributes = UserAttributes { password: Some(self.password.clone()), ..UserAttributes::default() };
        match manager.update_user(&attributes).await {
            Ok(_) => {
                self.password.clear();
                self.confirm.clear();
                self.request.succeed(Some(PASSWORD_UPDATED.to_owned()));
                Some(Route::Dashboard)
            }
            Err(e) => {
                tracing::warn!(error = %e, "password update failed");
                self.request.fail(provider_message(&e));
                None
            }
        }
    }
}
