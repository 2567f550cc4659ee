//! Profile page: display name and e-mail, saved onto the identity record.

#[cfg(test)]
#[path = "profile_test.rs"]
mod profile_test;

use serde_json::json;

use super::message_or;
use crate::identity::{User, UserAttributes};
use crate::state::auth::SessionManager;
use crate::state::request::RequestState;

pub const SAVED: &str = "Profile saved successfully!";
pub const SAVE_FAILED: &str = "Failed to save profile";
pub const LOGIN_REQUIRED: &str = "You must be logged in to save your profile.";
pub const NAME_REQUIRED: &str = "Name is required.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePage {
    pub name: String,
    pub email: String,
    pub request: RequestState,
}

impl ProfilePage {
    /// Form prefilled from the signed-in user, blank without one.
    #[must_use]
    pub fn from_user(user: Option<&User>) -> Self {
        let mut page = Self::default();
        page.fill(user);
        page
    }

    pub fn fill(&mut self, user: Option<&User>) {
        self.name = user.and_then(User::display_name).unwrap_or_default().to_owned();
        self.email = user.and_then(|u| u.email.clone()).unwrap_or_default();
    }

    /// Attributes to send: the name always, the e-mail only when it changed.
    #[must_use]
    pub fn attributes(&self, current: Option<&User>) -> UserAttributes {
        let email = self.email.trim();
        let changed = !email.is_empty() && current.and_then(|u| u.email.as_deref()) != Some(email);
        UserAttributes {
            email: changed.then(|| email.to_owned()),
            password: None,
            data: Some(json!({ "name": self.name.trim() })),
        }
    }

    pub async fn save(&mut self, manager: &SessionManager) {
        let state = manager.state();
        if state.access_token().is_none() {
            self.request.reject(LOGIN_REQUIRED);
            return;
        }
        if self.name.trim().is_empty() {
            self.request.reject(NAME_REQUIRED);
            return;
        }
        let attributes = self.attributes(state.user());
        self.request.begin();
        match manager.update_user(&attributes).await {
            Ok(user) => {
                self.fill(Some(&user));
                self.request.succeed(Some(SAVED.to_owned()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "profile save failed");
                self.request.fail(message_or(e.to_string(), SAVE_FAILED));
            }
        }
    }
}
