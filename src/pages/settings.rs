//! Settings page: collapsible sections and user preferences.
//!
//! Preferences live under `user_metadata.preferences` on the identity record,
//! so they follow the user across devices without a backend endpoint.

#[cfg(test)]
#[path = "settings_test.rs"]
mod settings_test;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::message_or;
use crate::identity::{User, UserAttributes};
use crate::state::auth::SessionManager;
use crate::state::request::RequestState;

pub const SAVED: &str = "Settings saved successfully!";
pub const SAVE_FAILED: &str = "Failed to save settings";
pub const LOGIN_REQUIRED: &str = "You must be logged in to save settings.";

const PREFERENCES_KEY: &str = "preferences";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Account,
    Notifications,
    Appearance,
}

impl Section {
    pub const ALL: [Self; 3] = [Self::Account, Self::Notifications, Self::Appearance];

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Account => "Account Settings",
            Self::Notifications => "Notification Preferences",
            Self::Appearance => "Appearance",
        }
    }

    #[must_use]
    pub fn tooltip(self) -> &'static str {
        match self {
            Self::Account => "Change your email, password, and other account details",
            Self::Notifications => "Set how you receive alerts and notifications",
            Self::Appearance => "Customize light/dark mode and other UI preferences",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub email_alerts: bool,
    pub theme: Theme,
}

impl Default for Preferences {
    fn default() -> Self {
        Self { email_alerts: true, theme: Theme::System }
    }
}

impl Preferences {
    /// Stored preferences, defaults when absent or unreadable.
    #[must_use]
    pub fn from_user(user: Option<&User>) -> Self {
        user.and_then(preferences_value)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsPage {
    pub account_open: bool,
    pub notifications_open: bool,
    pub appearance_open: bool,
    pub preferences: Preferences,
    pub request: RequestState,
}

impl Default for SettingsPage {
    fn default() -> Self {
        Self {
            account_open: true,
            notifications_open: false,
            appearance_open: false,
            preferences: Preferences::default(),
            request: RequestState::default(),
        }
    }
}

impl SettingsPage {
    #[must_use]
    pub fn from_user(user: Option<&User>) -> Self {
        Self { preferences: Preferences::from_user(user), ..Self::default() }
    }

    #[must_use]
    pub fn is_open(&self, section: Section) -> bool {
        match section {
            Section::Account => self.account_open,
            Section::Notifications => self.notifications_open,
            Section::Appearance => self.appearance_open,
        }
    }

    pub fn toggle(&mut self, section: Section) {
        let flag = match section {
            Section::Account => &mut self.account_open,
            Section::Notifications => &mut self.notifications_open,
            Section::Appearance => &mut self.appearance_open,
        };
        *flag = !*flag;
    }

    pub async fn save(&mut self, manager: &SessionManager) {
        if manager.store().access_token().is_none() {
            self.request.reject(LOGIN_REQUIRED);
            return;
        }
        let preferences = match serde_json::to_value(&self.preferences) {
            Ok(value) => value,
            Err(e) => {
                self.request.reject(message_or(e.to_string(), SAVE_FAILED));
                return;
            }
        };
        let attributes = UserAttributes { data: Some(json!({ PREFERENCES_KEY: preferences })), ..UserAttributes::default() };

        self.request.begin();
        match manager.update_user(&attributes).await {
            Ok(user) => {
                self.preferences = Preferences::from_user(Some(&user));
                self.request.succeed(Some(SAVED.to_owned()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "settings save failed");
                self.request.fail(message_or(e.to_string(), SAVE_FAILED));
            }
        }
    }
}

/// Preferences object as stored in user metadata.
#[must_use]
pub fn preferences_value(user: &User) -> Option<&Value> {
    user.user_metadata.get(PREFERENCES_KEY)
}
