//! Top bar: product title, avatar initial and the user menu.

#[cfg(test)]
#[path = "header_test.rs"]
mod header_test;

use crate::identity::User;
use crate::routes::Route;
use crate::state::auth::SessionManager;

pub const APP_TITLE: &str = "JOU CloudSec";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Profile,
    Settings,
    SignOut,
}

impl MenuAction {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            MenuAction::Profile => "Your Profile",
            MenuAction::Settings => "Settings",
            MenuAction::SignOut => "Sign out",
        }
    }
}

pub const HEADER_MENU: [MenuAction; 3] = [MenuAction::Profile, MenuAction::Settings, MenuAction::SignOut];

/// First letter of the e-mail, upper-cased; `U` when unknown.
#[must_use]
pub fn user_initial(user: Option<&User>) -> char {
    user.and_then(|u| u.email.as_deref())
        .and_then(|email| email.chars().next())
        .and_then(|c| c.to_uppercase().next())
        .unwrap_or('U')
}

#[must_use]
pub fn user_label(user: Option<&User>) -> &str {
    user.and_then(|u| u.email.as_deref())
        .unwrap_or("Not logged in")
}

/// Carry out a menu action and return where to navigate next.
///
/// Sign-out always lands on the login route: local state is cleared even
/// when the provider call fails, and that failure is only logged.
pub async fn run_menu_action(action: MenuAction, manager: &SessionManager) -> Route {
    match action {
        MenuAction::Profile => Route::Profile,
        MenuAction::Settings => Route::Settings,
        MenuAction::SignOut => {
            if let Err(e) = manager.sign_out().await {
                tracing::warn!(error = %e, "sign-out error");
            }
            Route::Login
        }
    }
}

/// Open/closed state of a user dropdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenuState {
    pub open: bool,
}

impl MenuState {
    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn close(&mut self) {
        self.open = false;
    }
}
