//! Navigation gate.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every route applies the same rule, so the decision lives here rather than
//! in each page: wait while the initial session check is in flight, then
//! either render or redirect.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use crate::routes::Route;
use crate::state::auth::AuthState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Session check still running; show a placeholder.
    Loading,
    Redirect(Route),
    Render,
}

/// True once auth has settled and no user is present.
#[must_use]
pub fn should_redirect_unauth(state: &AuthState) -> bool {
    !state.loading && state.session.is_none()
}

/// Decide what to show for `route` given the current auth state.
#[must_use]
pub fn gate(route: Route, state: &AuthState) -> GateDecision {
    if route.is_protected() {
        if state.loading {
            GateDecision::Loading
        } else if should_redirect_unauth(state) {
            GateDecision::Redirect(Route::Login)
        } else {
            GateDecision::Render
        }
    } else if route == Route::Login && !state.loading && state.session.is_some() {
        GateDecision::Redirect(Route::Dashboard)
    } else {
        GateDecision::Render
    }
}
