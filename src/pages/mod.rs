//! Headless page controllers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each page owns its form fields, fetched data and a [`RequestState`], and
//! exposes async actions that take their collaborators by reference: the
//! [`ApiClient`] for backend calls, the [`SessionStore`] for the bearer token
//! and the [`SessionManager`] for identity operations. A front end renders
//! the fields; nothing here knows about HTML.
//!
//! ERROR HANDLING
//! ==============
//! Actions never return errors. Every failure (missing token, validation,
//! transport, backend) ends as an inline message in the page's request
//! state, and the in-flight flag is cleared on every path.
//!
//! [`RequestState`]: crate::state::request::RequestState
//! [`ApiClient`]: crate::net::api::ApiClient
//! [`SessionStore`]: crate::state::auth::SessionStore
//! [`SessionManager`]: crate::state::auth::SessionManager

pub mod aws_account;
pub mod cspm;
pub mod cwpp;
pub mod dashboard;
pub mod history;
pub mod login;
pub mod profile;
pub mod reset_password;
pub mod settings;

/// An error's text, or `fallback` when that text is blank.
pub(crate) fn message_or(message: String, fallback: &str) -> String {
    if message.trim().is_empty() { fallback.to_owned() } else { message }
}
