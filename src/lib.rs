//! CloudSec console: session lifecycle, backend REST client and headless
//! page controllers for the cloud-security scanning dashboard.
//!
//! SYSTEM CONTEXT
//! ==============
//! Scanning, AWS access and IAM analysis all happen in the backend service.
//! This crate owns only the client side of that contract:
//!
//! - `identity`: the identity-provider seam and its Supabase implementation.
//! - `state`: the injectable session store and the manager that keeps it in
//!   sync with the provider.
//! - `net`: one typed call per backend endpoint, with error normalization.
//! - `pages`: per-page request state machines a front end renders.
//! - `routes`, `components`, `util`: navigation gate, chrome, export.
//!
//! Control flow is always: page reads the token from the session store, calls
//! the API client, and turns the outcome into inline state.

pub mod components;
pub mod config;
pub mod identity;
pub mod net;
pub mod pages;
pub mod routes;
pub mod state;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::ConsoleConfig;
pub use identity::{IdentityProvider, Session, User};
pub use net::api::ApiClient;
pub use net::error::ApiError;
pub use state::auth::{AuthState, SessionManager, SessionStore};
