//! Shared state: the live auth session and the per-page request lifecycle.

pub mod auth;
pub mod request;
