//! Helpers shared across pages and the shell.
//!
//! SYSTEM CONTEXT
//! ==============
//! Pure functions only: the navigation gate decision and local export
//! serialization. Neither touches the network.

pub mod auth;
pub mod export;
