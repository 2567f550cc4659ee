//! Backend HTTP access: the typed client, its error type and the wire DTOs.

pub mod api;
pub mod error;
pub mod types;
