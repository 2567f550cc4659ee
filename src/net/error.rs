//! Normalized failures for backend API calls.
//!
//! Callers never inspect raw status codes: every non-2xx response and every
//! transport/parse problem becomes one of these variants, whose `Display`
//! text is what pages show inline.

use serde_json::Value;

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized: Invalid or expired token. Please log in again.";
pub const FORBIDDEN_MESSAGE: &str = "Forbidden: You do not have permission to access this resource.";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// HTTP 401, regardless of body.
    #[error("{}", UNAUTHORIZED_MESSAGE)]
    Unauthorized,

    /// HTTP 403, regardless of body.
    #[error("{}", FORBIDDEN_MESSAGE)]
    Forbidden,

    /// Non-2xx response whose body carried a structured `error` field.
    #[error("Error: {message}")]
    Server { status: u16, message: String },

    /// Any other non-2xx response.
    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String, body: Value },

    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),

    /// The response could not be read or did not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Map a failed response to its error, given the already-parsed body.
    #[must_use]
    pub fn from_status(status: u16, reason: &str, body: Value) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            _ => match structured_error(&body) {
                Some(message) => Self::Server { status, message },
                None => Self::Http { status, reason: reason.to_owned(), body },
            },
        }
    }

    /// HTTP status, when the failure came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Forbidden => Some(403),
            Self::Server { status, .. } | Self::Http { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }

    /// The backend's `detail` text on a generic failure (FastAPI validation
    /// and `HTTPException` bodies), if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Http { body, .. } => body.get("detail").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Inline text for a page: the normalized status message when the
    /// backend answered, `fallback` when it never did or sent garbage.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Transport(_) | Self::Decode(_) => fallback.to_owned(),
            _ => self.to_string(),
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

fn structured_error(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
