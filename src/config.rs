//! Console configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is unset or blank.
    #[error("missing required setting: env var {var} not set")]
    Missing { var: &'static str },

    /// A URL setting does not use an http(s) scheme.
    #[error("invalid URL for {var}: {value}")]
    InvalidUrl { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub api_base_url: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub reset_redirect_url: Option<String>,
    pub session_file: Option<PathBuf>,
}

impl ConsoleConfig {
    /// Build typed console config from environment variables.
    ///
    /// Required:
    /// - `SUPABASE_URL`
    /// - `SUPABASE_ANON_KEY`
    ///
    /// Optional:
    /// - `CLOUDSEC_API_BASE_URL`: default `http://localhost:8000`
    /// - `CLOUDSEC_RESET_REDIRECT_URL`: link target inside password-reset mails
    /// - `CLOUDSEC_SESSION_FILE`: where a persisted session is kept
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a required value is missing or a URL is
    /// not http(s).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_non_empty)
    }

    /// Same rules as [`ConsoleConfig::from_env`], reading each variable
    /// through `lookup`. Front ends layer their own overrides (flags, files)
    /// in front of the environment this way.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a required value is missing or a URL is
    /// not http(s).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let api_base_url = get("CLOUDSEC_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        let supabase_url = get("SUPABASE_URL").ok_or(ConfigError::Missing { var: "SUPABASE_URL" })?;
        let supabase_anon_key =
            get("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing { var: "SUPABASE_ANON_KEY" })?;

        Ok(Self {
            api_base_url: normalize_url("CLOUDSEC_API_BASE_URL", &api_base_url)?,
            supabase_url: normalize_url("SUPABASE_URL", &supabase_url)?,
            supabase_anon_key,
            reset_redirect_url: get("CLOUDSEC_RESET_REDIRECT_URL"),
            session_file: get("CLOUDSEC_SESSION_FILE").map(PathBuf::from),
        })
    }

    /// Configured session file, else [`default_session_file`].
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.session_file.clone().unwrap_or_else(default_session_file)
    }
}

/// `<config dir>/cloudsec/session.json` for the current user, falling back to
/// the home directory when the platform has no config directory.
#[must_use]
pub fn default_session_file() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("cloudsec"))
        .or_else(|| dirs::home_dir().map(|home| home.join(".cloudsec")))
        .unwrap_or_else(|| PathBuf::from(".cloudsec"))
        .join("session.json")
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Trim trailing slashes and require an http(s) scheme.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidUrl`] for any other scheme.
pub fn normalize_url(var: &'static str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_owned())
    } else {
        Err(ConfigError::InvalidUrl { var, value: raw.to_owned() })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
