//! REST client for the scanning backend.
//!
//! One method per endpoint. Each takes the caller's bearer token, issues a
//! single request and returns the decoded payload; there are no retries and
//! no caching, so re-fetching is entirely up to the page that owns the data.
//!
//! ERROR HANDLING
//! ==============
//! `normalize_response` is the only place status codes are inspected. It is a
//! pure function over (status, content-type, body text) so the mapping can be
//! tested without a server.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ApiError;
use super::types::{
    AwsAccountRequest, AwsAccountResponse, ContactForm, DashboardStats, HistoryResponse, ScanResponse, StatusResponse,
    ViolationsResponse,
};

const JSON_CONTENT_TYPE: &str = "application/json";

pub const DASHBOARD_STATS_PATH: &str = "/dashboard/stats";
pub const SCAN_CSPM_PATH: &str = "/scan/cspm";
pub const SCAN_CSPM_MULTI_PATH: &str = "/scan/cspm-multi";
pub const SCAN_CWPP_PATH: &str = "/scan/cwpp";
pub const HISTORY_PATH: &str = "/results/history";
pub const HISTORY_MULTI_PATH: &str = "/results/history-multi";
pub const AWS_ACCOUNT_PATH: &str = "/aws-account";
pub const POLICY_VIOLATIONS_PATH: &str = "/policy/violations";
pub const CONTACT_PATH: &str = "/contact";

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    #[must_use]
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_owned() }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -------------------------------------------------------------------------
    // Dashboard
    // -------------------------------------------------------------------------

    /// `GET /dashboard/stats`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for transport failures, non-2xx responses or
    /// bodies that are not a JSON object.
    pub async fn dashboard_stats(&self, token: &str) -> Result<DashboardStats, ApiError> {
        self.fetch(Method::GET, DASHBOARD_STATS_PATH, token, None, None::<&()>)
            .await
    }

    // -------------------------------------------------------------------------
    // Scans
    // -------------------------------------------------------------------------

    /// `GET /scan/cspm`: posture scan with the backend's own credentials.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::dashboard_stats`].
    pub async fn scan_cspm(&self, token: &str) -> Result<ScanResponse, ApiError> {
        self.fetch(Method::GET, SCAN_CSPM_PATH, token, None, None::<&()>)
            .await
    }

    /// `GET /scan/cspm-multi`: posture scan through the user's stored role.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::dashboard_stats`].
    pub async fn scan_cspm_multi(&self, token: &str) -> Result<ScanResponse, ApiError> {
        self.fetch(Method::GET, SCAN_CSPM_MULTI_PATH, token, None, None::<&()>)
            .await
    }

    /// `GET /scan/cwpp`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::dashboard_stats`].
    pub async fn scan_cwpp(&self, token: &str) -> Result<ScanResponse, ApiError> {
        self.fetch(Method::GET, SCAN_CWPP_PATH, token, None, None::<&()>)
            .await
    }

    // -------------------------------------------------------------------------
    // History
    // -------------------------------------------------------------------------

    /// `GET /results/history[?scan_type=]`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::dashboard_stats`].
    pub async fn scan_history(&self, token: &str, scan_type: Option<&str>) -> Result<HistoryResponse, ApiError> {
        self.fetch(Method::GET, HISTORY_PATH, token, scan_type_query(scan_type), None::<&()>)
            .await
    }

    /// `GET /results/history-multi[?scan_type=]`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::dashboard_stats`].
    pub async fn user_scan_history(&self, token: &str, scan_type: Option<&str>) -> Result<HistoryResponse, ApiError> {
        self.fetch(Method::GET, HISTORY_MULTI_PATH, token, scan_type_query(scan_type), None::<&()>)
            .await
    }

    // -------------------------------------------------------------------------
    // AWS account
    // -------------------------------------------------------------------------

    /// `POST /aws-account` with exactly `{account_id, role_arn}`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::dashboard_stats`].
    pub async fn store_aws_account(
        &self,
        token: &str,
        account_id: &str,
        role_arn: &str,
    ) -> Result<StatusResponse, ApiError> {
        let body = AwsAccountRequest { account_id, role_arn };
        self.fetch(Method::POST, AWS_ACCOUNT_PATH, token, None, Some(&body))
            .await
    }

    /// `GET /aws-account`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::dashboard_stats`].
    pub async fn get_aws_account(&self, token: &str) -> Result<AwsAccountResponse, ApiError> {
        self.fetch(Method::GET, AWS_ACCOUNT_PATH, token, None, None::<&()>)
            .await
    }

    // -------------------------------------------------------------------------
    // Policy / contact
    // -------------------------------------------------------------------------

    /// `GET /policy/violations`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::dashboard_stats`].
    pub async fn policy_violations(&self, token: &str) -> Result<ViolationsResponse, ApiError> {
        self.fetch(Method::GET, POLICY_VIOLATIONS_PATH, token, None, None::<&()>)
            .await
    }

    /// `POST /contact`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::dashboard_stats`].
    pub async fn send_contact(&self, token: &str, form: &ContactForm) -> Result<StatusResponse, ApiError> {
        self.fetch(Method::POST, CONTACT_PATH, token, None, Some(form))
            .await
    }

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------

    async fn fetch<T, B>(
        &self,
        method: Method,
        path: &str,
        token: &str,
        query: Option<(&str, &str)>,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let value = self.request(method, path, token, query, body).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(format!("{path}: {e}")))
    }

    /// Issue one authenticated request and normalize the response.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for transport failures and non-2xx responses.
    pub async fn request<B>(
        &self,
        method: Method,
        path: &str,
        token: &str,
        query: Option<(&str, &str)>,
        body: Option<&B>,
    ) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%method, %path, "api request");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        if let Some(pair) = query {
            request = request.query(&[pair]);
        }
        if let Some(json) = body {
            request = request.json(json);
        }

        let response = request.send().await.map_err(|e| {
            tracing::debug!(%method, %path, error = %e, "api transport failure");
            ApiError::from(e)
        })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);
        let text = response.text().await?;

        normalize_response(status.as_u16(), status.canonical_reason().unwrap_or_default(), content_type.as_deref(), text)
            .inspect_err(|e| tracing::debug!(%method, %path, status = status.as_u16(), error = %e, "api call failed"))
    }
}

fn scan_type_query(scan_type: Option<&str>) -> Option<(&'static str, &str)> {
    scan_type
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| ("scan_type", t))
}

// =============================================================================
// RESPONSE NORMALIZATION
// =============================================================================

/// Parse a response body and map failures.
///
/// JSON is parsed when the content type offers it, anything else passes
/// through as a JSON string. A 2xx body that claims JSON but does not parse is
/// a decode error; for error statuses the raw text is kept instead so the
/// status mapping still applies.
///
/// # Errors
///
/// Returns the [`ApiError`] for any non-2xx status or undecodable 2xx body.
pub fn normalize_response(status: u16, reason: &str, content_type: Option<&str>, text: String) -> Result<Value, ApiError> {
    let success = (200..300).contains(&status);
    let is_json = content_type.is_some_and(|ct| ct.contains(JSON_CONTENT_TYPE));

    let body = if is_json {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => value,
            Err(e) if success => return Err(ApiError::Decode(e.to_string())),
            Err(_) => Value::String(text),
        }
    } else {
        Value::String(text)
    };

    if success { Ok(body) } else { Err(ApiError::from_status(status, reason, body)) }
}
