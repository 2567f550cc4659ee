//! CSPM scan page: run a posture scan and browse EC2, S3 and IAM results.

#[cfg(test)]
#[path = "cspm_test.rs"]
mod cspm_test;

use serde_json::Value;
use time::OffsetDateTime;

use crate::net::api::ApiClient;
use crate::net::types::CspmReport;
use crate::state::auth::SessionStore;
use crate::state::request::RequestState;
use crate::util::export::{self, Download, ExportError};

pub const LOGIN_REQUIRED: &str = "You must be logged in to perform a scan";
pub const SCAN_FAILED: &str = "Scan failed";
pub const SCAN_ERROR: &str = "Failed to perform scan. Please try again.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CspmPage {
    /// Scan through the user's stored AWS role instead of the backend's own
    /// credentials.
    pub multi_tenant: bool,
    /// Raw results of the last successful scan, kept for export.
    pub results: Option<Value>,
    pub report: Option<CspmReport>,
    pub request: RequestState,
}

impl CspmPage {
    pub async fn scan(&mut self, api: &ApiClient, session: &SessionStore) {
        let Some(token) = session.access_token() else {
            self.request.reject(LOGIN_REQUIRED);
            return;
        };

        self.request.begin();
        self.results = None;
        self.report = None;

        let response = if self.multi_tenant {
            api.scan_cspm_multi(&token).await
        } else {
            api.scan_cspm(&token).await
        };
        let outcome = match response {
            Ok(resp) if resp.is_ok() => {
                let results = resp.results.unwrap_or(Value::Null);
                self.report = Some(CspmReport::from_results(&results));
                self.results = Some(results);
                Ok(None)
            }
            Ok(resp) => Err(resp.error.unwrap_or_else(|| SCAN_FAILED.to_owned())),
            Err(e) => {
                tracing::warn!(error = %e, multi_tenant = self.multi_tenant, "CSPM scan failed");
                Err(e.user_message(SCAN_ERROR))
            }
        };
        self.request.finish(outcome);
    }

    /// Results as a pretty JSON download; `None` before a successful scan.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Serialize`] if the results cannot be serialized.
    pub fn export_json(&self, now: OffsetDateTime) -> Result<Option<Download>, ExportError> {
        self.results
            .as_ref()
            .map(|results| export::cspm_json(results, now))
            .transpose()
    }
}
