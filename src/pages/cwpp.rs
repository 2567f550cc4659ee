//! CWPP scan page: run a workload scan and list its findings.

#[cfg(test)]
#[path = "cwpp_test.rs"]
mod cwpp_test;

use serde_json::Value;
use time::OffsetDateTime;

use crate::net::api::ApiClient;
use crate::net::types::CwppReport;
use crate::state::auth::SessionStore;
use crate::state::request::RequestState;
use crate::util::export::{self, Download};

pub const NO_TOKEN: &str = "No auth token found";
pub const INVALID_RESULTS: &str = "Invalid scan results";
pub const FETCH_FAILED: &str = "Failed to fetch CWPP scan results";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CwppPage {
    pub results: Option<Value>,
    pub report: Option<CwppReport>,
    pub request: RequestState,
}

impl CwppPage {
    /// Previous results are cleared as soon as a scan starts.
    pub async fn scan(&mut self, api: &ApiClient, session: &SessionStore) {
        self.request.begin();
        self.results = None;
        self.report = None;

        let outcome = match session.access_token() {
            None => Err(NO_TOKEN.to_owned()),
            Some(token) => match api.scan_cwpp(&token).await {
                Ok(resp) => match resp.results {
                    Some(results) if resp.status.as_deref() == Some("ok") => {
                        self.report = Some(CwppReport::from_results(&results));
                        self.results = Some(results);
                        Ok(None)
                    }
                    _ => Err(INVALID_RESULTS.to_owned()),
                },
                Err(e) => {
                    tracing::warn!(error = %e, "CWPP scan failed");
                    Err(e.user_message(FETCH_FAILED))
                }
            },
        };
        self.request.finish(outcome);
    }

    /// Findings as `Type,Message,Severity` CSV; `None` before a successful
    /// scan.
    #[must_use]
    pub fn export_csv(&self, now: OffsetDateTime) -> Option<Download> {
        self.report
            .as_ref()
            .map(|report| export::cwpp_csv(&report.findings, now))
    }
}
