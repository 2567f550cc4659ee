//! Scan history page.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use serde_json::Value;

use crate::net::api::ApiClient;
use crate::net::types::HistoryEntry;
use crate::state::auth::SessionStore;
use crate::state::request::RequestState;
use crate::util::export::{self, Download, ExportError};

pub const LOAD_FAILED: &str = "Failed to fetch scan history";
pub const EMPTY: &str = "No scan history available.";

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    /// Read the per-user history (`history-multi`) rather than the global one.
    pub multi_tenant: bool,
    pub scan_type: Option<String>,
    /// Raw rows as returned, kept for JSON export.
    pub rows: Vec<Value>,
    pub entries: Vec<HistoryEntry>,
    pub request: RequestState,
}

impl Default for HistoryPage {
    fn default() -> Self {
        Self {
            multi_tenant: true,
            scan_type: None,
            rows: Vec::new(),
            entries: Vec::new(),
            request: RequestState::default(),
        }
    }
}

impl HistoryPage {
    pub async fn load(&mut self, api: &ApiClient, session: &SessionStore) {
        let Some(token) = session.access_token() else {
            return;
        };

        self.request.begin();
        let scan_type = self.scan_type.as_deref();
        let response = if self.multi_tenant {
            api.user_scan_history(&token, scan_type).await
        } else {
            api.scan_history(&token, scan_type).await
        };

        let outcome = match response {
            Ok(resp) => {
                let rows = resp.into_entries().unwrap_or_else(|| {
                    tracing::warn!("unexpected scan history response; showing none");
                    Vec::new()
                });
                self.entries = rows.iter().map(HistoryEntry::from_value).collect();
                self.rows = rows;
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch scan history");
                Err(e.user_message(LOAD_FAILED))
            }
        };
        self.request.finish(outcome);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw rows as `scan_history.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Serialize`] if the rows cannot be serialized.
    pub fn export_json(&self) -> Result<Download, ExportError> {
        export::history_json(&self.rows)
    }

    /// Entries as `scan_history.csv`; `None` when there is nothing to export.
    #[must_use]
    pub fn export_csv(&self) -> Option<Download> {
        (!self.is_empty()).then(|| export::history_csv_download(&self.entries))
    }
}
