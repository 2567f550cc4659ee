//! AWS account page: the cross-account role the backend scans through.

#[cfg(test)]
#[path = "aws_account_test.rs"]
mod aws_account_test;

use crate::net::api::ApiClient;
use crate::net::types::AwsAccount;
use crate::state::auth::SessionStore;
use crate::state::request::RequestState;

pub const LOGIN_REQUIRED: &str = "Please log in again to save AWS account information.";
pub const FIELDS_REQUIRED: &str = "Both Account ID and Role ARN are required.";
pub const SAVED: &str = "AWS account information saved successfully!";
pub const SAVE_FAILED: &str = "Failed to save AWS account information";
pub const SAVE_FAILED_RETRY: &str = "Failed to save AWS account information. Please try again.";
pub const FETCH_FAILED: &str = "Failed to fetch AWS account info";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AwsAccountPage {
    pub account_id: String,
    pub role_arn: String,
    /// Last record fetched from the backend, including its validation result.
    pub existing: Option<AwsAccount>,
    pub fetching: bool,
    pub show_instructions: bool,
    pub request: RequestState,
}

/// Trimmed account id and role ARN, both required.
///
/// # Errors
///
/// Returns the inline message when either field is blank.
pub fn validate_account_input(account_id: &str, role_arn: &str) -> Result<(String, String), &'static str> {
    let account_id = account_id.trim();
    let role_arn = role_arn.trim();
    if account_id.is_empty() || role_arn.is_empty() {
        return Err(FIELDS_REQUIRED);
    }
    Ok((account_id.to_owned(), role_arn.to_owned()))
}

impl AwsAccountPage {
    /// Fetch the stored record and prefill the form. Without a token there is
    /// nothing to fetch.
    pub async fn load(&mut self, api: &ApiClient, session: &SessionStore) {
        let Some(token) = session.access_token() else {
            self.fetching = false;
            return;
        };
        self.fetching = true;
        match api.get_aws_account(&token).await {
            Ok(resp) => {
                if resp.is_ok() {
                    if let Some(data) = resp.data {
                        self.account_id = data.account_id.clone().unwrap_or_default();
                        self.role_arn = data.role_arn.clone().unwrap_or_default();
                        self.existing = Some(data);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch AWS account");
                self.request.fail(e.user_message(FETCH_FAILED));
            }
        }
        self.fetching = false;
    }

    /// Whether the save button should be enabled.
    #[must_use]
    pub fn can_submit(&self, session: &SessionStore) -> bool {
        !self.request.is_busy()
            && session.access_token().is_some()
            && !self.account_id.is_empty()
            && !self.role_arn.is_empty()
    }

    pub async fn submit(&mut self, api: &ApiClient, session: &SessionStore) {
        let Some(token) = session.access_token() else {
            self.request.reject(LOGIN_REQUIRED);
            return;
        };
        let (account_id, role_arn) = match validate_account_input(&self.account_id, &self.role_arn) {
            Ok(fields) => fields,
            Err(message) => {
                self.request.reject(message);
                return;
            }
        };

        self.request.begin();
        let outcome = match api.store_aws_account(&token, &account_id, &role_arn).await {
            Ok(resp) if resp.is_ok() => {
                tracing::info!(%account_id, "AWS account saved");
                Ok(Some(SAVED.to_owned()))
            }
            Ok(resp) => Err(resp.error.unwrap_or_else(|| SAVE_FAILED.to_owned())),
            Err(e) => {
                tracing::warn!(error = %e, "failed to save AWS account");
                Err(e.user_message(SAVE_FAILED_RETRY))
            }
        };
        self.request.finish(outcome);
    }

    pub fn clear_form(&mut self) {
        self.account_id.clear();
        self.role_arn.clear();
        self.request.reset();
    }

    pub fn toggle_instructions(&mut self) {
        self.show_instructions = !self.show_instructions;
    }
}
