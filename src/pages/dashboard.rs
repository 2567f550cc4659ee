//! Dashboard home: summary statistics, scan trend and the contact form.

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod dashboard_test;

use crate::net::api::ApiClient;
use crate::net::types::{ContactForm, DashboardStats};
use crate::state::auth::SessionStore;
use crate::state::request::RequestState;

pub const FETCH_FAILED: &str = "Failed to fetch dashboard data";
pub const CONTACT_LOGIN_REQUIRED: &str = "You must be logged in to send a message.";
pub const CONTACT_FIELDS_REQUIRED: &str = "Please fill in all fields.";
pub const CONTACT_SENT: &str = "Message sent successfully!";
pub const CONTACT_FAILED: &str = "Failed to send message. Try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Review {
    pub name: &'static str,
    pub feedback: &'static str,
}

pub const REVIEWS: [Review; 3] = [
    Review { name: "Alice", feedback: "JOU CloudSec keeps our AWS environment secure!" },
    Review { name: "Bob", feedback: "Great dashboard, easy to understand security trends." },
    Review { name: "Charlie", feedback: "Very useful for monitoring our cloud posture." },
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardPage {
    /// Zeros until the first successful load.
    pub stats: DashboardStats,
    pub load: RequestState,
    pub contact: ContactForm,
    pub contact_request: RequestState,
}

/// Every contact field must be non-blank.
///
/// # Errors
///
/// Returns the inline message naming the problem.
pub fn validate_contact(form: &ContactForm) -> Result<(), &'static str> {
    let fields = [&form.name, &form.email, &form.subject, &form.message];
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(CONTACT_FIELDS_REQUIRED);
    }
    Ok(())
}

impl DashboardPage {
    /// Fetch stats. Skipped entirely without a session.
    pub async fn load(&mut self, api: &ApiClient, session: &SessionStore) {
        let Some(token) = session.access_token() else {
            return;
        };
        self.load.begin();
        let outcome = match api.dashboard_stats(&token).await {
            Ok(stats) if stats.is_ok() => {
                self.stats = stats;
                Ok(None)
            }
            Ok(_) => Err(FETCH_FAILED.to_owned()),
            Err(e) => {
                tracing::warn!(error = %e, "error fetching dashboard data");
                Err(FETCH_FAILED.to_owned())
            }
        };
        self.load.finish(outcome);
    }

    /// Send the contact form; the form is cleared on success.
    pub async fn send_contact(&mut self, api: &ApiClient, session: &SessionStore) {
        let Some(token) = session.access_token() else {
            self.contact_request.reject(CONTACT_LOGIN_REQUIRED);
            return;
        };
        if let Err(message) = validate_contact(&self.contact) {
            self.contact_request.reject(message);
            return;
        }

        self.contact_request.begin();
        let outcome = match api.send_contact(&token, &self.contact).await {
            Ok(_) => {
                self.contact = ContactForm::default();
                Ok(Some(CONTACT_SENT.to_owned()))
            }
            Err(e) => {
                tracing::warn!(error = %e, "contact form failed");
                Err(e.detail().unwrap_or(CONTACT_FAILED).to_owned())
            }
        };
        self.contact_request.finish(outcome);
    }
}
