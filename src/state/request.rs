//! Per-page request lifecycle: `idle -> submitting -> (succeeded | failed)`.
//!
//! Every page action goes through `begin` and ends in exactly one of
//! `succeed`/`fail`, so the in-flight flag can never stick.

#[cfg(test)]
#[path = "request_test.rs"]
mod request_test;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestState {
    pub phase: Phase,
    /// Inline error shown after a failure.
    pub error: Option<String>,
    /// Inline confirmation shown after a success.
    pub notice: Option<String>,
}

impl RequestState {
    /// Enter `Submitting`, clearing any previous message.
    pub fn begin(&mut self) {
        self.phase = Phase::Submitting;
        self.error = None;
        self.notice = None;
    }

    pub fn succeed(&mut self, notice: Option<String>) {
        self.phase = Phase::Succeeded;
        self.error = None;
        self.notice = notice;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.phase = Phase::Failed;
        self.error = Some(message.into());
        self.notice = None;
    }

    /// Fail without ever having been in flight (validation, missing token).
    pub fn reject(&mut self, message: impl Into<String>) {
        self.fail(message);
    }

    /// Apply a finished action: `Ok` carries the optional notice.
    pub fn finish(&mut self, outcome: Result<Option<String>, String>) {
        match outcome {
            Ok(notice) => self.succeed(notice),
            Err(message) => self.fail(message),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.phase == Phase::Submitting
    }
}
