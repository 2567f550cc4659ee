//! Route table for the dashboard shell.
//!
//! SYSTEM CONTEXT
//! ==============
//! Everything under `/dashboard` requires a live session; the auth routes are
//! public. The navigation gate in `util::auth` consults this table.

#[cfg(test)]
#[path = "routes_test.rs"]
mod routes_test;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    ResetPassword,
    Dashboard,
    Cspm,
    Cwpp,
    History,
    AwsAccount,
    Profile,
    Settings,
}

impl Route {
    pub const ALL: [Route; 9] = [
        Route::Login,
        Route::ResetPassword,
        Route::Dashboard,
        Route::Cspm,
        Route::Cwpp,
        Route::History,
        Route::AwsAccount,
        Route::Profile,
        Route::Settings,
    ];

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/auth/login",
            Route::ResetPassword => "/auth/reset",
            Route::Dashboard => "/dashboard",
            Route::Cspm => "/dashboard/cspm",
            Route::Cwpp => "/dashboard/cwpp",
            Route::History => "/dashboard/history",
            Route::AwsAccount => "/dashboard/aws-account",
            Route::Profile => "/dashboard/profile",
            Route::Settings => "/dashboard/settings",
        }
    }

    /// Resolve a request path, ignoring a query string and trailing slash.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };
        Route::ALL.into_iter().find(|route| route.path() == path)
    }

    /// Protected routes render only inside a live session.
    #[must_use]
    pub fn is_protected(self) -> bool {
        !matches!(self, Route::Login | Route::ResetPassword)
    }
}
