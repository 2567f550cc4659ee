//! Sidebar navigation.

#[cfg(test)]
#[path = "sidebar_test.rs"]
mod sidebar_test;

use super::header::MenuAction;
use crate::routes::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub route: Route,
    pub icon: &'static str,
}

pub static NAV_ITEMS: [NavItem; 6] = [
    NavItem { label: "Dashboard", route: Route::Dashboard, icon: "\u{1f4ca}" },
    NavItem { label: "CSPM Scan", route: Route::Cspm, icon: "\u{1f512}" },
    NavItem { label: "CWPP Scan", route: Route::Cwpp, icon: "\u{1f6e1}\u{fe0f}" },
    NavItem { label: "Scan History", route: Route::History, icon: "\u{1f4dc}" },
    NavItem { label: "AWS Account", route: Route::AwsAccount, icon: "\u{2601}\u{fe0f}" },
    NavItem { label: "Settings", route: Route::Settings, icon: "\u{2699}\u{fe0f}" },
];

/// The sidebar's own user menu is shorter than the header's.
pub const SIDEBAR_MENU: [MenuAction; 2] = [MenuAction::Profile, MenuAction::SignOut];

impl NavItem {
    /// Exact match on the current path; `/dashboard` is not active on
    /// `/dashboard/cspm`.
    #[must_use]
    pub fn is_active(&self, current_path: &str) -> bool {
        Route::from_path(current_path) == Some(self.route)
    }
}

#[must_use]
pub fn active_item(current_path: &str) -> Option<&'static NavItem> {
    NAV_ITEMS.iter().find(|item| item.is_active(current_path))
}

/// Mobile drawer state. Following a link closes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SidebarState {
    pub open: bool,
}

impl SidebarState {
    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    /// Close the drawer and return the route to navigate to.
    pub fn follow(&mut self, item: &NavItem) -> Route {
        self.open = false;
        item.route
    }
}
