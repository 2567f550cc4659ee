//! Dashboard chrome: header and sidebar.
//!
//! SYSTEM CONTEXT
//! ==============
//! Both carry a user menu whose actions resolve to a route, so the front end
//! only has to navigate to whatever comes back.

pub mod header;
pub mod sidebar;
