//! Page navigation.
//!
//! ARCHITECTURE
//! ============
//! - `page`: page identity, tag resolution, and per-visit scopes.
//! - `controller`: the navigation state machine and the page controller seam.

pub mod controller;
pub mod page;

pub use controller::{NavigationController, PageContext, PageController, PageError};
pub use page::{PageId, PageScope};
