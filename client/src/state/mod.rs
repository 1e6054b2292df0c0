//! Shared client-side state modules.
//!
//! DESIGN
//! ======
//! State is split by domain (`auth`, `chat`) so the navigation and chat layers
//! depend on small focused models instead of ambient globals.

pub mod auth;
pub mod chat;
