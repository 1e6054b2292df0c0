//! Page-level flows shared by every frontend.
//!
//! ARCHITECTURE
//! ============
//! Page controllers own rendering. The logic that decides whether a page may
//! open realtime chat lives here so every frontend enforces the same rules.

pub mod game_details;
