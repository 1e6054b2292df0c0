//! Realtime game chat.
//!
//! ARCHITECTURE
//! ============
//! - `session`: the single-session state machine and transcript owner.
//! - `composer`: optimistic sends and the REST fallback path.
//! - `render`: turns session updates into transcript render operations.

pub mod composer;
pub mod render;
pub mod session;

pub use composer::{PendingPost, SendOutcome, send_message};
pub use session::{ChatSessionManager, ChatUpdate, OpenOutcome, pump_channel_events};
