//! # client
//!
//! Core of the pickleball scheduling client: page navigation and the realtime
//! game chat session it owns.
//!
//! SYSTEM CONTEXT
//! ==============
//! `nav` decides which page is current and tears down the chat session before
//! any new page is constructed. `chat` owns the single realtime channel, the
//! transcript, and optimistic sends with a REST fallback. `net` defines the
//! transport seams (`ChatGateway`, `ChannelConnector`) that frontends
//! implement; browser implementations live behind the `hydrate` feature.
//! `app` ties these together around an explicit `AppState`.

pub mod app;
pub mod chat;
pub mod config;
pub mod nav;
pub mod net;
pub mod pages;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

/// Install browser logging: `tracing` events are bridged to `log` and printed
/// to the devtools console; panics are reported there too.
#[cfg(feature = "hydrate")]
pub fn init_browser_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Debug);
}
