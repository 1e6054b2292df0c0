//! Networking seams for HTTP + the realtime chat channel.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` defines the request/response gateway, `channel` defines the realtime
//! connector/channel pair, and `types` defines the REST wire schema. Browser
//! implementations (`gloo-net`) are compiled with the `hydrate` feature;
//! other frontends bring their own.

pub mod api;
#[cfg(feature = "hydrate")]
pub mod browser;
pub mod channel;
pub mod types;
