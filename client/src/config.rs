//! Client endpoint configuration.
//!
//! The REST surface lives under `api_base`; the chat server listens on its
//! own port on the page's host unless an explicit URL is configured.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

pub const DEFAULT_API_BASE: &str = "/api";
pub const DEFAULT_CHAT_PORT: u16 = 8765;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Prefix for every REST path, without a trailing slash.
    pub api_base: String,
    /// Full chat websocket URL. Derived from the page origin when absent.
    pub chat_url: Option<String>,
    /// Port used when deriving the chat URL.
    pub chat_port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_owned(),
            chat_url: None,
            chat_port: DEFAULT_CHAT_PORT,
        }
    }
}

impl ClientConfig {
    /// Config rooted at an absolute server origin, e.g. `http://localhost:5000`.
    pub fn for_origin(origin: &str) -> Self {
        Self {
            api_base: format!("{}{DEFAULT_API_BASE}", origin.trim_end_matches('/')),
            ..Self::default()
        }
    }

    /// Join a REST path onto `api_base`.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// Resolve the chat websocket URL for a page served from `origin`.
    pub fn chat_endpoint(&self, origin: &str) -> String {
        if let Some(url) = &self.chat_url {
            return url.clone();
        }
        derive_chat_url(origin, self.chat_port)
    }
}

/// `ws[s]://{hostname}:{port}` for the host in `origin`.
///
/// Any port or path in `origin` is dropped; the chat server has its own port.
pub fn derive_chat_url(origin: &str, port: u16) -> String {
    let (scheme, rest) = if let Some(rest) = origin.strip_prefix("https://") {
        ("wss", rest)
    } else if let Some(rest) = origin.strip_prefix("http://") {
        ("ws", rest)
    } else {
        ("ws", origin)
    };
    let authority = rest.split('/').next().unwrap_or_default();
    let host = authority_host(authority);
    let host = if host.is_empty() { "localhost" } else { host };
    format!("{scheme}://{host}:{port}")
}

fn authority_host(authority: &str) -> &str {
    // Bracketed IPv6 literal keeps its colons.
    if authority.starts_with('[') {
        return authority.find(']').map_or(authority, |end| &authority[..=end]);
    }
    authority.split(':').next().unwrap_or_default()
}
