//! Shared frame model and JSON codec for the realtime game chat channel.
//!
//! This crate owns the wire representation spoken between the client and the
//! chat server. Frames are small JSON text messages. Field names follow the
//! backend (`snake_case`).
//!
//! PROTOCOL
//! ========
//! 1. Client opens the socket and sends one [`AuthFrame`] (untagged).
//! 2. Client sends [`ClientFrame::Chat`] for each live message.
//! 3. Server pushes [`ServerFrame`]s tagged by `type`.
//!
//! The server never acknowledges authentication in a way the client waits
//! for; a `connected` frame may arrive and is tolerated.

use serde::{Deserialize, Serialize};

/// Numeric game identifier used by the backend.
pub type GameId = i64;
/// Numeric user identifier used by the backend.
pub type UserId = i64;

/// Error returned by [`decode_server_frame`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text is not a JSON object with a recognizable `type`.
    #[error("failed to decode server frame: {0}")]
    Decode(#[from] serde_json::Error),
}

/// First frame sent on a freshly opened channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthFrame {
    pub game_id: GameId,
    pub user_id: UserId,
    pub token: String,
}

/// Tagged frames sent by the client after authentication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// A chat line for every participant of the game.
    Chat {
        game_id: GameId,
        user_id: UserId,
        message: String,
    },
}

/// Frames pushed by the chat server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A chat line broadcast to the game, including the sender's own lines.
    Chat {
        user_id: UserId,
        #[serde(default)]
        username: Option<String>,
        message: String,
        #[serde(default)]
        timestamp: Option<String>,
    },
    /// Another participant connected to the game channel.
    UserJoined {
        #[serde(default)]
        user_id: Option<UserId>,
    },
    /// A participant disconnected from the game channel.
    UserLeft {
        #[serde(default)]
        user_id: Option<UserId>,
    },
    /// Registration notice sent after the auth frame was accepted.
    Connected {
        #[serde(default)]
        game_id: Option<GameId>,
        #[serde(default)]
        user_id: Option<UserId>,
    },
    /// Someone is typing; not rendered.
    Typing {
        #[serde(default)]
        user_id: Option<UserId>,
    },
    /// Server-side rejection, e.g. a malformed auth frame.
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    /// Any `type` this client does not know about.
    #[serde(other)]
    Unknown,
}

/// Encode the auth frame as JSON text.
#[must_use]
pub fn encode_auth(frame: &AuthFrame) -> String {
    serde_json::to_string(frame).unwrap_or_default()
}

/// Encode a tagged client frame as JSON text.
#[must_use]
pub fn encode_client_frame(frame: &ClientFrame) -> String {
    serde_json::to_string(frame).unwrap_or_default()
}

/// Decode one server frame from JSON text.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed JSON, a missing `type`, or a
/// known `type` whose required fields are absent.
pub fn decode_server_frame(text: &str) -> Result<ServerFrame, CodecError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
