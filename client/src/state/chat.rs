//! Game chat state: connection lifecycle and the ordered transcript.
//!
//! SYSTEM CONTEXT
//! ==============
//! This model is owned by `chat::session::ChatSessionManager`. Renderers only
//! ever see copies of it through `ChatUpdate`s.

#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;

use frames::{GameId, UserId};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Realtime channel lifecycle.
///
/// `Connecting` is only ever entered by an explicit `open`; there is no
/// automatic reconnect from `Closed` or `Failed`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No channel has been requested yet.
    #[default]
    Idle,
    /// Channel requested; waiting for it to become ready.
    Connecting,
    /// Channel ready and the auth frame has been sent.
    Open,
    /// Channel closed, locally or by the server.
    Closed,
    /// Channel could not be established or broke.
    Failed,
}

impl ConnectionState {
    /// True while a session handle exists for this state.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }

    /// Text for the connection-status indicator.
    pub fn status_label(self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::Connecting => "Connecting to chat...",
            Self::Open => "Connected to chat",
            Self::Closed => "Disconnected from chat",
            Self::Failed => "Error connecting to chat",
        }
    }

    /// CSS class for the connection-status indicator.
    pub fn status_class(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "connected",
            Self::Closed | Self::Failed => "disconnected",
        }
    }
}

/// Where a transcript message came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageOrigin {
    /// Appended by the local composer before any confirmation.
    LocalOptimistic,
    /// Received as a live `chat` frame.
    ServerConfirmed,
    /// Loaded from the REST history endpoint.
    HistoryLoaded,
}

/// A single chat message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    /// Backend message id; only history entries carry one.
    pub id: Option<i64>,
    pub game_id: GameId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub text: String,
    /// ISO-8601 timestamp.
    pub timestamp: String,
    pub origin: MessageOrigin,
}

/// Presence notice shown inline in the transcript; never a chat message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemNotice {
    pub text: String,
}

impl SystemNotice {
    pub fn user_joined() -> Self {
        Self {
            text: "A user has joined the chat".to_owned(),
        }
    }

    pub fn user_left() -> Self {
        Self {
            text: "A user has left the chat".to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranscriptEntry {
    Message(ChatMessage),
    Notice(SystemNotice),
}

impl TranscriptEntry {
    pub fn as_message(&self) -> Option<&ChatMessage> {
        match self {
            Self::Message(msg) => Some(msg),
            Self::Notice(_) => None,
        }
    }
}

/// Chat state for the game currently bound to the session manager.
#[derive(Clone, Debug, Default)]
pub struct ChatState {
    pub game_id: Option<GameId>,
    pub connection: ConnectionState,
    /// Arrival-ordered entries: history first, then live.
    pub transcript: Vec<TranscriptEntry>,
    /// Most recent inline error (transport failures), cleared on reset.
    pub last_error: Option<String>,
}

impl ChatState {
    /// Chat messages only, in transcript order.
    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.transcript.iter().filter_map(TranscriptEntry::as_message)
    }

    pub fn notices(&self) -> impl Iterator<Item = &SystemNotice> {
        self.transcript.iter().filter_map(|entry| match entry {
            TranscriptEntry::Notice(notice) => Some(notice),
            TranscriptEntry::Message(_) => None,
        })
    }
}

/// Current wall-clock time as RFC 3339, used for local and untimed entries.
pub fn local_timestamp() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}
