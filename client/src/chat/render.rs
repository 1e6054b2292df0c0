//! Transcript renderer: `ChatUpdate` in, display operations out.
//!
//! The renderer holds no session state. It only knows who is viewing, so it
//! can tell sent messages from received ones.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use frames::UserId;

use super::session::ChatUpdate;
use crate::state::chat::TranscriptEntry;

pub const EMPTY_TRANSCRIPT_TEXT: &str = "No messages yet. Be the first to say hello!";
pub const UNKNOWN_USER: &str = "Unknown User";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// Written by the viewer.
    Sent,
    Received,
    /// Presence or error notice.
    System,
}

impl EntryKind {
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Sent => "message sent",
            Self::Received => "message received",
            Self::System => "system-message",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedEntry {
    pub kind: EntryKind,
    /// Display name; empty for system entries.
    pub author: String,
    pub body: String,
    /// `HH:MM:SS`, empty for system entries.
    pub time: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderOp {
    /// Redraw the whole transcript. `placeholder` is set when it is empty.
    Replace {
        entries: Vec<RenderedEntry>,
        placeholder: Option<&'static str>,
    },
    /// Add one entry at the bottom.
    Append(RenderedEntry),
    /// Update the connection indicator.
    Status { label: &'static str, class: &'static str },
    /// Show an inline error in the chat region.
    Error(String),
}

impl RenderOp {
    /// Whether the view should scroll to the newest entry after applying.
    pub fn scroll_to_newest(&self) -> bool {
        matches!(self, Self::Replace { .. } | Self::Append(_))
    }
}

#[derive(Clone, Debug, Default)]
pub struct TranscriptRenderer {
    viewer: Option<UserId>,
}

impl TranscriptRenderer {
    pub fn new(viewer: Option<UserId>) -> Self {
        Self { viewer }
    }

    pub fn apply(&self, update: &ChatUpdate) -> RenderOp {
        match update {
            ChatUpdate::Connection(state) => RenderOp::Status {
                label: state.status_label(),
                class: state.status_class(),
            },
            ChatUpdate::Reset(entries) => RenderOp::Replace {
                placeholder: entries.is_empty().then_some(EMPTY_TRANSCRIPT_TEXT),
                entries: entries.iter().map(|e| self.render_entry(e)).collect(),
            },
            ChatUpdate::Appended(entry) => RenderOp::Append(self.render_entry(entry)),
            ChatUpdate::Error(message) => RenderOp::Error(message.clone()),
        }
    }

    pub fn render_entry(&self, entry: &TranscriptEntry) -> RenderedEntry {
        match entry {
            TranscriptEntry::Message(msg) => RenderedEntry {
                kind: if self.viewer == Some(msg.user_id) {
                    EntryKind::Sent
                } else {
                    EntryKind::Received
                },
                author: msg
                    .username
                    .as_deref()
                    .filter(|name| !name.is_empty())
                    .unwrap_or(UNKNOWN_USER)
                    .to_owned(),
                body: msg.text.clone(),
                time: clock_time(&msg.timestamp),
            },
            TranscriptEntry::Notice(notice) => RenderedEntry {
                kind: EntryKind::System,
                author: String::new(),
                body: notice.text.clone(),
                time: String::new(),
            },
        }
    }
}

/// `HH:MM:SS` from an ISO-8601 timestamp; the input unchanged when it has no
/// recognizable time part.
pub fn clock_time(timestamp: &str) -> String {
    let time = timestamp
        .split_once('T')
        .or_else(|| timestamp.split_once(' '))
        .map_or(timestamp, |(_, time)| time);
    match time.get(..8) {
        Some(hms) if hms.as_bytes().get(2) == Some(&b':') && hms.as_bytes().get(5) == Some(&b':') => hms.to_owned(),
        _ => timestamp.to_owned(),
    }
}
