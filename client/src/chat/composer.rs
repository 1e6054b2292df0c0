//! Optimistic message sending with a request/response fallback.
//!
//! `ChatSessionManager::send` performs the synchronous half: validation, the
//! optimistic append, and the live frame when the channel is open. When it is
//! not, the caller receives a [`PendingPost`] and [`send_message`] finishes the
//! job over the gateway, replacing the transcript with the authoritative
//! history afterwards.
//!
//! A live send is echoed back by the server as an ordinary `chat` frame, so the
//! transcript then holds the optimistic copy and the confirmed copy. This is
//! the established behavior of the chat protocol and is kept as is.

#[cfg(test)]
#[path = "composer_test.rs"]
mod composer_test;

use frames::GameId;
use tracing::{debug, warn};

use super::session::ChatSessionManager;
use crate::net::api::{ApiError, ChatGateway};
use crate::net::channel::SessionGeneration;
use crate::net::types::HistoryMessage;
use crate::state::auth::Credentials;

/// Message that must be persisted through the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingPost {
    /// Manager generation when the message was composed.
    pub generation: SessionGeneration,
    pub game_id: GameId,
    pub credentials: Credentials,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank after trimming; nothing happened.
    Empty,
    /// No game is bound; nothing happened.
    Unbound,
    /// Appended optimistically and sent over the open channel.
    Transmitted,
    /// Appended optimistically; the channel is not open.
    Fallback(PendingPost),
}

/// Send `text` to the bound game's chat, falling back to the gateway when the
/// channel is not open.
///
/// Gateway failures are reported inline through the manager's update stream
/// and leave the session untouched.
pub async fn send_message(chat: &ChatSessionManager, gateway: &dyn ChatGateway, text: &str) -> SendOutcome {
    let outcome = chat.send(text);
    if let SendOutcome::Fallback(pending) = &outcome {
        if let Err(err) = persist_and_reload(chat, gateway, pending).await {
            warn!(game_id = pending.game_id, %err, "failed to send chat message");
            chat.report_error(pending.generation, format!("Error sending message: {err}"));
        }
    }
    outcome
}

/// POST the pending message, then reload the transcript from history.
///
/// Returns `Ok(false)` when the session moved on while the calls were in
/// flight; the reload is then discarded.
///
/// # Errors
///
/// Returns the first [`ApiError`] from either call.
pub async fn persist_and_reload(
    chat: &ChatSessionManager,
    gateway: &dyn ChatGateway,
    pending: &PendingPost,
) -> Result<bool, ApiError> {
    gateway
        .post_message(pending.game_id, &pending.credentials.token, &pending.text)
        .await?;
    let history = gateway
        .fetch_history(pending.game_id, &pending.credentials.token)
        .await?;
    let applied = chat.reload_history(
        pending.generation,
        pending.game_id,
        history.into_iter().map(HistoryMessage::into_chat_message).collect(),
    );
    if !applied {
        debug!(game_id = pending.game_id, "discarded history reload for a superseded session");
    }
    Ok(applied)
}
