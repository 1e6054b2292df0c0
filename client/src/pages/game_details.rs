//! Game details page: participant check, chat history, and chat entry.
//!
//! SYSTEM CONTEXT
//! ==============
//! This is the only page that opens a chat session. Entry order:
//! fetch game → attach transcript → fetch history → install → open channel.
//! The visit scope is re-checked after each await, so a user who navigated
//! away mid-fetch never gets a channel for the page they left.
//!
//! ERROR HANDLING
//! ==============
//! A failed game fetch is a page error. A failed history fetch only makes chat
//! unavailable; the rest of the page still renders.

#[cfg(test)]
#[path = "game_details_test.rs"]
mod game_details_test;

use frames::GameId;
use tracing::{debug, warn};

use crate::chat::{ChatSessionManager, OpenOutcome};
use crate::nav::PageContext;
use crate::nav::controller::PageError;
use crate::net::api::{ApiError, ChatGateway};
use crate::net::types::{GameDetails, HistoryMessage};
use crate::state::auth::Credentials;

/// Whether the chat region can show a live conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatAvailability {
    /// Anonymous visitor: prompt to sign in.
    SignInRequired,
    /// Signed in but not a participant: prompt to join.
    JoinRequired,
    /// History loaded and a session is connecting or open.
    Live,
    /// Chat could not be loaded; shown inline with a retry.
    Unavailable(String),
    /// The visit ended before chat was ready.
    Superseded,
}

/// What the page controller renders for one game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameDetailsView {
    pub game: GameDetails,
    pub is_participant: bool,
    pub is_full: bool,
    pub chat: ChatAvailability,
}

impl GameDetailsView {
    /// Offer a join action: signed in, not yet in the game, and a free slot.
    pub fn can_join(&self) -> bool {
        self.chat == ChatAvailability::JoinRequired && !self.is_full
    }
}

/// Load the game and, for a signed-in participant, enter its chat.
///
/// Returns `Ok(None)` when the visit was superseded while loading.
///
/// # Errors
///
/// Returns [`PageError::Api`] when the game itself cannot be fetched.
pub async fn mount(ctx: &PageContext, game_id: GameId) -> Result<Option<GameDetailsView>, PageError> {
    let game = ctx.gateway.fetch_game(game_id).await?;
    if !ctx.scope.is_current() {
        debug!(game_id, "game details visit superseded during game fetch");
        return Ok(None);
    }

    let credentials = ctx.app.credentials();
    let is_participant = credentials.as_ref().is_some_and(|c| game.has_participant(c.user_id));
    let chat = match credentials {
        None => ChatAvailability::SignInRequired,
        Some(_) if !is_participant => ChatAvailability::JoinRequired,
        Some(credentials) => enter_game_chat(ctx, game_id, credentials).await,
    };
    if chat == ChatAvailability::Superseded {
        return Ok(None);
    }

    Ok(Some(GameDetailsView {
        is_full: game.is_full(),
        game,
        is_participant,
        chat,
    }))
}

/// Bind the transcript, load history, and open the realtime session.
pub async fn enter_game_chat(ctx: &PageContext, game_id: GameId, credentials: Credentials) -> ChatAvailability {
    ctx.chat.attach(game_id, credentials.clone());

    let history = match ctx.gateway.fetch_history(game_id, &credentials.token).await {
        Ok(history) => history,
        Err(err) => {
            if !ctx.scope.is_current() {
                return ChatAvailability::Superseded;
            }
            warn!(game_id, %err, "failed to load chat history");
            let message = format!("Error loading chat messages: {err}");
            ctx.chat.report_error(ctx.chat.generation(), message.clone());
            return ChatAvailability::Unavailable(message);
        }
    };
    if !ctx.scope.is_current() {
        debug!(game_id, "game details visit superseded during history fetch");
        return ChatAvailability::Superseded;
    }

    ctx.chat.replace_history(
        game_id,
        history.into_iter().map(HistoryMessage::into_chat_message).collect(),
    );
    match ctx.chat.open(game_id, credentials) {
        OpenOutcome::Connecting | OpenOutcome::AlreadyActive => ChatAvailability::Live,
        OpenOutcome::Failed(err) => ChatAvailability::Unavailable(err.to_string()),
    }
}

/// Add the signed-in user to a game.
///
/// # Errors
///
/// Returns the gateway's [`ApiError`]; nothing else changes.
pub async fn join_game(gateway: &dyn ChatGateway, game_id: GameId, credentials: &Credentials) -> Result<(), ApiError> {
    gateway.join_game(game_id, &credentials.token).await
}

/// Remove the signed-in user from a game and end its chat session.
///
/// # Errors
///
/// Returns the gateway's [`ApiError`]; the chat session is left running.
pub async fn leave_game(
    chat: &ChatSessionManager,
    gateway: &dyn ChatGateway,
    game_id: GameId,
    credentials: &Credentials,
) -> Result<(), ApiError> {
    gateway.leave_game(game_id, &credentials.token).await?;
    if chat.game_id() == Some(game_id) {
        chat.close();
    }
    Ok(())
}
