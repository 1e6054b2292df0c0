//! Request/response gateway to the scheduling backend.
//!
//! The core only needs chat history, chat posting, the game participant list,
//! join/leave, and the signed-in profile. Everything else the backend offers
//! is plain CRUD owned by page controllers.
//!
//! ERROR HANDLING
//! ==============
//! Implementations map transport failures, non-success statuses, and body
//! decode failures onto [`ApiError`]. Callers turn these into inline page or
//! chat errors; an `ApiError` never tears down a chat session.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use async_trait::async_trait;
use frames::GameId;

use super::types::{ErrorBody, GameDetails, HistoryMessage, UserProfile};
use crate::state::auth::AuthToken;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),
    /// The backend answered with a non-success status.
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },
    /// The response body did not match the expected schema.
    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Request/response calls the core depends on.
///
/// Futures are `?Send`: every implementation runs on the single UI event loop.
#[async_trait(?Send)]
pub trait ChatGateway {
    /// Ordered chat history for a game.
    async fn fetch_history(&self, game_id: GameId, token: &AuthToken) -> Result<Vec<HistoryMessage>, ApiError>;

    /// Persist one chat message. Has no realtime side effect.
    async fn post_message(&self, game_id: GameId, token: &AuthToken, text: &str) -> Result<(), ApiError>;

    async fn fetch_game(&self, game_id: GameId) -> Result<GameDetails, ApiError>;

    async fn join_game(&self, game_id: GameId, token: &AuthToken) -> Result<(), ApiError>;

    async fn leave_game(&self, game_id: GameId, token: &AuthToken) -> Result<(), ApiError>;

    /// Profile of the user owning `token`.
    async fn fetch_profile(&self, token: &AuthToken) -> Result<UserProfile, ApiError>;
}

pub fn chat_history_path(game_id: GameId) -> String {
    format!("chat/games/{game_id}")
}

pub fn game_path(game_id: GameId) -> String {
    format!("games/{game_id}")
}

pub fn join_game_path(game_id: GameId) -> String {
    format!("games/{game_id}/join")
}

pub fn leave_game_path(game_id: GameId) -> String {
    format!("games/{game_id}/leave")
}

pub const PROFILE_PATH: &str = "auth/profile";

/// Build the error for a non-success response from its raw body.
///
/// Uses the backend's `{"message": ...}` when present.
pub fn status_error(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("request failed: {status}"));
    ApiError::Status { status, message }
}

#[cfg(feature = "hydrate")]
pub use gloo::GlooGateway;

#[cfg(feature = "hydrate")]
mod gloo {
    use async_trait::async_trait;
    use frames::GameId;
    use gloo_net::http::{Request, Response};
    use serde::de::DeserializeOwned;

    use super::{ApiError, ChatGateway, status_error};
    use crate::config::ClientConfig;
    use crate::net::types::{GameDetails, GameResponse, HistoryMessage, HistoryResponse, PostMessageRequest, ProfileResponse, UserProfile};
    use crate::state::auth::AuthToken;

    /// Browser gateway backed by `fetch` through `gloo-net`.
    #[derive(Clone, Debug)]
    pub struct GlooGateway {
        config: ClientConfig,
    }

    impl GlooGateway {
        pub fn new(config: ClientConfig) -> Self {
            Self { config }
        }
    }

    fn transport(err: gloo_net::Error) -> ApiError {
        ApiError::Transport(err.to_string())
    }

    async fn expect_ok(resp: Response) -> Result<Response, ApiError> {
        if resp.ok() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
        let resp = expect_ok(resp).await?;
        resp.json::<T>().await.map_err(|e| ApiError::Decode(e.to_string()))
    }

    #[async_trait(?Send)]
    impl ChatGateway for GlooGateway {
        async fn fetch_history(&self, game_id: GameId, token: &AuthToken) -> Result<Vec<HistoryMessage>, ApiError> {
            let url = self.config.api_url(&super::chat_history_path(game_id));
            let resp = Request::get(&url)
                .header("Authorization", &token.bearer())
                .send()
                .await
                .map_err(transport)?;
            let body: HistoryResponse = read_json(resp).await?;
            Ok(body.messages)
        }

        async fn post_message(&self, game_id: GameId, token: &AuthToken, text: &str) -> Result<(), ApiError> {
            let url = self.config.api_url(&super::chat_history_path(game_id));
            let payload = PostMessageRequest { message: text.to_owned() };
            let resp = Request::post(&url)
                .header("Authorization", &token.bearer())
                .json(&payload)
                .map_err(transport)?
                .send()
                .await
                .map_err(transport)?;
            expect_ok(resp).await.map(|_| ())
        }

        async fn fetch_game(&self, game_id: GameId) -> Result<GameDetails, ApiError> {
            let url = self.config.api_url(&super::game_path(game_id));
            let resp = Request::get(&url).send().await.map_err(transport)?;
            let body: GameResponse = read_json(resp).await?;
            Ok(body.game)
        }

        async fn join_game(&self, game_id: GameId, token: &AuthToken) -> Result<(), ApiError> {
            let url = self.config.api_url(&super::join_game_path(game_id));
            let resp = Request::post(&url)
                .header("Authorization", &token.bearer())
                .send()
                .await
                .map_err(transport)?;
            expect_ok(resp).await.map(|_| ())
        }

        async fn leave_game(&self, game_id: GameId, token: &AuthToken) -> Result<(), ApiError> {
            let url = self.config.api_url(&super::leave_game_path(game_id));
            let resp = Request::post(&url)
                .header("Authorization", &token.bearer())
                .send()
                .await
                .map_err(transport)?;
            expect_ok(resp).await.map(|_| ())
        }

        async fn fetch_profile(&self, token: &AuthToken) -> Result<UserProfile, ApiError> {
            let url = self.config.api_url(super::PROFILE_PATH);
            let resp = Request::get(&url)
                .header("Authorization", &token.bearer())
                .send()
                .await
                .map_err(transport)?;
            let body: ProfileResponse = read_json(resp).await?;
            Ok(body.user)
        }
    }
}
