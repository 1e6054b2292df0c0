//! `reqwest` implementation of the chat gateway.
//!
//! Every call carries the bearer token except the public game lookup.
//! Non-success statuses are mapped through `client::net::api::status_error`
//! so the backend's `{"message": ...}` becomes the error text.

#[cfg(test)]
#[path = "gateway_test.rs"]
mod gateway_test;

use async_trait::async_trait;
use client::config::ClientConfig;
use client::net::api::{self, ApiError, ChatGateway};
use client::net::types::{
    GameDetails, GameResponse, HistoryMessage, HistoryResponse, PostMessageRequest, ProfileResponse, UserProfile,
};
use client::state::auth::AuthToken;
use frames::GameId;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct HttpGateway {
    http: Client,
    config: ClientConfig,
}

impl HttpGateway {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        self.config.api_url(path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "api response");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(api::status_error(status.as_u16(), &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let body = response.text().await.map_err(transport)?;
        decode_body(&body)
    }
}

fn transport(error: reqwest::Error) -> ApiError {
    ApiError::Transport(error.to_string())
}

fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|error| ApiError::Decode(error.to_string()))
}

#[async_trait(?Send)]
impl ChatGateway for HttpGateway {
    async fn fetch_history(&self, game_id: GameId, token: &AuthToken) -> Result<Vec<HistoryMessage>, ApiError> {
        let request = self
            .http
            .get(self.url(&api::chat_history_path(game_id)))
            .bearer_auth(token.as_str());
        let body: HistoryResponse = self.send_json(request).await?;
        Ok(body.messages)
    }

    async fn post_message(&self, game_id: GameId, token: &AuthToken, text: &str) -> Result<(), ApiError> {
        let request = self
            .http
            .post(self.url(&api::chat_history_path(game_id)))
            .bearer_auth(token.as_str())
            .json(&PostMessageRequest {
                message: text.to_owned(),
            });
        self.send(request).await.map(|_| ())
    }

    async fn fetch_game(&self, game_id: GameId) -> Result<GameDetails, ApiError> {
        let request = self.http.get(self.url(&api::game_path(game_id)));
        let body: GameResponse = self.send_json(request).await?;
        Ok(body.game)
    }

    async fn join_game(&self, game_id: GameId, token: &AuthToken) -> Result<(), ApiError> {
        let request = self
            .http
            .post(self.url(&api::join_game_path(game_id)))
            .bearer_auth(token.as_str());
        self.send(request).await.map(|_| ())
    }

    async fn leave_game(&self, game_id: GameId, token: &AuthToken) -> Result<(), ApiError> {
        let request = self
            .http
            .post(self.url(&api::leave_game_path(game_id)))
            .bearer_auth(token.as_str());
        self.send(request).await.map(|_| ())
    }

    async fn fetch_profile(&self, token: &AuthToken) -> Result<UserProfile, ApiError> {
        let request = self.http.get(self.url(api::PROFILE_PATH)).bearer_auth(token.as_str());
        let body: ProfileResponse = self.send_json(request).await?;
        Ok(body.user)
    }
}
