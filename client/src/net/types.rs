//! REST wire DTOs consumed by the client core.
//!
//! DESIGN
//! ======
//! These types mirror the backend's JSON bodies. Optional fields default so a
//! partially populated row still decodes; required ids do not.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use frames::{GameId, UserId};
use serde::{Deserialize, Serialize};

use crate::state::chat::{ChatMessage, MessageOrigin, local_timestamp};

/// One persisted chat message as returned by the history endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub message_id: i64,
    pub game_id: GameId,
    pub user_id: UserId,
    pub message_text: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl HistoryMessage {
    pub fn into_chat_message(self) -> ChatMessage {
        ChatMessage {
            id: Some(self.message_id),
            game_id: self.game_id,
            user_id: self.user_id,
            username: self.username,
            text: self.message_text,
            timestamp: self.timestamp.unwrap_or_else(local_timestamp),
            origin: MessageOrigin::HistoryLoaded,
        }
    }
}

/// `GET /chat/games/{id}` body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub messages: Vec<HistoryMessage>,
}

/// `POST /chat/games/{id}` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMessageRequest {
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: UserId,
    #[serde(default)]
    pub joined_at: Option<String>,
}

/// The subset of a game the core needs: who may chat in it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDetails {
    pub game_id: GameId,
    #[serde(default)]
    pub court_id: Option<i64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub max_players: Option<u32>,
    #[serde(default)]
    pub skill_level: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

impl GameDetails {
    pub fn has_participant(&self, user_id: UserId) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    pub fn is_full(&self) -> bool {
        self.max_players
            .is_some_and(|max| self.participants.len() >= max as usize)
    }
}

/// `GET /games/{id}` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResponse {
    pub game: GameDetails,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: String,
}

/// `GET /auth/profile` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
}

/// Error body shape shared by every non-success response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
