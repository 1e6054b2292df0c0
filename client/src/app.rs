//! Application root: wires auth state, chat, and navigation together.
//!
//! SYSTEM CONTEXT
//! ==============
//! Frontends build one [`App`] at startup with their own gateway, channel
//! connector and page controller, spawn [`pump_channel_events`] on the
//! returned receiver, then drive everything through the methods below.
//!
//! [`pump_channel_events`]: crate::chat::pump_channel_events

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;

use std::rc::Rc;

use frames::GameId;
use futures::channel::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::chat::{ChatSessionManager, SendOutcome, send_message};
use crate::config::ClientConfig;
use crate::nav::{NavigationController, PageController, PageError, PageId};
use crate::net::api::{ApiError, ChatGateway};
use crate::net::channel::{ChannelConnector, ChannelNotice};
use crate::pages::game_details;
use crate::state::auth::{AppState, AuthToken, Credentials};

#[derive(Clone)]
pub struct App {
    state: AppState,
    chat: ChatSessionManager,
    nav: NavigationController,
    gateway: Rc<dyn ChatGateway>,
}

impl App {
    /// Build the application for a page served from `origin`.
    ///
    /// The returned receiver carries realtime channel events and must be
    /// pumped into [`Self::chat`] for the session to make progress.
    pub fn new(
        config: &ClientConfig,
        origin: &str,
        gateway: Rc<dyn ChatGateway>,
        connector: Rc<dyn ChannelConnector>,
        pages: Rc<dyn PageController>,
    ) -> (Self, UnboundedReceiver<ChannelNotice>) {
        let state = AppState::new();
        let (chat, events) = ChatSessionManager::new(connector, config.chat_endpoint(origin));
        let nav = NavigationController::new(chat.clone(), Rc::clone(&gateway), state.clone(), pages);
        (
            Self {
                state,
                chat,
                nav,
                gateway,
            },
            events,
        )
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn chat(&self) -> &ChatSessionManager {
        &self.chat
    }

    pub fn nav(&self) -> &NavigationController {
        &self.nav
    }

    pub fn sign_in(&self, credentials: Credentials) {
        self.state.init(credentials);
    }

    /// Validate a stored token against the backend and sign in with it.
    ///
    /// An invalid token leaves the app signed out.
    ///
    /// # Errors
    ///
    /// Returns the gateway's [`ApiError`] when the profile cannot be fetched.
    pub async fn restore_session(&self, token: AuthToken) -> Result<Credentials, ApiError> {
        match self.gateway.fetch_profile(&token).await {
            Ok(profile) => {
                let credentials = Credentials {
                    user_id: profile.user_id,
                    username: profile.username,
                    token,
                };
                self.state.init(credentials.clone());
                Ok(credentials)
            }
            Err(err) => {
                warn!(%err, "stored token rejected");
                self.state.clear();
                Err(err)
            }
        }
    }

    /// Forget the user and return home. Any chat session is closed.
    pub async fn sign_out(&self) -> PageId {
        self.state.clear();
        self.nav.navigate_to("home", None).await
    }

    pub async fn navigate_to(&self, tag: &str, id: Option<i64>) -> PageId {
        self.nav.navigate_to(tag, id).await
    }

    /// Send from the composer of the current game page.
    pub async fn send_chat(&self, text: &str) -> SendOutcome {
        send_message(&self.chat, self.gateway.as_ref(), text).await
    }

    /// Join `game_id`, then reload its page so chat opens.
    ///
    /// # Errors
    ///
    /// [`PageError::SignInRequired`] when signed out, or the gateway failure.
    pub async fn join_game(&self, game_id: GameId) -> Result<PageId, PageError> {
        let credentials = self.state.credentials().ok_or(PageError::SignInRequired)?;
        game_details::join_game(self.gateway.as_ref(), game_id, &credentials).await?;
        info!(game_id, "joined game");
        Ok(self.nav.navigate_to("game-details", Some(game_id)).await)
    }

    /// Leave `game_id`, close its chat, and return to the games list.
    ///
    /// # Errors
    ///
    /// [`PageError::SignInRequired`] when signed out, or the gateway failure;
    /// the chat session stays up in either case.
    pub async fn leave_game(&self, game_id: GameId) -> Result<PageId, PageError> {
        let credentials = self.state.credentials().ok_or(PageError::SignInRequired)?;
        game_details::leave_game(&self.chat, self.gateway.as_ref(), game_id, &credentials).await?;
        info!(game_id, "left game");
        Ok(self.nav.navigate_to("games", None).await)
    }

    /// Pump channel events on the browser event loop.
    #[cfg(feature = "hydrate")]
    pub fn spawn_channel_pump(&self, events: UnboundedReceiver<ChannelNotice>) {
        wasm_bindgen_futures::spawn_local(crate::chat::pump_channel_events(self.chat.clone(), events));
    }

    /// Build the app for the current browser page with `fetch` and
    /// `WebSocket` transports, and start pumping channel events.
    #[cfg(feature = "hydrate")]
    pub fn start_in_browser(config: ClientConfig, pages: Rc<dyn PageController>) -> Self {
        let origin = web_sys::window()
            .and_then(|window| window.location().origin().ok())
            .unwrap_or_default();
        let (app, events) = Self::new(
            &config,
            &origin,
            Rc::new(crate::net::api::GlooGateway::new(config.clone())),
            Rc::new(crate::net::browser::BrowserConnector),
            pages,
        );
        app.spawn_channel_pump(events);
        app
    }
}
