//! Chat session manager: the one owner of the realtime channel.
//!
//! SYSTEM CONTEXT
//! ==============
//! Exactly zero or one session handle exists at a time. Navigation asks for
//! `close()` before building the next page; the game details flow asks for
//! `open()` once history is loaded. Nothing else touches the handle.
//!
//! LIFECYCLE
//! =========
//! 1. `attach` binds the transcript to a game; `replace_history` fills it.
//! 2. `open` → `Connecting`; the connector starts a channel.
//! 3. `Opened` event → auth frame is sent first → `Open`.
//! 4. Inbound frames append to the transcript in delivery order.
//! 5. `close()` / server close → `Closed`; channel error → `Failed`.
//!    Nothing reconnects on its own; re-entering the page opens a new session.
//!
//! Every `open` and `close` bumps a generation counter. Channel events and
//! fallback continuations carry the generation they started under and are
//! dropped when it is no longer current.
//!
//! The shared state sits in an `Rc<RefCell<_>>` because everything runs on the
//! single UI event loop. No borrow is held across an await.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::cell::RefCell;
use std::rc::Rc;

use frames::{AuthFrame, ClientFrame, GameId, ServerFrame};
use futures::StreamExt;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, trace, warn};

use super::composer::{PendingPost, SendOutcome};
use crate::net::channel::{
    ChannelConnector, ChannelError, ChannelEvent, ChannelNotice, ChannelSink, RealtimeChannel, SessionGeneration,
    channel_events,
};
use crate::state::auth::Credentials;
use crate::state::chat::{
    ChatMessage, ChatState, ConnectionState, MessageOrigin, SystemNotice, TranscriptEntry, local_timestamp,
};

/// Observable change to the chat state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatUpdate {
    Connection(ConnectionState),
    /// The whole transcript was replaced (history load or reload).
    Reset(Vec<TranscriptEntry>),
    Appended(TranscriptEntry),
    /// Inline error for the chat region; the session is unaffected.
    Error(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpenOutcome {
    /// A new channel was requested.
    Connecting,
    /// A session for this game is already connecting or open.
    AlreadyActive,
    /// The connector refused; the state is now `Failed`.
    Failed(ChannelError),
}

/// The single realtime binding to one game.
struct SessionHandle {
    generation: SessionGeneration,
    game_id: GameId,
    credentials: Credentials,
    channel: Box<dyn RealtimeChannel>,
}

/// Game and identity the transcript currently belongs to.
#[derive(Clone, Debug)]
struct Binding {
    game_id: GameId,
    credentials: Credentials,
}

struct Inner {
    connector: Rc<dyn ChannelConnector>,
    chat_url: String,
    events: UnboundedSender<ChannelNotice>,
    state: ChatState,
    binding: Option<Binding>,
    handle: Option<SessionHandle>,
    generation: SessionGeneration,
    subscribers: Vec<UnboundedSender<ChatUpdate>>,
}

/// Cloneable handle to the chat session state.
#[derive(Clone)]
pub struct ChatSessionManager {
    inner: Rc<RefCell<Inner>>,
}

impl ChatSessionManager {
    /// Create a manager for the chat server at `chat_url`.
    ///
    /// The returned receiver carries every channel event; feed it back through
    /// [`pump_channel_events`] (or [`Self::handle_notice`]).
    pub fn new(
        connector: Rc<dyn ChannelConnector>,
        chat_url: impl Into<String>,
    ) -> (Self, UnboundedReceiver<ChannelNotice>) {
        let (events, rx) = channel_events();
        let inner = Inner {
            connector,
            chat_url: chat_url.into(),
            events,
            state: ChatState::default(),
            binding: None,
            handle: None,
            generation: 0,
            subscribers: Vec::new(),
        };
        (
            Self {
                inner: Rc::new(RefCell::new(inner)),
            },
            rx,
        )
    }

    /// Subscribe to state changes. The stream starts with the current
    /// connection state and a full transcript reset.
    pub fn subscribe(&self) -> UnboundedReceiver<ChatUpdate> {
        let (tx, rx) = mpsc::unbounded();
        let mut inner = self.inner.borrow_mut();
        let _ = tx.unbounded_send(ChatUpdate::Connection(inner.state.connection));
        let _ = tx.unbounded_send(ChatUpdate::Reset(inner.state.transcript.clone()));
        inner.subscribers.push(tx);
        rx
    }

    pub fn snapshot(&self) -> ChatState {
        self.inner.borrow().state.clone()
    }

    pub fn connection(&self) -> ConnectionState {
        self.inner.borrow().state.connection
    }

    /// Game of the live or most recent session, if still bound.
    pub fn game_id(&self) -> Option<GameId> {
        self.inner.borrow().binding.as_ref().map(|b| b.game_id)
    }

    pub fn generation(&self) -> SessionGeneration {
        self.inner.borrow().generation
    }

    /// Bind the transcript to `game_id`.
    ///
    /// Switching games empties the transcript and closes a session bound to
    /// the previous game.
    pub fn attach(&self, game_id: GameId, credentials: Credentials) {
        self.inner.borrow_mut().bind(game_id, credentials);
    }

    /// Install loaded history for the bound game. Returns `false` when
    /// `game_id` is not the bound game.
    pub fn replace_history(&self, game_id: GameId, history: Vec<ChatMessage>) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.bound_game() != Some(game_id) {
            debug!(game_id, "ignoring history for an unbound game");
            return false;
        }
        inner.reset(history);
        true
    }

    /// Replace the transcript after a fallback send, unless the session moved
    /// on since `generation`.
    pub fn reload_history(&self, generation: SessionGeneration, game_id: GameId, history: Vec<ChatMessage>) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.generation != generation || inner.bound_game() != Some(game_id) {
            return false;
        }
        inner.reset(history);
        true
    }

    /// Publish an inline error unless the session moved on since `generation`.
    pub fn report_error(&self, generation: SessionGeneration, message: String) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.generation != generation {
            return false;
        }
        inner.state.last_error = Some(message.clone());
        inner.publish(&ChatUpdate::Error(message));
        true
    }

    /// Open a session for `game_id`.
    ///
    /// No-op when a session for the same game is already connecting or open.
    /// A session for another game is closed first.
    pub fn open(&self, game_id: GameId, credentials: Credentials) -> OpenOutcome {
        let mut inner = self.inner.borrow_mut();
        if let Some(handle) = &inner.handle {
            if handle.game_id == game_id {
                debug!(game_id, "chat session already active");
                return OpenOutcome::AlreadyActive;
            }
            warn!(
                active = handle.game_id,
                requested = game_id,
                "closing chat session for another game before opening"
            );
            inner.close_handle();
        }

        inner.bind(game_id, credentials.clone());
        inner.generation += 1;
        let generation = inner.generation;
        inner.set_connection(ConnectionState::Connecting);

        let connector = Rc::clone(&inner.connector);
        let sink = ChannelSink::new(generation, inner.events.clone());
        match connector.connect(&inner.chat_url, sink) {
            Ok(channel) => {
                info!(game_id, generation, url = %inner.chat_url, "chat channel requested");
                inner.handle = Some(SessionHandle {
                    generation,
                    game_id,
                    credentials,
                    channel,
                });
                OpenOutcome::Connecting
            }
            Err(err) => {
                warn!(game_id, %err, "chat channel could not be requested");
                inner.set_connection(ConnectionState::Failed);
                OpenOutcome::Failed(err)
            }
        }
    }

    /// Close the session, if any, unbind the game, and clear its transcript.
    ///
    /// Fire-and-forget: the state is `Closed` as soon as the close request is
    /// issued. Safe to call repeatedly.
    pub fn close(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.generation += 1;
        inner.close_handle();
        inner.binding = None;
        if inner.state.game_id.take().is_some() || !inner.state.transcript.is_empty() {
            inner.reset(Vec::new());
        }
        inner.state.last_error = None;
    }

    /// Compose a message for the bound game.
    ///
    /// The optimistic copy is appended before anything else. When the channel
    /// is open the chat frame is sent; otherwise the caller must complete the
    /// returned [`SendOutcome::Fallback`].
    pub fn send(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Empty;
        }
        let mut inner = self.inner.borrow_mut();
        let Some(binding) = inner.binding.clone() else {
            debug!("chat send with no bound game");
            return SendOutcome::Unbound;
        };

        inner.append(TranscriptEntry::Message(ChatMessage {
            id: None,
            game_id: binding.game_id,
            user_id: binding.credentials.user_id,
            username: Some(binding.credentials.username.clone()),
            text: text.to_owned(),
            timestamp: local_timestamp(),
            origin: MessageOrigin::LocalOptimistic,
        }));

        if inner.state.connection == ConnectionState::Open {
            let sent = inner.handle.as_ref().map(|handle| {
                let frame = ClientFrame::Chat {
                    game_id: handle.game_id,
                    user_id: handle.credentials.user_id,
                    message: text.to_owned(),
                };
                handle.channel.send_text(frames::encode_client_frame(&frame))
            });
            match sent {
                Some(Ok(())) => return SendOutcome::Transmitted,
                Some(Err(err)) => {
                    warn!(game_id = binding.game_id, %err, "chat channel refused frame; falling back");
                    inner.fail_handle();
                }
                None => {}
            }
        }

        SendOutcome::Fallback(PendingPost {
            generation: inner.generation,
            game_id: binding.game_id,
            credentials: binding.credentials,
            text: text.to_owned(),
        })
    }

    /// Apply one channel event. Events from superseded channels are dropped.
    pub fn handle_notice(&self, notice: ChannelNotice) {
        let mut inner = self.inner.borrow_mut();
        let current = inner.handle.as_ref().map(|h| h.generation);
        if current != Some(notice.generation) {
            debug!(
                generation = notice.generation,
                ?current,
                "ignoring event from superseded chat channel"
            );
            return;
        }

        match notice.event {
            ChannelEvent::Opened => inner.on_opened(),
            ChannelEvent::Text(text) => inner.on_text(&text),
            ChannelEvent::Closed => {
                info!(generation = notice.generation, "chat channel closed");
                inner.handle = None;
                inner.set_connection(ConnectionState::Closed);
            }
            ChannelEvent::Failed(reason) => {
                warn!(generation = notice.generation, %reason, "chat channel failed");
                inner.fail_handle();
            }
        }
    }
}

impl Inner {
    fn bound_game(&self) -> Option<GameId> {
        self.binding.as_ref().map(|b| b.game_id)
    }

    fn publish(&mut self, update: &ChatUpdate) {
        self.subscribers.retain(|tx| tx.unbounded_send(update.clone()).is_ok());
    }

    fn set_connection(&mut self, next: ConnectionState) {
        if self.state.connection == next {
            return;
        }
        debug!(from = ?self.state.connection, to = ?next, "chat connection state");
        self.state.connection = next;
        self.publish(&ChatUpdate::Connection(next));
    }

    fn append(&mut self, entry: TranscriptEntry) {
        self.state.transcript.push(entry.clone());
        self.publish(&ChatUpdate::Appended(entry));
    }

    fn reset(&mut self, history: Vec<ChatMessage>) {
        self.state.transcript = history.into_iter().map(TranscriptEntry::Message).collect();
        self.state.last_error = None;
        let update = ChatUpdate::Reset(self.state.transcript.clone());
        self.publish(&update);
    }

    fn bind(&mut self, game_id: GameId, credentials: Credentials) {
        if self.bound_game() != Some(game_id) {
            if self.handle.as_ref().is_some_and(|h| h.game_id != game_id) {
                self.close_handle();
            }
            self.state.game_id = Some(game_id);
            self.reset(Vec::new());
        }
        self.binding = Some(Binding { game_id, credentials });
    }

    /// Drop the handle after asking its channel to close. State → `Closed`.
    fn close_handle(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        info!(game_id = handle.game_id, generation = handle.generation, "closing chat channel");
        handle.channel.close();
        self.set_connection(ConnectionState::Closed);
    }

    /// Drop the handle after a channel failure. State → `Failed`.
    fn fail_handle(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.channel.close();
        }
        self.set_connection(ConnectionState::Failed);
    }

    fn on_opened(&mut self) {
        if self.state.connection != ConnectionState::Connecting {
            return;
        }
        let Some(handle) = &self.handle else {
            return;
        };
        let auth = AuthFrame {
            game_id: handle.game_id,
            user_id: handle.credentials.user_id,
            token: handle.credentials.token.as_str().to_owned(),
        };
        let game_id = handle.game_id;
        match handle.channel.send_text(frames::encode_auth(&auth)) {
            Ok(()) => {
                info!(game_id, "chat channel open; auth frame sent");
                self.set_connection(ConnectionState::Open);
            }
            Err(err) => {
                warn!(game_id, %err, "failed to send chat auth frame");
                self.fail_handle();
            }
        }
    }

    fn on_text(&mut self, text: &str) {
        let frame = match frames::decode_server_frame(text) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "dropping undecodable chat frame");
                return;
            }
        };
        let Some(game_id) = self.handle.as_ref().map(|h| h.game_id) else {
            return;
        };

        match frame {
            ServerFrame::Chat {
                user_id,
                username,
                message,
                timestamp,
            } => {
                self.append(TranscriptEntry::Message(ChatMessage {
                    id: None,
                    game_id,
                    user_id,
                    username,
                    text: message,
                    timestamp: timestamp.unwrap_or_else(local_timestamp),
                    origin: MessageOrigin::ServerConfirmed,
                }));
            }
            ServerFrame::UserJoined { .. } => self.append(TranscriptEntry::Notice(SystemNotice::user_joined())),
            ServerFrame::UserLeft { .. } => self.append(TranscriptEntry::Notice(SystemNotice::user_left())),
            ServerFrame::Error { message } => {
                let text = message.unwrap_or_else(|| "unknown error".to_owned());
                warn!(game_id, %text, "chat server reported an error");
                self.append(TranscriptEntry::Notice(SystemNotice {
                    text: format!("Chat error: {text}"),
                }));
            }
            ServerFrame::Connected { .. } => debug!(game_id, "chat server confirmed registration"),
            ServerFrame::Typing { .. } | ServerFrame::Unknown => trace!(game_id, "ignoring chat frame"),
        }
    }
}

/// Apply channel events to `manager` in delivery order until every sender is
/// gone.
pub async fn pump_channel_events(manager: ChatSessionManager, mut events: UnboundedReceiver<ChannelNotice>) {
    while let Some(notice) = events.next().await {
        manager.handle_notice(notice);
    }
}
