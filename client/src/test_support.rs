//! In-memory fakes for the transport and page seams.
//!
//! Fakes share a [`Journal`] so tests can assert the relative order of
//! connects, closes, and page mounts.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use frames::{GameId, UserId};
use futures::channel::mpsc::UnboundedReceiver;

use crate::app::App;
use crate::chat::{ChatSessionManager, ChatUpdate};
use crate::config::ClientConfig;
use crate::nav::{PageContext, PageController, PageError, PageId};
use crate::net::api::{ApiError, ChatGateway};
use crate::net::channel::{ChannelConnector, ChannelError, ChannelEvent, ChannelNotice, ChannelSink, RealtimeChannel};
use crate::net::types::{GameDetails, HistoryMessage, Participant, UserProfile};
use crate::pages::game_details::{self, GameDetailsView};
use crate::state::auth::{AuthToken, Credentials};

pub(crate) const ORIGIN: &str = "http://localhost:5000";
pub(crate) const CHAT_URL: &str = "ws://localhost:8765";

pub(crate) type Journal = Rc<RefCell<Vec<String>>>;

pub(crate) fn credentials(user_id: UserId) -> Credentials {
    Credentials {
        user_id,
        username: format!("user{user_id}"),
        token: AuthToken::new(format!("tok-{user_id}")),
    }
}

fn token_user(token: &AuthToken) -> UserId {
    token
        .as_str()
        .strip_prefix("tok-")
        .and_then(|id| id.parse().ok())
        .unwrap_or_default()
}

/// Apply every queued channel event.
pub(crate) fn drain(chat: &ChatSessionManager, events: &mut UnboundedReceiver<ChannelNotice>) {
    while let Ok(Some(notice)) = events.try_next() {
        chat.handle_notice(notice);
    }
}

pub(crate) fn drain_updates(updates: &mut UnboundedReceiver<ChatUpdate>) -> Vec<ChatUpdate> {
    let mut out = Vec::new();
    while let Ok(Some(update)) = updates.try_next() {
        out.push(update);
    }
    out
}

// =============================================================
// Realtime channel
// =============================================================

/// What one fake channel was asked to do.
#[derive(Default)]
pub(crate) struct ChannelLog {
    pub sent: RefCell<Vec<String>>,
    pub closed: Cell<bool>,
    /// Make every later `send_text` fail.
    pub refuse: Cell<bool>,
}

struct FakeChannel {
    log: Rc<ChannelLog>,
    journal: Journal,
}

impl RealtimeChannel for FakeChannel {
    fn send_text(&self, text: String) -> Result<(), ChannelError> {
        if self.log.closed.get() || self.log.refuse.get() {
            return Err(ChannelError::Closed);
        }
        self.log.sent.borrow_mut().push(text);
        Ok(())
    }

    fn close(&self) {
        if !self.log.closed.replace(true) {
            self.journal.borrow_mut().push("close".to_owned());
        }
    }
}

pub(crate) struct FakeConnector {
    journal: Journal,
    channels: RefCell<Vec<(ChannelSink, Rc<ChannelLog>)>>,
    pub fail_next: Cell<bool>,
}

impl FakeConnector {
    pub fn new(journal: Journal) -> Rc<Self> {
        Rc::new(Self {
            journal,
            channels: RefCell::new(Vec::new()),
            fail_next: Cell::new(false),
        })
    }

    pub fn connect_count(&self) -> usize {
        self.channels.borrow().len()
    }

    pub fn log(&self, index: usize) -> Rc<ChannelLog> {
        Rc::clone(&self.channels.borrow()[index].1)
    }

    /// Queue an event as channel `index` would.
    pub fn emit(&self, index: usize, event: ChannelEvent) -> bool {
        self.channels.borrow()[index].0.emit(event)
    }

    pub fn emit_text(&self, index: usize, json: &str) -> bool {
        self.emit(index, ChannelEvent::Text(json.to_owned()))
    }
}

impl ChannelConnector for FakeConnector {
    fn connect(&self, url: &str, sink: ChannelSink) -> Result<Box<dyn RealtimeChannel>, ChannelError> {
        self.journal.borrow_mut().push(format!("connect {url}"));
        if self.fail_next.take() {
            return Err(ChannelError::Connect("connection refused".to_owned()));
        }
        let log = Rc::new(ChannelLog::default());
        self.channels.borrow_mut().push((sink, Rc::clone(&log)));
        Ok(Box::new(FakeChannel {
            log,
            journal: Rc::clone(&self.journal),
        }))
    }
}

/// Manager wired to a fresh fake connector.
pub(crate) fn chat_manager() -> (ChatSessionManager, Rc<FakeConnector>, UnboundedReceiver<ChannelNotice>) {
    let connector = FakeConnector::new(Journal::default());
    let (chat, events) = ChatSessionManager::new(Rc::clone(&connector) as Rc<dyn ChannelConnector>, CHAT_URL);
    (chat, connector, events)
}

// =============================================================
// Gateway
// =============================================================

type Hook = Box<dyn FnOnce()>;

#[derive(Default)]
pub(crate) struct FakeGateway {
    pub games: RefCell<HashMap<GameId, GameDetails>>,
    pub history: RefCell<HashMap<GameId, Vec<HistoryMessage>>>,
    pub posted: RefCell<Vec<(GameId, String)>>,
    pub profile: RefCell<Option<UserProfile>>,
    pub fail_post: Cell<bool>,
    pub fail_history: Cell<bool>,
    pub fail_join: Cell<bool>,
    pub fail_leave: Cell<bool>,
    before_history: RefCell<Option<Hook>>,
    next_id: Cell<i64>,
}

impl FakeGateway {
    pub fn add_game(&self, game_id: GameId, max_players: u32, participants: &[UserId]) {
        let game = GameDetails {
            game_id,
            court_id: Some(1),
            date: Some("2024-05-01".to_owned()),
            time: Some("18:00".to_owned()),
            max_players: Some(max_players),
            skill_level: None,
            status: Some("open".to_owned()),
            participants: participants
                .iter()
                .map(|&user_id| Participant { user_id, joined_at: None })
                .collect(),
        };
        self.games.borrow_mut().insert(game_id, game);
    }

    pub fn add_history(&self, game_id: GameId, user_id: UserId, text: &str) {
        let message_id = self.next_id.get() + 1;
        self.next_id.set(message_id);
        self.history.borrow_mut().entry(game_id).or_default().push(HistoryMessage {
            message_id,
            game_id,
            user_id,
            message_text: text.to_owned(),
            timestamp: Some("2024-05-01T18:00:00Z".to_owned()),
            username: Some(format!("user{user_id}")),
        });
    }

    /// Run `hook` inside the next history fetch, before it resolves.
    pub fn before_next_history(&self, hook: impl FnOnce() + 'static) {
        *self.before_history.borrow_mut() = Some(Box::new(hook));
    }

    fn participant_ids(&self, game_id: GameId) -> Vec<UserId> {
        self.games
            .borrow()
            .get(&game_id)
            .map(|g| g.participants.iter().map(|p| p.user_id).collect())
            .unwrap_or_default()
    }
}

#[async_trait(?Send)]
impl ChatGateway for FakeGateway {
    async fn fetch_history(&self, game_id: GameId, _token: &AuthToken) -> Result<Vec<HistoryMessage>, ApiError> {
        let hook = self.before_history.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
        if self.fail_history.get() {
            return Err(ApiError::Status {
                status: 500,
                message: "Failed to fetch messages".to_owned(),
            });
        }
        Ok(self.history.borrow().get(&game_id).cloned().unwrap_or_default())
    }

    async fn post_message(&self, game_id: GameId, token: &AuthToken, text: &str) -> Result<(), ApiError> {
        if self.fail_post.get() {
            return Err(ApiError::Transport("network unreachable".to_owned()));
        }
        self.posted.borrow_mut().push((game_id, text.to_owned()));
        self.add_history(game_id, token_user(token), text);
        Ok(())
    }

    async fn fetch_game(&self, game_id: GameId) -> Result<GameDetails, ApiError> {
        self.games.borrow().get(&game_id).cloned().ok_or(ApiError::Status {
            status: 404,
            message: "Game not found".to_owned(),
        })
    }

    async fn join_game(&self, game_id: GameId, token: &AuthToken) -> Result<(), ApiError> {
        if self.fail_join.get() {
            return Err(ApiError::Status {
                status: 400,
                message: "Game is full".to_owned(),
            });
        }
        let user_id = token_user(token);
        if let Some(game) = self.games.borrow_mut().get_mut(&game_id) {
            game.participants.push(Participant { user_id, joined_at: None });
        }
        Ok(())
    }

    async fn leave_game(&self, game_id: GameId, token: &AuthToken) -> Result<(), ApiError> {
        let user_id = token_user(token);
        if self.fail_leave.get() || !self.participant_ids(game_id).contains(&user_id) {
            return Err(ApiError::Status {
                status: 400,
                message: "Not a participant".to_owned(),
            });
        }
        if let Some(game) = self.games.borrow_mut().get_mut(&game_id) {
            game.participants.retain(|p| p.user_id != user_id);
        }
        Ok(())
    }

    async fn fetch_profile(&self, _token: &AuthToken) -> Result<UserProfile, ApiError> {
        self.profile.borrow().clone().ok_or(ApiError::Status {
            status: 401,
            message: "Invalid token".to_owned(),
        })
    }
}

// =============================================================
// Pages
// =============================================================

/// Page controller that records mounts and delegates game details.
pub(crate) struct RecordingPages {
    journal: Journal,
    pub views: RefCell<Vec<GameDetailsView>>,
    pub errors: RefCell<Vec<(PageId, String)>>,
}

impl RecordingPages {
    pub fn new(journal: Journal) -> Rc<Self> {
        Rc::new(Self {
            journal,
            views: RefCell::new(Vec::new()),
            errors: RefCell::new(Vec::new()),
        })
    }

    pub fn last_view(&self) -> Option<GameDetailsView> {
        self.views.borrow().last().cloned()
    }
}

#[async_trait(?Send)]
impl PageController for RecordingPages {
    async fn mount(&self, ctx: &PageContext) -> Result<(), PageError> {
        let page = ctx.page();
        self.journal.borrow_mut().push(format!("mount {page}"));
        if page.requires_sign_in() && !ctx.app.is_signed_in() {
            return Err(PageError::SignInRequired);
        }
        if let PageId::GameDetails(game_id) = page {
            if let Some(view) = game_details::mount(ctx, game_id).await? {
                self.views.borrow_mut().push(view);
            }
        }
        Ok(())
    }

    fn show_error(&self, ctx: &PageContext, error: &PageError) {
        self.errors.borrow_mut().push((ctx.page(), error.to_string()));
    }
}

// =============================================================
// Whole app
// =============================================================

pub(crate) struct Harness {
    pub journal: Journal,
    pub connector: Rc<FakeConnector>,
    pub gateway: Rc<FakeGateway>,
    pub pages: Rc<RecordingPages>,
    pub app: App,
    pub events: UnboundedReceiver<ChannelNotice>,
}

impl Harness {
    pub fn new() -> Self {
        let journal = Journal::default();
        let connector = FakeConnector::new(Rc::clone(&journal));
        let gateway = Rc::new(FakeGateway::default());
        let pages = RecordingPages::new(Rc::clone(&journal));
        let (app, events) = App::new(
            &ClientConfig::default(),
            ORIGIN,
            Rc::clone(&gateway) as Rc<dyn ChatGateway>,
            Rc::clone(&connector) as Rc<dyn ChannelConnector>,
            Rc::clone(&pages) as Rc<dyn PageController>,
        );
        Self {
            journal,
            connector,
            gateway,
            pages,
            app,
            events,
        }
    }

    /// Deliver queued channel events to the chat manager.
    pub fn pump(&mut self) {
        drain(self.app.chat(), &mut self.events);
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.borrow().clone()
    }
}
