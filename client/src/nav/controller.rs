//! Navigation controller: decides which page is current.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every navigation closes the chat session before the next page is even
//! resolved, so a realtime channel never outlives the page that opened it.
//! Page rendering is delegated to a [`PageController`], which receives a
//! [`PageContext`] scoped to one visit.
//!
//! ERROR HANDLING
//! ==============
//! Mount failures are handed back to the page controller for inline display
//! and never escape `navigate_to`. Errors from superseded visits are dropped.

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::page::{PageId, PageScope};
use crate::chat::ChatSessionManager;
use crate::net::api::{ApiError, ChatGateway};
use crate::state::auth::AppState;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("please sign in to continue")]
    SignInRequired,
}

/// Everything a page needs for one visit.
#[derive(Clone)]
pub struct PageContext {
    pub scope: PageScope,
    pub chat: ChatSessionManager,
    pub gateway: Rc<dyn ChatGateway>,
    pub app: AppState,
}

impl PageContext {
    pub fn page(&self) -> PageId {
        self.scope.page()
    }
}

/// Renders pages. One implementation serves every [`PageId`].
#[async_trait(?Send)]
pub trait PageController {
    /// Build the page for `ctx.page()`.
    ///
    /// Implementations must re-check `ctx.scope.is_current()` after every
    /// await before touching shared state.
    ///
    /// # Errors
    ///
    /// Returns a [`PageError`] when the page cannot be built; it is passed to
    /// [`Self::show_error`].
    async fn mount(&self, ctx: &PageContext) -> Result<(), PageError>;

    /// Show a mount failure inline on the page.
    fn show_error(&self, ctx: &PageContext, error: &PageError);
}

struct Inner {
    current: PageId,
    visits: Rc<Cell<u64>>,
}

/// Cloneable handle to the navigation state machine.
#[derive(Clone)]
pub struct NavigationController {
    inner: Rc<RefCell<Inner>>,
    chat: ChatSessionManager,
    gateway: Rc<dyn ChatGateway>,
    app: AppState,
    pages: Rc<dyn PageController>,
}

impl NavigationController {
    pub fn new(
        chat: ChatSessionManager,
        gateway: Rc<dyn ChatGateway>,
        app: AppState,
        pages: Rc<dyn PageController>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                current: PageId::Home,
                visits: Rc::new(Cell::new(0)),
            })),
            chat,
            gateway,
            app,
            pages,
        }
    }

    pub fn current(&self) -> PageId {
        self.inner.borrow().current
    }

    pub fn chat(&self) -> &ChatSessionManager {
        &self.chat
    }

    /// Synchronous half of a navigation: close chat, resolve, start a visit.
    pub fn begin(&self, tag: &str, id: Option<i64>) -> PageContext {
        self.chat.close();

        let page = PageId::resolve(tag, id);
        if page.tag() != tag {
            debug!(tag, ?id, %page, "navigation target resolved to another page");
        }

        let mut inner = self.inner.borrow_mut();
        inner.current = page;
        let visit = inner.visits.get() + 1;
        inner.visits.set(visit);
        info!(%page, visit, "navigating");

        PageContext {
            scope: PageScope::new(page, visit, Rc::clone(&inner.visits)),
            chat: self.chat.clone(),
            gateway: Rc::clone(&self.gateway),
            app: self.app.clone(),
        }
    }

    /// Navigate and mount the resolved page. Returns the page that became
    /// current.
    pub async fn navigate_to(&self, tag: &str, id: Option<i64>) -> PageId {
        let ctx = self.begin(tag, id);
        let page = ctx.page();
        if let Err(err) = self.pages.mount(&ctx).await {
            if ctx.scope.is_current() {
                warn!(%page, %err, "page failed to load");
                self.pages.show_error(&ctx, &err);
            } else {
                debug!(%page, %err, "dropping error from superseded page visit");
            }
        }
        page
    }
}
