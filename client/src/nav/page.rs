//! Page identity and visit scopes.

#[cfg(test)]
#[path = "page_test.rs"]
mod page_test;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use frames::GameId;

pub type CourtId = i64;

/// One screen of the application. Exactly one is current at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageId {
    Home,
    GamesList,
    GameDetails(GameId),
    Courts,
    CourtDetails(CourtId),
    /// Schedule form, optionally preselecting a court.
    ScheduleGame(Option<CourtId>),
}

impl PageId {
    /// Resolve a navigation target. Total: unknown tags land on `Home`, and
    /// detail pages without an id fall back to their list page.
    pub fn resolve(tag: &str, id: Option<i64>) -> Self {
        match (tag, id) {
            ("games", _) => Self::GamesList,
            ("game-details", Some(game_id)) => Self::GameDetails(game_id),
            ("game-details", None) => Self::GamesList,
            ("courts", _) => Self::Courts,
            ("court-details", Some(court_id)) => Self::CourtDetails(court_id),
            ("court-details", None) => Self::Courts,
            ("schedule-game" | "schedule-game-page", court_id) => Self::ScheduleGame(court_id),
            _ => Self::Home,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::GamesList => "games",
            Self::GameDetails(_) => "game-details",
            Self::Courts => "courts",
            Self::CourtDetails(_) => "court-details",
            Self::ScheduleGame(_) => "schedule-game",
        }
    }

    pub fn id(self) -> Option<i64> {
        match self {
            Self::GameDetails(id) | Self::CourtDetails(id) => Some(id),
            Self::ScheduleGame(id) => id,
            Self::Home | Self::GamesList | Self::Courts => None,
        }
    }

    /// Pages that only render a sign-in prompt for anonymous users.
    pub fn requires_sign_in(self) -> bool {
        matches!(self, Self::ScheduleGame(_))
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => write!(f, "{} {id}", self.tag()),
            None => f.write_str(self.tag()),
        }
    }
}

/// One visit to a page.
///
/// Mounts suspend on fetches; a scope tells the mount whether the user has
/// navigated elsewhere in the meantime.
#[derive(Clone, Debug)]
pub struct PageScope {
    page: PageId,
    visit: u64,
    latest: Rc<Cell<u64>>,
}

impl PageScope {
    pub(crate) fn new(page: PageId, visit: u64, latest: Rc<Cell<u64>>) -> Self {
        Self { page, visit, latest }
    }

    pub fn page(&self) -> PageId {
        self.page
    }

    pub fn visit(&self) -> u64 {
        self.visit
    }

    /// False once a later navigation has started.
    pub fn is_current(&self) -> bool {
        self.latest.get() == self.visit
    }
}
