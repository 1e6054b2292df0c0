//! Text page controller.
//!
//! Only the game details page has real content; the other pages are plain
//! CRUD screens outside this client and print a heading.

#[cfg(test)]
#[path = "pages_test.rs"]
mod pages_test;

use async_trait::async_trait;
use client::nav::{PageContext, PageController, PageError, PageId};
use client::pages::game_details::{self, ChatAvailability, GameDetailsView};

#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalPages;

#[async_trait(?Send)]
impl PageController for TerminalPages {
    async fn mount(&self, ctx: &PageContext) -> Result<(), PageError> {
        let page = ctx.page();
        if page.requires_sign_in() && !ctx.app.is_signed_in() {
            return Err(PageError::SignInRequired);
        }
        match page {
            PageId::GameDetails(game_id) => {
                if let Some(view) = game_details::mount(ctx, game_id).await? {
                    println!("{}", render_game(&view));
                }
            }
            other => println!("{}", render_heading(other)),
        }
        Ok(())
    }

    fn show_error(&self, ctx: &PageContext, error: &PageError) {
        eprintln!("[{}] {error}", ctx.page());
    }
}

pub fn render_heading(page: PageId) -> String {
    let title = match page {
        PageId::Home => "Home".to_owned(),
        PageId::GamesList => "Games".to_owned(),
        PageId::GameDetails(id) => format!("Game {id}"),
        PageId::Courts => "Courts".to_owned(),
        PageId::CourtDetails(id) => format!("Court {id}"),
        PageId::ScheduleGame(Some(court)) => format!("Schedule a game at court {court}"),
        PageId::ScheduleGame(None) => "Schedule a game".to_owned(),
    };
    format!("== {title} ==")
}

pub fn render_game(view: &GameDetailsView) -> String {
    let game = &view.game;
    let mut lines = vec![render_heading(PageId::GameDetails(game.game_id))];
    if let (Some(date), Some(time)) = (&game.date, &game.time) {
        lines.push(format!("When:    {date} {time}"));
    }
    if let Some(level) = &game.skill_level {
        lines.push(format!("Level:   {level}"));
    }
    let players = game.participants.len();
    match game.max_players {
        Some(max) => lines.push(format!("Players: {players}/{max}")),
        None => lines.push(format!("Players: {players}")),
    }
    if let Some(status) = &game.status {
        lines.push(format!("Status:  {status}"));
    }

    let chat = match &view.chat {
        ChatAvailability::SignInRequired => "Sign in to view and send messages.".to_owned(),
        ChatAvailability::JoinRequired if view.is_full => "This game is full.".to_owned(),
        ChatAvailability::JoinRequired => "Join this game to chat with other players (/join).".to_owned(),
        ChatAvailability::Live => "Type a message and press enter to chat.".to_owned(),
        ChatAvailability::Unavailable(reason) => format!("Chat unavailable: {reason}"),
        ChatAvailability::Superseded => String::new(),
    };
    if !chat.is_empty() {
        lines.push(chat);
    }
    lines.join("\n")
}
