//! Terminal input commands and transcript output.
//!
//! Lines starting with `/` are commands; anything else is a chat message for
//! the current game.

#[cfg(test)]
#[path = "console_test.rs"]
mod console_test;

use client::chat::ChatUpdate;
use client::chat::render::{EntryKind, RenderOp, RenderedEntry, TranscriptRenderer};
use client::state::auth::AppState;
use frames::GameId;

pub const HELP: &str = "\
commands:
  /go <page> [id]   home, games, game-details <id>, courts, court-details <id>, schedule-game [court]
  /join [game]      join the current (or given) game
  /leave [game]     leave the current (or given) game
  /signout          forget the signed-in user
  /help             show this help
  /quit             exit
anything else is sent to the current game's chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Go { tag: String, id: Option<i64> },
    Join(Option<GameId>),
    Leave(Option<GameId>),
    SignOut,
    Help,
    Quit,
    Say(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command `/{0}`; try /help")]
    Unknown(String),
    #[error("`/go` needs a page")]
    MissingPage,
    #[error("invalid id `{0}`")]
    InvalidId(String),
}

/// Parse one input line. Blank lines yield `Ok(None)`.
///
/// # Errors
///
/// Returns a [`CommandError`] for unknown commands or malformed ids.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Say(line.to_owned())));
    };

    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let arg = words.next();
    let command = match name {
        "go" => {
            let tag = arg.ok_or(CommandError::MissingPage)?;
            Command::Go {
                tag: tag.to_owned(),
                id: parse_id(words.next())?,
            }
        }
        "join" => Command::Join(parse_id(arg)?),
        "leave" => Command::Leave(parse_id(arg)?),
        "signout" => Command::SignOut,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_owned())),
    };
    Ok(Some(command))
}

fn parse_id(word: Option<&str>) -> Result<Option<i64>, CommandError> {
    word.map(|w| w.parse().map_err(|_| CommandError::InvalidId(w.to_owned())))
        .transpose()
}

pub fn format_entry(entry: &RenderedEntry) -> String {
    match entry.kind {
        EntryKind::Sent => format!("[{}] {} (you): {}", entry.time, entry.author, entry.body),
        EntryKind::Received => format!("[{}] {}: {}", entry.time, entry.author, entry.body),
        EntryKind::System => format!("* {}", entry.body),
    }
}

/// Lines to print for one render operation.
pub fn format_op(op: &RenderOp) -> Vec<String> {
    match op {
        RenderOp::Replace { entries, placeholder } => {
            let mut lines = vec!["--- chat ---".to_owned()];
            lines.extend(entries.iter().map(format_entry));
            lines.extend(placeholder.map(str::to_owned));
            lines
        }
        RenderOp::Append(entry) => vec![format_entry(entry)],
        RenderOp::Status { label, .. } if label.is_empty() => Vec::new(),
        RenderOp::Status { label, .. } => vec![format!("-- {label} --")],
        RenderOp::Error(message) => vec![format!("! {message}")],
    }
}

/// Lines for one chat update, as seen by whoever is signed in right now.
pub fn render_update(state: &AppState, update: &ChatUpdate) -> Vec<String> {
    let viewer = state.credentials().map(|c| c.user_id);
    format_op(&TranscriptRenderer::new(viewer).apply(update))
}
