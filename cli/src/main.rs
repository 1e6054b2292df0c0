//! Terminal frontend for the pickleball scheduling client.
//!
//! Runs the shared client core on a single-threaded runtime: pages print to
//! stdout, chat updates stream to stdout as they arrive, and stdin lines are
//! either commands (`/go`, `/join`, ...) or chat messages.

mod console;
mod gateway;
mod pages;
mod socket;

use std::rc::Rc;

use clap::Parser;
use client::app::App;
use client::chat::{ChatUpdate, SendOutcome, pump_channel_events};
use client::config::{ClientConfig, DEFAULT_CHAT_PORT};
use client::nav::PageId;
use client::state::auth::{AppState, AuthToken};
use futures::StreamExt;
use futures::channel::mpsc::UnboundedReceiver;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::console::{Command, HELP, parse_command, render_update};
use crate::gateway::HttpGateway;
use crate::pages::TerminalPages;
use crate::socket::WsConnector;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("failed to install logging: {0}")]
    Logging(String),
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "pickleball", about = "Pickleball games and live game chat from the terminal")]
struct Cli {
    #[arg(long, env = "PICKLEBALL_BASE_URL", default_value = "http://127.0.0.1:5000")]
    base_url: String,

    /// Chat websocket URL; derived from the base URL host when omitted.
    #[arg(long, env = "PICKLEBALL_CHAT_URL")]
    chat_url: Option<String>,

    #[arg(long, env = "PICKLEBALL_CHAT_PORT", default_value_t = DEFAULT_CHAT_PORT)]
    chat_port: u16,

    /// Bearer token of a signed-in user.
    #[arg(long, env = "PICKLEBALL_TOKEN")]
    token: Option<String>,

    /// Open this game's page on start.
    #[arg(long, env = "PICKLEBALL_GAME")]
    game: Option<i64>,
}

impl Cli {
    fn client_config(&self) -> Result<ClientConfig, CliError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(CliError::InvalidBaseUrl(self.base_url.clone()));
        }
        Ok(ClientConfig {
            chat_url: self.chat_url.clone(),
            chat_port: self.chat_port,
            ..ClientConfig::for_origin(&self.base_url)
        })
    }
}

fn init_logging() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    init_logging()?;
    let cli = Cli::parse();
    let config = cli.client_config()?;

    tokio::task::LocalSet::new().run_until(run(cli, config)).await
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), CliError> {
    let (app, events) = App::new(
        &config,
        &cli.base_url,
        Rc::new(HttpGateway::new(config.clone())),
        Rc::new(WsConnector),
        Rc::new(TerminalPages),
    );
    tokio::task::spawn_local(pump_channel_events(app.chat().clone(), events));

    if let Some(token) = cli.token {
        match app.restore_session(AuthToken::new(token)).await {
            Ok(credentials) => info!(user_id = credentials.user_id, "session restored"),
            Err(err) => eprintln!("sign-in failed: {err}"),
        }
    }
    tokio::task::spawn_local(print_updates(app.state().clone(), app.chat().subscribe()));

    match cli.game {
        Some(game_id) => app.navigate_to("game-details", Some(game_id)).await,
        None => app.navigate_to("home", None).await,
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => dispatch(&app, command).await,
            Ok(None) => {}
            Err(err) => eprintln!("{err}"),
        }
    }

    app.chat().close();
    Ok(())
}

async fn dispatch(app: &App, command: Command) {
    let current_game = match app.nav().current() {
        PageId::GameDetails(game_id) => Some(game_id),
        _ => None,
    };
    match command {
        Command::Go { tag, id } => {
            app.navigate_to(&tag, id).await;
        }
        Command::Join(game) => {
            let Some(game_id) = game.or(current_game) else {
                eprintln!("open a game first: /go game-details <id>");
                return;
            };
            if let Err(err) = app.join_game(game_id).await {
                eprintln!("Error joining game: {err}");
            }
        }
        Command::Leave(game) => {
            let Some(game_id) = game.or(current_game) else {
                eprintln!("open a game first: /go game-details <id>");
                return;
            };
            if let Err(err) = app.leave_game(game_id).await {
                eprintln!("Error leaving game: {err}");
            }
        }
        Command::SignOut => {
            app.sign_out().await;
        }
        Command::Help => println!("{HELP}"),
        Command::Say(text) => match app.send_chat(&text).await {
            SendOutcome::Unbound => eprintln!("open a game you have joined to chat"),
            SendOutcome::Fallback(_) => warn!("chat offline; message sent over http"),
            SendOutcome::Empty | SendOutcome::Transmitted => {}
        },
        Command::Quit => {}
    }
}

async fn print_updates(state: AppState, mut updates: UnboundedReceiver<ChatUpdate>) {
    while let Some(update) = updates.next().await {
        for line in render_update(&state, &update) {
            println!("{line}");
        }
    }
}
