// ============================
// client-bin/src/main.rs
// ============================
//! Terminal front end for the Game of Three client.
mod commands;
mod console;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use gameofthree_client::config::Settings;
use gameofthree_client::display::DisplayIntent;
use gameofthree_client::session::Mode;
use gameofthree_client::GameClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::commands::{parse_command, Command, HELP};

#[derive(Parser, Debug)]
#[command(name = "gameofthree", version, about = "Play the Game of Three against another player")]
struct Args {
    /// WebSocket URL of the game server
    #[arg(long)]
    url: Option<String>,
    /// Player name
    #[arg(short, long)]
    username: Option<String>,
    /// manual or auto
    #[arg(short, long)]
    mode: Option<Mode>,
    /// Pause before automatic actions, in milliseconds
    #[arg(long)]
    move_delay_ms: Option<u64>,
    /// Configuration file (defaults to ./gameofthree.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn apply(self, settings: &mut Settings) {
        if let Some(url) = self.url {
            settings.server_url = url;
        }
        if let Some(username) = self.username {
            settings.username = Some(username);
        }
        if let Some(mode) = self.mode {
            settings.mode = mode;
        }
        if let Some(delay) = self.move_delay_ms {
            settings.move_delay_ms = delay;
        }
        settings.log_json |= self.log_json;
    }
}

/// `RUST_LOG` wins over the configured level; logs go to stderr
fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.to_ascii_lowercase()));
    let json = settings.log_json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    args.apply(&mut settings);

    init_tracing(&settings);

    let (display_tx, mut display) = mpsc::unbounded_channel();
    let client = match GameClient::connect(&settings, display_tx).await {
        Ok(client) => client,
        Err(e) => {
            error!(code = e.error_code(), "connection failed: {e}");
            eprintln!("! {}", e.user_message());
            return Err(e.into());
        },
    };
    info!(mode = %settings.mode, "session started, type `help` for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            intent = display.recv() => {
                let Some(intent) = intent else { break };
                if let Some(line) = console::render(&intent) {
                    println!("{line}");
                }
                if intent == DisplayIntent::Connected(false) {
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => run_command(&client, command).await,
                    Ok(None) => {},
                    Err(e) => println!("! {e}"),
                }
            }
        }
    }

    client.disconnect().await;
    while let Ok(intent) = display.try_recv() {
        if let Some(line) = console::render(&intent) {
            println!("{line}");
        }
    }
    Ok(())
}

async fn run_command(client: &GameClient, command: Command) {
    let session = client.session();
    // rejected input is already reported through the display channel
    let result = match command {
        Command::Start => session.start(),
        Command::SetMode(mode) => {
            println!("* mode: {mode}");
            session.set_mode(mode)
        },
        Command::Number(input) => session.submit_starting_number(input).await,
        Command::Move(adjustment) => session.submit_manual_move(adjustment).await,
        Command::Help => {
            println!("{HELP}");
            Ok(())
        },
        Command::Quit => Ok(()),
    };
    if let Err(e) = result {
        debug!(code = e.error_code(), "command not applied: {e}");
        if !e.is_invalid_input() {
            println!("! {}", e.user_message());
        }
    }
}
