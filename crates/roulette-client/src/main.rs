// crates/roulette-client/src/main.rs

mod app;
mod components;
mod network;
mod session;
mod types;
mod ui;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::{io, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use roulette_core::Category;
use roulette_protocol::InboundAction;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::{App, Field, InputMode};
use crate::network::ServerConnection;
use crate::types::{ClientConfig, NetworkEvent};

#[derive(Parser)]
#[clap(name = "roulette-client")]
#[clap(about = "Terminal table for the multiplayer roulette server")]
struct Cli {
    /// Server address
    #[clap(short, long, default_value = "127.0.0.1:9000")]
    server: String,

    /// Display name for a fresh session
    #[clap(short, long, default_value = "Player")]
    name: String,

    /// Where to remember the identity between runs
    #[clap(long, default_value = ".roulette-session.toml")]
    session_file: PathBuf,

    /// Stake the bet form starts with
    #[clap(long, default_value_t = 100)]
    stake: u64,

    /// Write debug logs to this file (the terminal belongs to the UI)
    #[clap(short, long)]
    debug: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if let Some(path) = &cli.debug {
        let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    }

    let config = ClientConfig {
        server_addr: cli.server,
        name: cli.name,
        session_file: cli.session_file,
        default_stake: cli.stake,
    };
    let saved = match session::load(&config.session_file) {
        Ok(saved) => saved,
        Err(e) => {
            warn!("Ignoring unreadable session file: {}", e);
            Default::default()
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let app = App::new(&config, saved);
    let res = run_app(&mut terminal, app, &config.server_addr).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App, server_addr: &str) -> Result<()> {
    let (tx_to_network, rx_from_app) = mpsc::unbounded_channel::<InboundAction>();
    let (tx_to_app, mut rx_from_network) = mpsc::unbounded_channel::<NetworkEvent>();

    app.set_network_sender(tx_to_network);

    info!("Starting network task for {}", server_addr);
    let network_handle = tokio::spawn(ServerConnection::new(server_addr, tx_to_app).run(rx_from_app));

    loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(&mut app, key.code);
                }
            }
        }

        while let Ok(event) = rx_from_network.try_recv() {
            app.handle_network_event(event);
        }

        if app.should_quit {
            break;
        }
    }

    network_handle.abort();
    Ok(())
}

fn handle_key(app: &mut App, code: KeyCode) {
    if app.show_help {
        if matches!(code, KeyCode::F(1) | KeyCode::Esc | KeyCode::Char('?')) {
            app.toggle_help();
        }
        return;
    }

    match app.input_mode {
        InputMode::Normal => match code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                app.should_quit = true;
            }
            KeyCode::F(1) | KeyCode::Char('?') => {
                app.toggle_help();
            }

            // Bet form
            KeyCode::Enter | KeyCode::Char(' ') => {
                app.place_bet();
            }
            KeyCode::Tab => {
                app.next_category();
            }
            KeyCode::Char('e') | KeyCode::Char('E') => {
                app.start_editing(Field::Selector);
            }
            KeyCode::Char('t') | KeyCode::Char('T') => {
                app.start_editing(Field::Stake);
            }
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => {
                app.adjust_stake(true);
            }
            KeyCode::Char('-') | KeyCode::Down => {
                app.adjust_stake(false);
            }

            // Quick picks
            KeyCode::Char('r') | KeyCode::Char('R') => app.quick_select(Category::Color, "red"),
            KeyCode::Char('k') | KeyCode::Char('K') => app.quick_select(Category::Color, "black"),
            KeyCode::Char('v') | KeyCode::Char('V') => app.quick_select(Category::Parity, "even"),
            KeyCode::Char('o') | KeyCode::Char('O') => app.quick_select(Category::Parity, "odd"),
            KeyCode::Char('1') => app.quick_select(Category::Dozen, "first"),
            KeyCode::Char('2') => app.quick_select(Category::Dozen, "second"),
            KeyCode::Char('3') => app.quick_select(Category::Dozen, "third"),

            _ => {}
        },

        InputMode::Editing(_) => match code {
            KeyCode::Enter => {
                app.finish_input();
            }
            KeyCode::Esc => {
                app.cancel_input();
            }
            KeyCode::Backspace => {
                app.delete_char();
            }
            KeyCode::Char(c) => {
                app.enter_char(c);
            }
            _ => {}
        },
    }
}
