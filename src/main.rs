mod api;
mod config;
mod db;
mod models;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
};

use crate::api::{API_PATH, AppState};
use crate::config::Config;
use crate::ui::{
    api_client::{ClientApi, HttpClientApi},
    registration::RegistrationViewModel,
    registration_view::{RegistrationAction, RegistrationScreen, handle_input, render_registration},
};

#[derive(Debug, Parser)]
#[command(name = "client_registry")]
#[command(about = "Client registration endpoint and terminal front end")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the JSON endpoint backed by PostgreSQL
    Serve {
        /// Listen address, overrides BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
    },
    /// Open the registration form and client table
    Register {
        /// Endpoint URL, overrides API_URL
        #[arg(long)]
        api_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init()?;

    match cli.command {
        Command::Serve { bind } => serve(config, bind).await,
        Command::Register { api_url } => {
            let url = api_url.unwrap_or_else(|| config.api_url.clone());
            register(HttpClientApi::new(url)).await
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(config: Config, bind: Option<String>) -> Result<()> {
    init_tracing();

    let db = db::init(&config).await?;
    let state = AppState::new(Arc::new(db));

    let addr = bind.unwrap_or_else(|| config.bind_addr.clone());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, path = API_PATH, "client registry listening");

    axum::serve(listener, api::app(state)).await?;
    Ok(())
}

async fn register(api: HttpClientApi) -> Result<()> {
    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &api).await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        println!("Error: {}", err);
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, api: &dyn ClientApi) -> Result<()> {
    let mut view_model = RegistrationViewModel::new();
    let mut screen = RegistrationScreen::new();

    view_model.load(api, Instant::now()).await;

    loop {
        view_model.expire_toast(Instant::now());
        terminal.draw(|f| render_registration(f, &screen, &view_model))?;

        match handle_input(&mut screen, &mut view_model.form)? {
            Some(RegistrationAction::Quit) => break,
            Some(RegistrationAction::Submit) => {
                let today = Utc::now().date_naive();
                view_model.submit(api, today, Instant::now()).await;
            }
            Some(RegistrationAction::Reload) => {
                view_model.load(api, Instant::now()).await;
            }
            None => {}
        }
    }

    Ok(())
}
