use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

mod app;
mod client;
mod config;
mod coordinator;
mod handler;
mod nav;
mod protocol;
mod session;
mod tui;
mod ui;
mod voice;

use app::App;
use config::Config;
use tui::EventHandler;

/// Log to a file next to the config; stderr owns the terminal.
fn init_tracing() {
    let Some(config_dir) = dirs::config_dir() else {
        return;
    };
    let log_dir = config_dir.join("concierge");
    if std::fs::create_dir_all(&log_dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("concierge.log"))
    else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::load().unwrap_or_else(|_| Config::new());

    let mut events = EventHandler::new();
    let mut app = App::new(&config, events.sender())?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}
