use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use visionary_core::{Config, Controller, FileKvStore, GenerationSettings, HistoryStore};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "visionary")]
#[command(about = "Generate images from text prompts with Gemini and browse them in a local gallery")]
struct Cli {
    /// Directory for history and logs (defaults to the platform data dir)
    #[arg(long, env = "VISIONARY_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::new(), Some(e)),
    };
    let data_dir = config.resolve_data_dir(cli.data_dir)?;
    init_logging(&data_dir)?;

    if let Some(e) = config_error {
        tracing::warn!(error = %e, "could not read config, using defaults");
    }
    tracing::info!(data_dir = %data_dir.display(), "starting visionary");

    let mut settings = GenerationSettings::default();
    if let Some(model) = &config.image_model {
        settings.model_id = model.clone();
    }

    let gemini = config.gemini_client();
    if gemini.is_none() {
        tracing::warn!("no Gemini API key found, generation is disabled");
    }

    let controller = Controller::new(HistoryStore::new(FileKvStore::new(&data_dir)), settings);
    let mut app = App::new(controller, gemini);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    result
}

async fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event);
        app.poll_tasks().await;
    }

    app.cancel_tasks();
    tracing::info!("shutting down");
    Ok(())
}

/// Log to a file; stdout and stderr belong to the terminal UI
fn init_logging(data_dir: &Path) -> Result<()> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;
    let log_path = data_dir.join("visionary.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}
