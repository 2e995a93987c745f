mod app;
mod art;
mod catalog;
mod config;
mod constants;
mod debounce;
mod display;
mod featured;
mod history;
mod input;
mod media;
mod player;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use directories::ProjectDirs;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use app::App;
use catalog::CatalogClient;
use config::Config;
use constants::constants;
use display::CliDisplayMode;
use history::{FileStorage, MemoryStorage, Storage, WatchHistory};
use player::EmbedPlayer;

const FRAME_INTERVAL: Duration = Duration::from_millis(100);

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// TMDB API key (overrides prefs.toml)
  #[arg(long)]
  api_key: Option<String>,

  /// Response language, e.g. 'tr-TR' or 'en-US' (overrides prefs.toml)
  #[arg(short, long)]
  language: Option<String>,

  /// Backdrop art: 'auto', 'direct', 'ascii', or 'off' (default: auto-detect)
  #[arg(short, long, default_value = "auto")]
  display_mode: CliDisplayMode,

  /// Print shell completions and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<Shell>,
}

// --- Logging ---

/// Log to `sinema.log` in the data dir; the terminal belongs to the UI.
fn init_logging() -> Option<WorkerGuard> {
  let proj_dirs = ProjectDirs::from("", "", &constants().app_name)?;
  let log_dir = proj_dirs.data_dir();
  std::fs::create_dir_all(log_dir).ok()?;

  let appender = tracing_appender::rolling::never(log_dir, format!("{}.log", constants().app_name));
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
  Some(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    let mut cmd = Args::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
    return Ok(());
  }

  let _guard = init_logging();

  let config = Config::load();
  let api_key = config.resolve_api_key(args.api_key.as_deref());
  let language = config.resolve_language(args.language.as_deref());
  let catalog = CatalogClient::new(api_key, language).context("Failed to set up the TMDB client")?;

  let storage: Box<dyn Storage> = match FileStorage::open_default() {
    Some(storage) => Box::new(storage),
    None => {
      warn!("no data dir available, watch history will not persist");
      Box::new(MemoryStorage::default())
    }
  };
  let c = constants();
  let history = WatchHistory::load(storage, &c.history_key, c.history_capacity);
  let display_mode = display::resolve_display_mode(args.display_mode);
  let theme_index = theme::theme_index(config.theme_name.as_deref());

  info!(language = %catalog.language(), display = display_mode.label(), "starting");
  let mut app = App::new(catalog, EmbedPlayer::new(&c.player_base_url), history, display_mode, theme_index);

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, &mut app);
  app.teardown();
  ratatui::restore();
  result
}

fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
  app.start();

  loop {
    app.check_pending();
    let now = Instant::now();
    app.tick(now);

    terminal.draw(|frame| ui::ui(frame, app))?;

    // Wake in time for a pending debounce deadline.
    let timeout = app
      .debouncer
      .next_deadline()
      .map_or(FRAME_INTERVAL, |deadline| deadline.saturating_duration_since(now).min(FRAME_INTERVAL));

    if event::poll(timeout)? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_key_event(app, key),
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  info!("shutting down");
  Ok(())
}
