use std::fs::{self, OpenOptions};
use std::io::{self, stdin};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use keypace::app::App;
use keypace::app_dirs::AppDirs;
use keypace::config::{Config, ConfigStore, FileConfigStore};
use keypace::controller::Controller;
use keypace::metrics::Mode;
use keypace::passages::{Difficulty, PassageBook};
use keypace::runtime::{AppEventSource, CrosstermEventSource, Runner};
use keypace::store::{FileScoreStore, MemoryScoreStore, ScoreStore};
use keypace::timer::{IntervalTimer, TickSource};

const POLL_INTERVAL_MS: u64 = 100;

/// terminal typing speed test
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal typing speed test: type a passage against a 60 second clock or to the end of the passage, with live wpm and accuracy, a ghost pacer and a persisted personal best."
)]
pub struct Cli {
    /// test mode
    #[clap(short = 'm', long, value_enum)]
    mode: Option<Mode>,

    /// passage difficulty (easy, medium, hard, or any key in the passage file)
    #[clap(short = 'd', long)]
    difficulty: Option<String>,

    /// show a pacer moving at your personal best speed
    #[clap(short = 'g', long)]
    ghost: bool,

    /// passage file to use instead of the built-in passages
    #[clap(short = 'p', long)]
    passages: Option<PathBuf>,
}

impl Cli {
    /// Layer the command line over the saved preferences.
    fn merge(&self, mut config: Config) -> Config {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(difficulty) = &self.difficulty {
            config.difficulty = Difficulty::new(difficulty.as_str());
        }
        if self.ghost {
            config.ghost = true;
        }
        if let Some(path) = &self.passages {
            config.passages = Some(path.clone());
        }
        config
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("KEYPACE_LOG", "info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
}

fn load_book(config: &Config) -> Result<PassageBook, keypace::passages::PassageError> {
    match &config.passages {
        Some(path) => PassageBook::load(path),
        None => PassageBook::embedded(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    let config_store = FileConfigStore::new().ok();
    let saved = config_store
        .as_ref()
        .map(|store| store.load())
        .unwrap_or_default();
    let config = cli.merge(saved);
    log::info!(
        "starting: mode={} difficulty={} ghost={}",
        config.mode,
        config.difficulty,
        config.ghost
    );

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("failed to enter the alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(POLL_INTERVAL_MS),
    );
    let timer = IntervalTimer::every_second(runner.sender());

    let result = match FileScoreStore::new() {
        Ok(store) => run(&mut terminal, &runner, &config, store, timer),
        Err(e) => {
            log::warn!("best score will not be saved: {e}");
            run(&mut terminal, &runner, &config, MemoryScoreStore::new(), timer)
        }
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    let preferences = result?;
    if let Some(store) = config_store {
        if let Err(e) = store.save(&preferences) {
            log::warn!("could not save preferences: {e}");
        }
    }
    Ok(())
}

/// Run the event loop until the user quits; returns the selection to remember.
fn run<B, S, E>(
    terminal: &mut Terminal<B>,
    runner: &Runner<E>,
    config: &Config,
    store: S,
    timer: IntervalTimer,
) -> Result<Config>
where
    B: Backend,
    S: ScoreStore,
    E: AppEventSource,
{
    let mut app = build_app(config, store, timer);
    start_tui(terminal, runner, &mut app)?;
    Ok(app.preferences(config))
}

fn build_app<S: ScoreStore, T: TickSource>(config: &Config, store: S, timer: T) -> App<S, T> {
    match load_book(config) {
        Ok(book) => {
            let mut controller =
                Controller::new(book, store, timer, config.mode, config.difficulty.clone());
            controller.set_ghost(config.ghost);
            App::new(controller)
        }
        Err(e) => {
            log::error!("failed to load passages: {e}");
            App::load_failed(e.to_string())
        }
    }
}

fn start_tui<B, S, T, E>(
    terminal: &mut Terminal<B>,
    runner: &Runner<E>,
    app: &mut App<S, T>,
) -> Result<()>
where
    B: Backend,
    S: ScoreStore,
    T: TickSource,
    E: AppEventSource,
{
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    while !app.should_quit() {
        if let Some(event) = runner.step() {
            app.handle_event(event);
            terminal.draw(|f| f.render_widget(&*app, f.area()))?;
        }
    }
    Ok(())
}
