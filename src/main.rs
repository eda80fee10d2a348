mod cli;
mod map_draw;
mod state;
mod ui;

use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use library_atlas::sync::SyncController;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{fs::OpenOptions, io, path::Path, sync::Mutex, time::Duration};
use tracing::{error, info};

use cli::Args;
use map_draw::MapView;
use state::AppState;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenv::dotenv().ok();
    let args = Args::parse();
    setup_tracing(&args.log_file, args.verbose);

    let mut state = load_state(&args);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut state);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

/// Failed loads leave a static error screen instead of aborting.
fn load_state(args: &Args) -> AppState {
    let loaded = args.data_source().and_then(|source| source.load());
    match loaded {
        Ok(data) => {
            let map = MapView::new(&data.boundaries);
            info!(features = map.feature_count(), "map ready");
            AppState::ready(SyncController::new(data.index), map)
        }
        Err(e) => {
            error!(error = %e, "data unavailable");
            AppState::unavailable(e.to_string())
        }
    }
}

fn run<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    state: &mut AppState,
) -> color_eyre::Result<()> {
    loop {
        if state.take_redraw() {
            terminal.draw(|f| ui::draw(f, state))?;
        }

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(KeyEvent { code, kind: KeyEventKind::Press, .. }) => {
                    if state.handle_input(code) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => state.handle_mouse(mouse),
                Event::Resize(..) => state.mark_dirty(),
                _ => {}
            }
        }
    }
}

/// Logs go to a file; stdout belongs to the UI.
fn setup_tracing(log_file: &Path, verbose: bool) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let Ok(file) = OpenOptions::new().create(true).append(true).open(log_file) else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("library_atlas=debug,info")
        } else {
            EnvFilter::new("library_atlas=info,warn")
        }
    });
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry().with(filter).with(file_layer).init();
    info!(path = %log_file.display(), "tracing initialized");
}
