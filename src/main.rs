use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

use formrenamer::event_source::KeyboardEventSource;
use formrenamer::panic_handler::initialize_panic_handler;
use formrenamer::{App, run_app_with_event_source, settings};

/// Overlay PDF form fields on rendered pages and rename them
#[derive(Parser, Debug)]
#[command(name = "formrenamer")]
#[command(version, about, long_about = None)]
struct Args {
    /// PDF form to open
    path: Option<PathBuf>,

    /// Initial zoom (0.5 to 3.0)
    #[arg(long)]
    scale: Option<f32>,

    /// Directory for saved documents, guides and snapshots
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Log file; the terminal is taken by the UI
    #[arg(long, default_value = "formrenamer.log")]
    log_file: PathBuf,

    /// Render worker threads
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_config = ConfigBuilder::new()
        .add_filter_ignore_str("lopdf")
        .build();
    WriteLogger::init(
        LevelFilter::Debug,
        log_config,
        File::create(&args.log_file)
            .with_context(|| format!("cannot create log file {:?}", args.log_file))?,
    )?;

    info!("Starting formrenamer");

    settings::load_settings();
    if let Some(scale) = args.scale {
        settings::set_default_scale(scale);
    }
    if let Some(dir) = args.output_dir {
        settings::set_output_dir(dir);
    }
    if let Some(workers) = args.workers {
        settings::set_render_workers(workers);
    }

    let mut app = App::from_settings();
    if let Some(path) = &args.path {
        app.open_path(path)
            .with_context(|| format!("cannot read {path:?}"))?;
    }

    initialize_panic_handler();

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app_with_event_source(&mut terminal, &mut app, &mut KeyboardEventSource);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("Application error: {err:?}");
        println!("{err:?}");
    }

    for path in &app.last_written {
        println!("wrote {}", path.display());
    }

    info!("Shutting down formrenamer");
    Ok(())
}
