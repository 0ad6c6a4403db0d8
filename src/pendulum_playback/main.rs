// ------------------------------------------------------------
// Pendulum trace playback
// ------------------------------------------------------------
// Reads a trace written by the pendulum model and either
//   - animates the pendulum arm and bob (plot_animation), or
//   - plots angle vs time with optional theory and extremum overlays
//     (plot_alpha / calculate_theoretical).
//
// Usage:
//   pendulum_playback data/model.txt --config playback.yaml -v
//
// Close the window or press Escape to finish; Ctrl-C aborts.
// ------------------------------------------------------------

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pendulum_playback::render::{show_curves, PendulumWindow};
use pendulum_playback::{
    load_trace, run_animation, CurvePlan, PlaybackConfig, PlaybackEngine, RenderMode, RunOutcome,
};

// Conventional status for a SIGINT-terminated process.
const EXIT_INTERRUPTED: u8 = 130;

/// Play back or plot a pre-computed pendulum trace
#[derive(Parser, Debug)]
#[command(name = "pendulum_playback")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Trace file written by the pendulum model
    trace: PathBuf,

    /// YAML configuration; missing keys take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print debug logs to the console
    #[arg(short, long)]
    verbose: bool,

    /// Also write debug logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

// ------------------------------------------------------------
// Logging
// ------------------------------------------------------------
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    // Console: RUST_LOG, or warn by default; --verbose forces debug.
    let console_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_filter(console_filter);

    let file = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry().with(console).with(file).init();
    Ok(())
}

// ------------------------------------------------------------
// Run
// ------------------------------------------------------------
fn run(cli: &Cli, stop: &AtomicBool) -> Result<RunOutcome> {
    let config = match &cli.config {
        Some(path) => PlaybackConfig::load(path)
            .with_context(|| format!("Invalid configuration {}", path.display()))?,
        None => PlaybackConfig::default(),
    };
    let mode = config.render_mode()?;
    info!(?mode, render_dt = config.render_dt, "configuration loaded");

    let trace = load_trace(&cli.trace, config.trace_flags())?;

    match mode {
        RenderMode::Animation => {
            let settings = config.animation_settings();
            let mut window = PendulumWindow::open(
                config.figure(),
                trace.header.pendulum_length,
                settings.anchor,
            )?;
            let frames = PlaybackEngine::new(&trace, settings).into_frames();
            let stdout = io::stdout();
            run_animation(frames, &mut window, stop, &mut stdout.lock())
        }
        RenderMode::Curves => {
            let plan = CurvePlan::build(&trace, config.curve_selection())?;
            show_curves(&plan, config.figure(), stop)
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_file.as_deref())?;

    // Ctrl-C only raises the flag; render loops check it every iteration.
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))
            .context("Failed to install Ctrl-C handler")?;
    }

    let outcome = run(&cli, &stop).inspect_err(|e| error!("{e:#}"))?;

    match outcome {
        RunOutcome::Interrupted => {
            warn!("interrupted by operator");
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
        RunOutcome::Completed | RunOutcome::Closed => {
            info!(?outcome, "done");
            Ok(ExitCode::SUCCESS)
        }
    }
}
