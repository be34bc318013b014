use anyhow::{Context, Result};
use clap::Parser;
use extsorter::cli::{Cli, run_cli};
use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// File name of the log written beside the settings file.
const LOG_FILE_NAME: &str = "extsorter.log";

fn main() {
    let cli = Cli::parse();
    setup_tracing(&cli.settings_path(), cli.verbose);

    if let Err(e) = run(&cli) {
        error!("Session ended with an error: {:#}", e);
        eprintln!("Exception caught\nError: {:?}", e);

        if io::stdin().is_terminal() {
            eprintln!("Press <Enter> to continue.... ");
            let mut line = String::new();
            let _ = io::stdin().read_line(&mut line);
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    info!("extsorter {} starting", env!("CARGO_PKG_VERSION"));
    let show_progress = io::stdout().is_terminal();
    run_cli(cli, show_progress).with_context(|| {
        format!(
            "while running with settings {}",
            cli.settings_path().display()
        )
    })
}

/// Sends log output to a file beside the settings, keeping the console for
/// the menu. Falls back to warnings on stderr when the file cannot be opened.
fn setup_tracing(settings_path: &Path, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_path = settings_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(LOG_FILE_NAME);
    let file = OpenOptions::new().create(true).append(true).open(&log_path);

    match file {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_env_filter(filter)
                .init();
            info!("Logging to {:?}", log_path);
        }
        Err(_) => {
            tracing_subscriber::fmt()
                .with_writer(io::stderr)
                .with_env_filter(EnvFilter::new("warn"))
                .init();
        }
    }
}
