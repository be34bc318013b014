//! Command-line interface module for extsorter.
//!
//! This module handles:
//! - Command-line argument parsing
//! - The sort session shared by the one-shot run and the interactive menu
//! - Statistics, failed-move and unrecognised-extension reporting
//! - Saving settings after changes

use crate::config::{ConfigError, Settings};
use crate::file_category::{derive_subdirectories, extension_label};
use crate::file_organizer::{DestinationOrganizer, OrganizeError, SortOutcome, SortSummary};
use crate::output::{OutputFormatter, create_progress_bar, value};
use crate::resolution::resolve_unrecognised;
use crate::scanner::{ScanError, SourceScanner};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Sort a folder's files into category subfolders by extension.
#[derive(Debug, Parser)]
#[command(name = "extsorter", version, about)]
pub struct Cli {
    /// Settings file (defaults to settings.json next to the executable)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write debug-level entries to the log file
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// What to do once settings are loaded.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum Command {
    /// Start the interactive menu (the default)
    Menu,
    /// Sort once, report, and exit
    Run {
        /// Do not ask for categories for unrecognised extensions
        #[arg(long)]
        no_resolve: bool,
    },
}

impl Cli {
    /// The settings file to use.
    pub fn settings_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Settings::default_path)
    }
}

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Organize(#[from] OrganizeError),
    #[error("Console I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Runs the command in `cli` against the console.
pub fn run_cli(cli: &Cli, show_progress: bool) -> Result<(), SessionError> {
    let settings_path = cli.settings_path();
    let settings = Settings::load(&settings_path);
    info!("Loaded settings from {}", settings_path.display());

    let stdin = io::stdin();
    let mut session = Session::new(
        settings,
        settings_path,
        stdin.lock(),
        OutputFormatter::stdout(),
    )
    .with_progress(show_progress);

    match cli.command.unwrap_or(Command::Menu) {
        Command::Menu => crate::menu::run_menu(&mut session),
        Command::Run { no_resolve } => session.run_once(!no_resolve),
    }
}

/// Settings plus the organizer state of one program run.
///
/// Owns the console input and output so every step can be driven from
/// in-memory buffers.
pub struct Session<R: BufRead, W: Write> {
    settings: Settings,
    settings_path: PathBuf,
    organizer: Option<DestinationOrganizer>,
    last_summary: Option<SortSummary>,
    pub(crate) input: R,
    pub(crate) out: OutputFormatter<W>,
    show_progress: bool,
}

impl<R: BufRead, W: Write> Session<R, W> {
    /// Creates a session that saves settings to `settings_path`.
    pub fn new(settings: Settings, settings_path: PathBuf, input: R, out: OutputFormatter<W>) -> Self {
        Self {
            settings,
            settings_path,
            organizer: None,
            last_summary: None,
            input,
            out,
            show_progress: false,
        }
    }

    /// Shows a progress bar while files are moved.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Mutable settings; call [`save_settings`](Self::save_settings) afterwards.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Where settings are saved.
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// The organizer, once a sort has been started.
    pub fn organizer(&self) -> Option<&DestinationOrganizer> {
        self.organizer.as_ref()
    }

    /// Summary of the most recent sort.
    pub fn last_summary(&self) -> Option<&SortSummary> {
        self.last_summary.as_ref()
    }

    /// Consumes the session, returning the output writer.
    pub fn into_output(self) -> W {
        self.out.into_inner()
    }

    /// Saves settings. A failure is reported and logged, not returned.
    pub fn save_settings(&mut self) -> io::Result<bool> {
        match self.settings.save(&self.settings_path) {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("{}", e);
                self.out.error(&e.to_string())?;
                Ok(false)
            }
        }
    }

    /// Reads one trimmed, non-empty line, re-prompting on empty input.
    ///
    /// Returns `None` when input has ended.
    pub fn read_value(&mut self) -> io::Result<Option<String>> {
        loop {
            self.out.input_marker("Enter value: ")?;
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                self.out.error("Null or empty values not accepted.")?;
            } else {
                return Ok(Some(trimmed.to_string()));
            }
        }
    }

    /// Takes the organizer for the current settings, creating it on first
    /// use or when the destination has changed.
    fn take_organizer(&mut self) -> Result<DestinationOrganizer, SessionError> {
        match self.organizer.take() {
            Some(mut organizer) if organizer.root() == self.settings.destination_path => {
                organizer.update_rules(&self.settings);
                Ok(organizer)
            }
            previous => {
                if previous.is_some() {
                    info!("Destination changed, starting a new organizer");
                }
                self.out.step(&format!(
                    "Set destination directory to {}... ",
                    value(self.settings.destination_path.display())
                ))?;
                Ok(DestinationOrganizer::new(&self.settings)?)
            }
        }
    }

    /// Scans the source, bootstraps subdirectories and moves every candidate.
    ///
    /// Returns `None` when there was nothing to sort.
    ///
    /// # Errors
    ///
    /// Fails if the source or destination is missing or a subdirectory
    /// cannot be created. Individual move failures are recorded instead.
    pub fn sort(&mut self) -> Result<Option<SortSummary>, SessionError> {
        self.out.step(&format!(
            "Retrieving source files from {}... ",
            value(self.settings.source_path.display())
        ))?;
        let files = SourceScanner::from_settings(&self.settings)?.scan()?;
        self.out
            .success(&format!("Retrieved {} source files", value(files.len())))?;

        let mut organizer = self.take_organizer()?;
        let result = self.sort_into(&mut organizer, &files);
        self.organizer = Some(organizer);

        let summary = result?;
        if let Some(summary) = &summary {
            info!(
                "Sort finished: {} moved, {} skipped, {} failed",
                summary.moved, summary.skipped, summary.failed
            );
            self.last_summary = Some(summary.clone());
        }
        Ok(summary)
    }

    fn sort_into(
        &mut self,
        organizer: &mut DestinationOrganizer,
        files: &[PathBuf],
    ) -> Result<Option<SortSummary>, SessionError> {
        self.out
            .step("Checking for the subdirectories in destination directory... ")?;
        organizer.ensure_subdirectories()?;
        for name in organizer.subdirectories() {
            self.out.success(&format!("Checked: {}", value(name)))?;
        }

        self.out.step("Sorting files... ")?;
        if files.is_empty() {
            self.out.warning("No files to sort")?;
            return Ok(None);
        }

        let pb = create_progress_bar(files.len() as u64, self.show_progress);
        let out = &mut self.out;
        let mut write_error = None;

        let summary = organizer.sort_files_with(files, |file, outcome| {
            let written = pb.suspend(|| match outcome {
                SortOutcome::Moved { category, .. } => out.success(&format!(
                    "Sorted {} into {}",
                    value(file.display()),
                    value(category)
                )),
                SortOutcome::Skipped { extension } => out.warning(&format!(
                    "Skipped file with excluded extension ({}): {}",
                    value(extension_label(extension)),
                    value(file.display())
                )),
                SortOutcome::Failed { category, reason } => out.error(&format!(
                    "Error moving file {} into {}: {}",
                    file.display(),
                    category,
                    reason
                )),
            });
            if let Err(e) = written {
                write_error.get_or_insert(e);
            }
            pb.inc(1);
        });
        pb.finish_and_clear();

        match write_error {
            Some(e) => Err(e.into()),
            None => Ok(Some(summary)),
        }
    }

    /// Prints the statistics of the latest run.
    pub fn show_statistics(&mut self) -> io::Result<()> {
        self.out
            .step("Showing statistics from the whole operation... ")?;
        match &self.organizer {
            Some(organizer) => {
                if let Some(summary) = &self.last_summary {
                    self.out.plain(&format!(
                        "\tRun started {}",
                        value(summary.started_at.format("%Y-%m-%d %H:%M:%S"))
                    ))?;
                }
                self.out.statistics_table(&organizer.statistics())
            }
            None => self.out.warning("Nothing has been sorted yet"),
        }
    }

    /// Prints every failed move. Returns whether there were any.
    pub fn report_failed_moves(&mut self) -> io::Result<bool> {
        self.out.step("Checking files that failed to move... ")?;
        let Some(organizer) = &self.organizer else {
            self.out.warning("Nothing has been sorted yet")?;
            return Ok(false);
        };

        if !organizer.check_failed_moves() {
            self.out.success("All files successfully moved")?;
            return Ok(false);
        }
        for (file, reason) in organizer.failed_moves() {
            self.out.plain(&format!(
                "\tFile: {}\n\tReason for failure: {}",
                value(file.display()),
                value(reason)
            ))?;
        }
        Ok(true)
    }

    /// Prints the unrecognised extensions.
    pub fn show_unrecognised(&mut self) -> io::Result<()> {
        let extensions = self
            .organizer
            .as_ref()
            .map(|o| o.unrecognised_extensions().clone())
            .unwrap_or_default();

        if extensions.is_empty() {
            return self.out.warning("No unrecognised file extensions to show");
        }
        self.out.success("Unrecognised file extensions: ")?;
        for extension in &extensions {
            self.out.plain(&format!("  - {}", value(extension_label(extension))))?;
        }
        Ok(())
    }

    /// Runs the resolution dialog, merges the answers into the settings,
    /// saves them, and forgets the extensions whose mapping was stored.
    ///
    /// Returns how many extensions were assigned.
    pub fn resolve_unrecognised(&mut self) -> io::Result<usize> {
        let unrecognised = self
            .organizer
            .as_ref()
            .map(|o| o.unrecognised_extensions().clone())
            .unwrap_or_default();
        let subdirectories = derive_subdirectories(&self.settings.extension_categories);

        let assigned =
            resolve_unrecognised(&unrecognised, &subdirectories, &mut self.input, &mut self.out)?;
        if assigned.is_empty() {
            return Ok(0);
        }

        let merged = self.settings.merge_extension_categories(assigned.clone());
        let resolved: Vec<String> = assigned
            .into_iter()
            .filter(|(extension, category)| {
                self.settings.category_for(extension) == Some(category.as_str())
            })
            .map(|(extension, _)| extension)
            .collect();
        if let Some(organizer) = self.organizer.as_mut() {
            organizer.forget_unrecognised(&resolved);
        }
        self.save_settings()?;
        Ok(merged)
    }

    /// Sort, report failures, resolve unrecognised extensions, show
    /// statistics and save: the whole non-interactive pass.
    pub fn run_once(&mut self, resolve: bool) -> Result<(), SessionError> {
        self.sort()?;
        self.report_failed_moves()?;
        if resolve {
            self.resolve_unrecognised()?;
        }
        self.show_statistics()?;
        self.save_settings()?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn session(
        source: &Path,
        dest: &Path,
        settings_dir: &Path,
        answers: &str,
    ) -> Session<Cursor<Vec<u8>>, Vec<u8>> {
        let settings = Settings {
            source_path: source.to_path_buf(),
            destination_path: dest.to_path_buf(),
            excluded_extensions: [".tmp".to_string()].into(),
            extension_categories: [(".pdf".to_string(), "Documents".to_string())].into(),
        };
        Session::new(
            settings,
            settings_dir.join("settings.json"),
            Cursor::new(answers.as_bytes().to_vec()),
            OutputFormatter::new(Vec::new()),
        )
    }

    #[test]
    fn test_cli_parses_run_subcommand() {
        let cli = Cli::parse_from(["extsorter", "--config", "/tmp/s.json", "run", "--no-resolve"]);
        assert_eq!(cli.settings_path(), PathBuf::from("/tmp/s.json"));
        assert!(matches!(cli.command, Some(Command::Run { no_resolve: true })));
    }

    #[test]
    fn test_cli_defaults_to_menu() {
        let cli = Cli::parse_from(["extsorter"]);
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_sort_with_empty_source_reports_nothing_to_sort() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let mut session = session(source.path(), dest.path(), dest.path(), "");

        assert!(session.sort().unwrap().is_none());
        // Bootstrap still ran
        assert!(dest.path().join("Other").is_dir());
        let text = String::from_utf8(session.into_output()).unwrap();
        assert!(text.contains("No files to sort"));
    }

    #[test]
    fn test_sort_missing_source_is_an_error() {
        let dest = TempDir::new().unwrap();
        let mut session = session(Path::new("/non/existent/src"), dest.path(), dest.path(), "");
        assert!(matches!(session.sort(), Err(SessionError::Scan(_))));
    }

    #[test]
    fn test_run_once_resolves_and_saves() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let config_dir = TempDir::new().unwrap();
        fs::write(source.path().join("b.xyz"), "b").unwrap();

        // Subdirectories: Documents=0, Other=1
        let mut session = session(source.path(), dest.path(), config_dir.path(), "0\n");
        session.run_once(true).unwrap();

        assert!(dest.path().join("Other").join("b.xyz").exists());
        assert_eq!(session.settings().category_for(".xyz"), Some("Documents"));
        assert!(
            session
                .organizer()
                .unwrap()
                .unrecognised_extensions()
                .is_empty()
        );

        let saved = Settings::load(&config_dir.path().join("settings.json"));
        assert_eq!(saved.category_for(".xyz"), Some("Documents"));
    }

    #[test]
    fn test_report_failed_moves_before_sort() {
        let dest = TempDir::new().unwrap();
        let mut session = session(dest.path(), dest.path(), dest.path(), "");
        assert!(!session.report_failed_moves().unwrap());
    }

    #[test]
    fn test_read_value_skips_blank_lines() {
        let dest = TempDir::new().unwrap();
        let mut session = session(dest.path(), dest.path(), dest.path(), "\n  \n value \n");
        assert_eq!(session.read_value().unwrap(), Some("value".to_string()));
        assert_eq!(session.read_value().unwrap(), None);
    }
}
