//! extsorter - sort a folder's files into category subfolders by extension
//!
//! This library provides the pieces of a small file-sorting utility: persisted
//! settings, a source directory scanner, an organizer that moves files into
//! one subdirectory per category, a dialog for categorising unrecognised
//! extensions, and the interactive menu that drives them.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod menu;
pub mod output;
pub mod resolution;
pub mod scanner;

pub use config::{ConfigError, Settings};
pub use file_category::{Classification, FALLBACK_CATEGORY, derive_subdirectories};
pub use file_organizer::{DestinationOrganizer, MoveFile, OrganizeError, SortOutcome, SortSummary};
pub use resolution::resolve_unrecognised;
pub use scanner::{ScanError, SourceScanner};

pub use cli::{Cli, Command, Session, SessionError, run_cli};
