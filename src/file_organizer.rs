//! Moving candidate files into category subdirectories.
//!
//! The [`DestinationOrganizer`] owns the destination root, creates one
//! subdirectory per category, classifies and moves each candidate file, and
//! keeps the outcome of the run: per-category counts, extensions it did not
//! recognise, and files it failed to move.
//!
//! The unrecognised and failed collections accumulate across runs on the same
//! organizer until cleared. They are plain fields with no internal locking;
//! share an organizer between threads only behind external synchronisation.

use crate::config::Settings;
use crate::file_category::{
    Classification, FALLBACK_CATEGORY, category_name_problem, classify, derive_subdirectories,
    path_extension,
};
use chrono::{DateTime, Local};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Statistics key for the number of distinct unrecognised extensions.
pub const UNRECOGNISED_KEY: &str = "Unrecognised Extensions";
/// Statistics key for the number of failed moves.
pub const FAILED_MOVES_KEY: &str = "Failed Moves";

/// Errors that stop a sort run.
///
/// A single file failing to move is not one of them; see [`SortOutcome::Failed`].
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The destination root is not an existing directory.
    #[error("Provided destination path {} is invalid or does not exist", .0.display())]
    InvalidPath(PathBuf),
    /// A category subdirectory could not be created.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for organizer operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Performs the actual relocation of one file.
pub trait MoveFile {
    /// Moves `from` to `to`. Must not overwrite an existing `to`.
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// Moves files with a filesystem rename, refusing to overwrite.
#[derive(Debug, Default, Clone, Copy)]
pub struct RenameMover;

impl MoveFile for RenameMover {
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        if fs::symlink_metadata(to).is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination already exists: {}", to.display()),
            ));
        }
        fs::rename(from, to)
    }
}

/// What happened to a single candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOutcome {
    /// The extension is excluded; the file was not touched.
    Skipped { extension: String },
    /// The file now lives at `destination`.
    Moved {
        category: String,
        destination: PathBuf,
    },
    /// The move was attempted and failed.
    Failed { category: String, reason: String },
}

/// Totals for one call to [`DestinationOrganizer::sort_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSummary {
    /// When the run started.
    pub started_at: DateTime<Local>,
    /// Number of candidate files handed to the run.
    pub candidates: usize,
    /// Files moved successfully.
    pub moved: usize,
    /// Files left alone because their extension is excluded.
    pub skipped: usize,
    /// Files whose move failed.
    pub failed: usize,
}

/// Classifies candidate files and moves them under the destination root.
pub struct DestinationOrganizer<M: MoveFile = RenameMover> {
    root: PathBuf,
    excluded: BTreeSet<String>,
    categories: BTreeMap<String, String>,
    mover: M,
    run_counts: BTreeMap<String, usize>,
    unrecognised: BTreeSet<String>,
    failed_moves: BTreeMap<PathBuf, String>,
}

impl DestinationOrganizer<RenameMover> {
    /// Creates an organizer for the destination and rules in `settings`.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::InvalidPath` if the destination does not exist.
    pub fn new(settings: &Settings) -> OrganizeResult<Self> {
        Self::with_mover(settings, RenameMover)
    }
}

impl<M: MoveFile> DestinationOrganizer<M> {
    /// Creates an organizer that relocates files through `mover`.
    pub fn with_mover(settings: &Settings, mover: M) -> OrganizeResult<Self> {
        let root = settings.destination_path.clone();
        if !root.is_dir() {
            return Err(OrganizeError::InvalidPath(root));
        }

        let mut organizer = Self {
            root,
            excluded: BTreeSet::new(),
            categories: BTreeMap::new(),
            mover,
            run_counts: BTreeMap::new(),
            unrecognised: BTreeSet::new(),
            failed_moves: BTreeMap::new(),
        };
        organizer.update_rules(settings);
        info!("Set destination directory to {}", organizer.root.display());
        Ok(organizer)
    }

    /// Picks up changed exclusions and categories, and resets the
    /// per-category counts to zero for the new subdirectory set.
    ///
    /// The destination root is fixed for the organizer's lifetime.
    ///
    /// Mappings whose category is not a single safe directory name are
    /// ignored, so those extensions are treated as unrecognised.
    pub fn update_rules(&mut self, settings: &Settings) {
        self.excluded = settings.excluded_extensions.clone();
        self.categories = settings
            .extension_categories
            .iter()
            .filter(|(extension, category)| match category_name_problem(category) {
                Some(reason) => {
                    warn!("Ignoring mapping {} -> '{}': {}", extension, category, reason);
                    false
                }
                None => true,
            })
            .map(|(extension, category)| (extension.clone(), category.clone()))
            .collect();
        self.reset_counts();
    }

    fn reset_counts(&mut self) {
        self.run_counts = self
            .subdirectories()
            .into_iter()
            .map(|name| (name, 0))
            .collect();
    }

    /// The destination root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The category subdirectories this organizer sorts into.
    pub fn subdirectories(&self) -> BTreeSet<String> {
        derive_subdirectories(&self.categories)
    }

    /// Creates every missing category subdirectory.
    ///
    /// Safe to call repeatedly; existing directories are left alone.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::DirectoryCreationFailed` for any failure other
    /// than the directory already existing.
    pub fn ensure_subdirectories(&self) -> OrganizeResult<()> {
        for name in self.subdirectories() {
            let path = self.root.join(&name);
            if path.is_dir() {
                debug!("Checked: {}", name);
                continue;
            }

            match fs::create_dir(&path) {
                Ok(()) => info!("Created subdirectory {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => {}
                Err(e) => {
                    return Err(OrganizeError::DirectoryCreationFailed { path, source: e });
                }
            }
        }
        Ok(())
    }

    /// Decides what should happen to `file` without touching it.
    ///
    /// Does not record unrecognised extensions.
    pub fn classify(&self, file: &Path) -> Classification {
        classify(&path_extension(file), &self.excluded, &self.categories)
    }

    /// Classifies and moves one file, recording the outcome.
    pub fn sort_file(&mut self, file: &Path) -> SortOutcome {
        let extension = path_extension(file);

        let category = match classify(&extension, &self.excluded, &self.categories) {
            Classification::Excluded => {
                debug!(
                    "Skipped file with excluded extension ({}): {}",
                    extension,
                    file.display()
                );
                return SortOutcome::Skipped { extension };
            }
            Classification::Mapped(category) => category,
            Classification::Unrecognised => {
                self.unrecognised.insert(extension);
                FALLBACK_CATEGORY.to_string()
            }
        };

        let category_path = self.root.join(&category);
        let result = match file.file_name() {
            Some(name) => {
                let destination = category_path.join(name);
                self.mover
                    .move_file(file, &destination)
                    .map(|()| destination)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "file has no name component",
            )),
        };

        match result {
            Ok(destination) => {
                info!("Sorted {} into {}", file.display(), category);
                *self.run_counts.entry(category.clone()).or_insert(0) += 1;
                SortOutcome::Moved {
                    category,
                    destination,
                }
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(
                    "Error moving file {} to {}: {}",
                    file.display(),
                    category_path.display(),
                    reason
                );
                self.failed_moves.insert(file.to_path_buf(), reason.clone());
                SortOutcome::Failed { category, reason }
            }
        }
    }

    /// Starts a new run: per-category counts go back to zero.
    ///
    /// Unrecognised extensions and failed moves are kept.
    pub fn begin_run(&mut self) {
        self.reset_counts();
    }

    /// Sorts every file in `files` as one run.
    ///
    /// A file that fails to move is recorded and the run carries on.
    pub fn sort_files(&mut self, files: &[PathBuf]) -> SortSummary {
        self.sort_files_with(files, |_, _| {})
    }

    /// Like [`sort_files`](Self::sort_files), calling `on_outcome` after each file.
    pub fn sort_files_with<F>(&mut self, files: &[PathBuf], mut on_outcome: F) -> SortSummary
    where
        F: FnMut(&Path, &SortOutcome),
    {
        self.begin_run();
        let mut summary = SortSummary {
            started_at: Local::now(),
            candidates: files.len(),
            moved: 0,
            skipped: 0,
            failed: 0,
        };

        for file in files {
            let outcome = self.sort_file(file);
            match outcome {
                SortOutcome::Skipped { .. } => summary.skipped += 1,
                SortOutcome::Moved { .. } => summary.moved += 1,
                SortOutcome::Failed { .. } => summary.failed += 1,
            }
            on_outcome(file, &outcome);
        }
        summary
    }

    /// Per-category move counts for the current run, plus
    /// [`UNRECOGNISED_KEY`] and [`FAILED_MOVES_KEY`] when those collections
    /// are non-empty.
    ///
    /// Computed on every call, so asking twice gives the same answer.
    pub fn statistics(&self) -> BTreeMap<String, usize> {
        let mut stats = self.run_counts.clone();
        if !self.unrecognised.is_empty() {
            stats.insert(UNRECOGNISED_KEY.to_string(), self.unrecognised.len());
        }
        if !self.failed_moves.is_empty() {
            stats.insert(FAILED_MOVES_KEY.to_string(), self.failed_moves.len());
        }
        stats
    }

    /// Returns true if any move has failed since the last clear.
    pub fn check_failed_moves(&self) -> bool {
        !self.failed_moves.is_empty()
    }

    /// Files that failed to move, with the reason.
    pub fn failed_moves(&self) -> &BTreeMap<PathBuf, String> {
        &self.failed_moves
    }

    /// Extensions seen without a category mapping.
    pub fn unrecognised_extensions(&self) -> &BTreeSet<String> {
        &self.unrecognised
    }

    /// Drops extensions that have since been given a category.
    pub fn forget_unrecognised<'a, I>(&mut self, extensions: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for extension in extensions {
            self.unrecognised.remove(extension);
        }
    }

    /// Clears the unrecognised and failed collections.
    pub fn clear_issues(&mut self) {
        self.unrecognised.clear();
        self.failed_moves.clear();
    }
}
