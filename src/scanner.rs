//! Source directory scanning.
//!
//! Lists the regular files directly inside the source directory, leaving out
//! any whose extension is excluded. Nothing is moved or modified here.

use crate::config::Settings;
use crate::file_category::path_extension;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while scanning the source directory.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The source path is not an existing directory.
    #[error("Provided source path {} is invalid or does not exist", .0.display())]
    InvalidPath(PathBuf),
    /// The directory exists but its entries could not be read.
    #[error("Error reading directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Produces the candidate file list for a sort run.
#[derive(Debug, Clone)]
pub struct SourceScanner {
    source: PathBuf,
    excluded: BTreeSet<String>,
}

impl SourceScanner {
    /// Creates a scanner over `source`, which must be an existing directory.
    pub fn new(source: &Path, excluded: BTreeSet<String>) -> Result<Self, ScanError> {
        if !source.is_dir() {
            return Err(ScanError::InvalidPath(source.to_path_buf()));
        }
        Ok(Self {
            source: source.to_path_buf(),
            excluded,
        })
    }

    /// Creates a scanner from the source path and excluded set in `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, ScanError> {
        Self::new(&settings.source_path, settings.excluded_extensions.clone())
    }

    /// The directory being scanned.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Lists candidate files in directory enumeration order.
    ///
    /// Subdirectories and symlinks are skipped. Entries that cannot be
    /// inspected are skipped with a warning.
    pub fn scan(&self) -> Result<Vec<PathBuf>, ScanError> {
        let entries = fs::read_dir(&self.source).map_err(|e| ScanError::ReadDir {
            path: self.source.clone(),
            source: e,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", self.source.display(), e);
                    continue;
                }
            };
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    warn!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            if file_type.is_file() {
                let path = entry.path();
                let extension = path_extension(&path);
                if self.excluded.contains(&extension) {
                    debug!("Excluded from scan ({}): {}", extension, path.display());
                    continue;
                }
                files.push(path);
            }
        }

        info!(
            "Retrieved {} source files from {}",
            files.len(),
            self.source.display()
        );
        Ok(files)
    }
}
