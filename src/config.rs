//! Persisted sorting settings.
//!
//! This module loads and saves the user's settings: where to sort from,
//! where to sort to, which extensions to leave alone, and which category
//! each known extension belongs to.
//!
//! # Settings File Format
//!
//! Settings are stored as JSON:
//!
//! ```json
//! {
//!   "sourcePath": "/home/me/Downloads",
//!   "destinationPath": "/home/me/Downloads/Sorted",
//!   "excludedExtensions": [".tmp", ".bak", ".log", ".crdownload"],
//!   "extensionCategories": { ".pdf": "Documents", ".mp3": "Audio" }
//! }
//! ```
//!
//! Loading never fails: a missing, empty or corrupt file yields the built-in
//! defaults, and any missing field is filled from them.

use crate::file_category::{category_name_problem, normalize_extension};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// File name of the settings file.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Extensions excluded out of the box.
const DEFAULT_EXCLUDED: &[&str] = &[".tmp", ".bak", ".log", ".crdownload"];

/// The seed extension→category table.
const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    (".flac", "Audio"),
    (".doc", "Documents"),
    (".7z", "Compressed"),
    (".ps1", "Scripts"),
    (".xlsx", "Documents"),
    (".jfif", "Pics"),
    (".docx", "Documents"),
    (".bat", "Scripts"),
    (".exe", "Software"),
    (".jpeg", "Pics"),
    (".png", "Pics"),
    (".pptx", "Documents"),
    (".gif", "GIFs"),
    (".rar", "Compressed"),
    (".mp4", "Videos"),
    (".zip", "Compressed"),
    (".avi", "Videos"),
    (".gz", "Compressed"),
    (".txt", "Documents"),
    (".jpg", "Pics"),
    (".wav", "Audio"),
    (".pdf", "Documents"),
    (".mkv", "Videos"),
    (".bmp", "Pics"),
    (".mp3", "Audio"),
    (".msi", "Software"),
    (".jar", "Compressed"),
];

/// Errors that can occur while loading, validating or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A path setting does not point at an existing directory.
    #[error("Provided directory path {} is invalid or does not exist", .0.display())]
    InvalidPath(PathBuf),
    /// A category name cannot be used as a directory name.
    #[error("Invalid category name '{name}': {reason}")]
    InvalidCategory { name: String, reason: &'static str },
    /// The settings file could not be written.
    #[error("Failed to save settings to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The settings file could not be read or parsed.
    #[error("Failed to parse settings file {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
}

/// User settings for a sort run.
///
/// Every field is optional on disk; [`Settings::load`] fills gaps from
/// [`Settings::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Directory whose direct children are sorted.
    #[serde(default)]
    pub source_path: PathBuf,

    /// Directory that receives one subdirectory per category.
    #[serde(default)]
    pub destination_path: PathBuf,

    /// Extensions that are never moved (lowercase, dot-prefixed).
    ///
    /// A missing key gets the built-in exclusions; an explicit `[]` stays empty.
    #[serde(default = "default_excluded_extensions")]
    pub excluded_extensions: BTreeSet<String>,

    /// Extension → category (subdirectory name).
    #[serde(default)]
    pub extension_categories: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        let source_path = default_source_path();
        Self {
            destination_path: source_path.join("Sorted"),
            source_path,
            excluded_extensions: default_excluded_extensions(),
            extension_categories: default_extension_categories(),
        }
    }
}

/// Returns the built-in excluded extensions.
pub fn default_excluded_extensions() -> BTreeSet<String> {
    DEFAULT_EXCLUDED.iter().map(|e| e.to_string()).collect()
}

/// Returns the seed extension→category table.
pub fn default_extension_categories() -> BTreeMap<String, String> {
    DEFAULT_CATEGORIES
        .iter()
        .map(|(ext, cat)| (ext.to_string(), cat.to_string()))
        .collect()
}

fn default_source_path() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Settings {
    /// Returns where the settings file lives when no path is given:
    /// next to the running executable, or the current directory if the
    /// executable location is unknown.
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(SETTINGS_FILE_NAME)
    }

    /// Loads settings, falling back to defaults on any problem.
    ///
    /// A missing, empty, unreadable or corrupt file all produce
    /// [`Settings::default`]; the problem is logged, never returned.
    pub fn load(path: &Path) -> Self {
        match Self::load_strict(path) {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                info!("No settings at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Loads settings, reporting parse and read problems.
    ///
    /// Returns `Ok(None)` when the file is missing or empty. Missing fields
    /// in a valid file are default-filled.
    pub fn load_strict(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        let mut settings: Settings =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        settings.fill_defaults();
        Ok(Some(settings))
    }

    /// Drops unusable category mappings and replaces empty fields with
    /// their defaults.
    fn fill_defaults(&mut self) {
        self.drop_unsafe_categories();
        if self.source_path.as_os_str().is_empty() {
            warn!("sourcePath is empty, using default");
            self.source_path = default_source_path();
        }
        if self.destination_path.as_os_str().is_empty() {
            warn!("destinationPath is empty, using default");
            self.destination_path = self.source_path.join("Sorted");
        }
        if self.extension_categories.is_empty() {
            warn!("extensionCategories is empty, using default table");
            self.extension_categories = default_extension_categories();
        }
    }

    /// Removes every mapping whose category cannot be used as a single
    /// directory name under the destination. Returns how many were removed.
    pub fn drop_unsafe_categories(&mut self) -> usize {
        let before = self.extension_categories.len();
        self.extension_categories.retain(|extension, category| {
            let problem = category_name_problem(category);
            if let Some(reason) = problem {
                warn!("Ignoring mapping {} -> '{}': {}", extension, category, reason);
            }
            problem.is_none()
        });
        before - self.extension_categories.len()
    }

    /// Writes the settings as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Persist` if the file or its directory cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let persist_err = |source: std::io::Error| ConfigError::Persist {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(persist_err)?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| persist_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        fs::write(path, json).map_err(persist_err)?;

        info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Sets the source directory, which must exist.
    pub fn set_source_path(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.source_path = existing_dir(path)?;
        Ok(())
    }

    /// Sets the destination directory, which must exist.
    pub fn set_destination_path(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.destination_path = existing_dir(path)?;
        Ok(())
    }

    /// Adds extensions to the excluded set.
    ///
    /// Returns how many were not already present.
    pub fn add_excluded_extensions<I, S>(&mut self, extensions: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for extension in extensions {
            if self
                .excluded_extensions
                .insert(normalize_extension(extension.as_ref()))
            {
                added += 1;
            }
        }
        added
    }

    /// Removes an extension from the excluded set. Returns whether it was present.
    pub fn remove_excluded_extension(&mut self, extension: &str) -> bool {
        self.excluded_extensions
            .remove(&normalize_extension(extension))
    }

    /// Maps one extension to a category, replacing any existing mapping.
    ///
    /// Returns the previous category, if there was one.
    pub fn set_extension_category(
        &mut self,
        extension: &str,
        category: &str,
    ) -> Result<Option<String>, ConfigError> {
        if let Some(reason) = category_name_problem(category) {
            return Err(ConfigError::InvalidCategory {
                name: category.to_string(),
                reason,
            });
        }
        Ok(self
            .extension_categories
            .insert(normalize_extension(extension), category.to_string()))
    }

    /// Merges a batch of extension→category assignments.
    ///
    /// Entries with an unusable category name are skipped with a warning.
    /// Returns how many were merged.
    pub fn merge_extension_categories(&mut self, categories: BTreeMap<String, String>) -> usize {
        let mut merged = 0;
        for (extension, category) in categories {
            match self.set_extension_category(&extension, &category) {
                Ok(_) => merged += 1,
                Err(e) => warn!("Skipping {}: {}", extension, e),
            }
        }
        merged
    }

    /// Removes an extension's mapping. Returns the category it had.
    pub fn remove_extension_category(&mut self, extension: &str) -> Option<String> {
        self.extension_categories
            .remove(&normalize_extension(extension))
    }

    /// Returns the category mapped to `extension`, if any.
    pub fn category_for(&self, extension: &str) -> Option<&str> {
        self.extension_categories
            .get(&normalize_extension(extension))
            .map(String::as_str)
    }
}

fn existing_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.is_dir() {
        Ok(path.to_path_buf())
    } else {
        Err(ConfigError::InvalidPath(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings_seed() {
        let settings = Settings::default();
        assert_eq!(settings.extension_categories.len(), DEFAULT_CATEGORIES.len());
        assert_eq!(settings.excluded_extensions.len(), 4);
        assert!(settings.excluded_extensions.contains(".crdownload"));
        assert_eq!(settings.category_for(".flac"), Some("Audio"));
        assert_eq!(settings.category_for("GIF"), Some("GIFs"));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load(&temp_dir.path().join("absent.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_empty_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "").unwrap();

        let settings = Settings::load(&path);
        assert_eq!(settings.extension_categories.len(), 27);
        assert_eq!(settings.excluded_extensions.len(), 4);
    }

    #[test]
    fn test_load_corrupt_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "{ not json").unwrap();

        assert!(Settings::load_strict(&path).is_err());
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn test_load_fills_missing_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, r#"{ "sourcePath": "/data/in" }"#).unwrap();

        let settings = Settings::load(&path);
        assert_eq!(settings.source_path, PathBuf::from("/data/in"));
        assert_eq!(settings.destination_path, PathBuf::from("/data/in/Sorted"));
        assert_eq!(settings.extension_categories, default_extension_categories());
        assert_eq!(settings.excluded_extensions, default_excluded_extensions());
        assert!(settings.excluded_extensions.contains(".tmp"));
    }

    #[test]
    fn test_load_keeps_explicitly_empty_excluded_list() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, r#"{ "sourcePath": "/data/in", "excludedExtensions": [] }"#).unwrap();

        let settings = Settings::load(&path);
        assert!(settings.excluded_extensions.is_empty());
    }

    #[test]
    fn test_load_drops_unsafe_categories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SETTINGS_FILE_NAME);
        let outside = temp_dir.path().join("outside");
        let json = serde_json::json!({
            "sourcePath": "/data/in",
            "extensionCategories": {
                ".pdf": outside,
                ".zip": "..",
                ".png": "a/b",
                ".mp3": "Audio",
            }
        });
        fs::write(&path, json.to_string()).unwrap();

        let settings = Settings::load(&path);
        assert_eq!(settings.extension_categories.len(), 1);
        assert_eq!(settings.category_for(".mp3"), Some("Audio"));
        assert_eq!(settings.category_for(".pdf"), None);
    }

    #[test]
    fn test_load_with_only_unsafe_categories_gets_seed_table() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, r#"{ "extensionCategories": { ".pdf": ".." } }"#).unwrap();

        let settings = Settings::load(&path);
        assert_eq!(settings.extension_categories, default_extension_categories());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(SETTINGS_FILE_NAME);

        let mut settings = Settings::default();
        settings.set_source_path(temp_dir.path()).unwrap();
        settings.set_extension_category("epub", "Books").unwrap();
        settings.save(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"extensionCategories\""));
        assert!(written.contains("\".epub\": \"Books\""));

        assert_eq!(Settings::load(&path), settings);
    }

    #[test]
    fn test_set_source_path_rejects_missing_dir() {
        let mut settings = Settings::default();
        let result = settings.set_source_path(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(ConfigError::InvalidPath(_))));
    }

    #[test]
    fn test_add_and_remove_excluded_extensions() {
        let mut settings = Settings::default();
        let added = settings.add_excluded_extensions(["PART", ".tmp", ".iso"]);
        assert_eq!(added, 2);
        assert!(settings.excluded_extensions.contains(".part"));

        assert!(settings.remove_excluded_extension("iso"));
        assert!(!settings.remove_excluded_extension(".iso"));
    }

    #[test]
    fn test_merge_extension_categories() {
        let mut settings = Settings::default();
        let mut batch = BTreeMap::new();
        batch.insert(".xyz".to_string(), "Other".to_string());
        batch.insert("PDF".to_string(), "Papers".to_string());
        batch.insert(".bad".to_string(), "a/b".to_string());

        assert_eq!(settings.merge_extension_categories(batch), 2);
        assert_eq!(settings.category_for(".xyz"), Some("Other"));
        assert_eq!(settings.category_for(".pdf"), Some("Papers"));
        assert_eq!(settings.category_for(".bad"), None);
    }

    #[test]
    fn test_remove_extension_category() {
        let mut settings = Settings::default();
        assert_eq!(
            settings.remove_extension_category(".mp3"),
            Some("Audio".to_string())
        );
        assert_eq!(settings.remove_extension_category(".mp3"), None);
    }
}
