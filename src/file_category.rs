//! Extension-based file classification.
//!
//! This module maps a file's extension to the category (destination
//! subdirectory) it belongs to, using the user's extension→category table.
//!
//! # Examples
//!
//! ```
//! use extsorter::file_category::{Classification, classify};
//! use std::collections::{BTreeMap, BTreeSet};
//!
//! let excluded: BTreeSet<String> = [".tmp".to_string()].into();
//! let categories: BTreeMap<String, String> =
//!     [(".pdf".to_string(), "Documents".to_string())].into();
//!
//! assert_eq!(
//!     classify(".pdf", &excluded, &categories),
//!     Classification::Mapped("Documents".to_string())
//! );
//! assert_eq!(classify(".tmp", &excluded, &categories), Classification::Excluded);
//! assert_eq!(classify(".xyz", &excluded, &categories), Classification::Unrecognised);
//! ```
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// The category every unrecognised extension falls back to.
///
/// Always part of the subdirectory set, whatever the configuration says.
pub const FALLBACK_CATEGORY: &str = "Other";

/// Characters that may not appear in a category name.
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// How a single file should be handled by a sort run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The extension is excluded; the file is left where it is.
    Excluded,
    /// The extension has a configured category.
    Mapped(String),
    /// No mapping exists; the file goes to [`FALLBACK_CATEGORY`].
    Unrecognised,
}

impl Classification {
    /// Returns the subdirectory this file should be moved into, if any.
    pub fn target_category(&self) -> Option<&str> {
        match self {
            Classification::Excluded => None,
            Classification::Mapped(category) => Some(category.as_str()),
            Classification::Unrecognised => Some(FALLBACK_CATEGORY),
        }
    }
}

/// Returns the extension of a file name: the final `.` and everything after
/// it, lowercased.
///
/// A name without a dot, or one ending in a dot, has an empty extension. A
/// dot-file such as `.bashrc` is its own extension.
///
/// ```
/// use extsorter::file_category::extension_of;
///
/// assert_eq!(extension_of("report.PDF"), ".pdf");
/// assert_eq!(extension_of("archive.tar.gz"), ".gz");
/// assert_eq!(extension_of("Makefile"), "");
/// ```
pub fn extension_of(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(idx) if idx + 1 < file_name.len() => file_name[idx..].to_lowercase(),
        _ => String::new(),
    }
}

/// Label for an extension in console output. The empty extension of files
/// without one reads as `(none)`.
pub fn extension_label(extension: &str) -> &str {
    if extension.is_empty() { "(none)" } else { extension }
}

/// Returns the extension of the last component of `path`.
pub fn path_extension(path: &Path) -> String {
    path.file_name()
        .map(|name| extension_of(&name.to_string_lossy()))
        .unwrap_or_default()
}

/// Normalises user input into the stored extension form: trimmed,
/// lowercased and dot-prefixed.
///
/// Empty input and a lone `.` both mean "no extension", the same empty
/// string [`extension_of`] returns for such files.
pub fn normalize_extension(input: &str) -> String {
    let trimmed = input.trim().to_lowercase();
    if trimmed.is_empty() || trimmed == "." {
        String::new()
    } else if trimmed.starts_with('.') {
        trimmed
    } else {
        format!(".{}", trimmed)
    }
}

/// Upper-cases the first character of a user-entered category name.
pub fn capitalize_category(input: &str) -> String {
    let trimmed = input.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Checks that a category name can be used as a single directory name.
///
/// Returns the reason it cannot, if any.
pub fn category_name_problem(name: &str) -> Option<&'static str> {
    if name.trim().is_empty() {
        return Some("category name is empty");
    }
    if name == "." || name == ".." {
        return Some("category name cannot be a relative directory");
    }
    if name.chars().any(|c| RESERVED_CHARS.contains(&c) || c.is_control()) {
        return Some("category name contains a reserved character");
    }
    None
}

/// Applies the classification rule to one extension.
///
/// Exclusion wins over a mapping, so an extension listed in both is left
/// untouched.
pub fn classify(
    extension: &str,
    excluded: &BTreeSet<String>,
    categories: &BTreeMap<String, String>,
) -> Classification {
    if excluded.contains(extension) {
        Classification::Excluded
    } else if let Some(category) = categories.get(extension) {
        Classification::Mapped(category.clone())
    } else {
        Classification::Unrecognised
    }
}

/// Returns every distinct category in `categories` plus [`FALLBACK_CATEGORY`].
///
/// The set is sorted, which also fixes the numbering used by the
/// resolution dialog.
pub fn derive_subdirectories(categories: &BTreeMap<String, String>) -> BTreeSet<String> {
    categories
        .values()
        .cloned()
        .chain(std::iter::once(FALLBACK_CATEGORY.to_string()))
        .collect()
}
