//! Assigning categories to unrecognised extensions.
//!
//! For each unrecognised extension the operator picks one of the current
//! subdirectories by number, or types `skip`. The result is a mapping the
//! caller merges into [`Settings`](crate::config::Settings) and saves.

use crate::file_category::extension_label;
use crate::output::{OutputFormatter, value};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::{debug, info};

/// Input that leaves an extension unassigned.
pub const SKIP_TOKEN: &str = "skip";

/// A valid answer to the category prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    /// Leave this extension unassigned.
    Skip,
    /// Index into the numbered subdirectory list.
    Index(usize),
}

/// Why an answer was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickError {
    #[error("Empty values are not accepted")]
    Empty,
    #[error("Enter an integer value for your pick")]
    NotANumber,
    #[error("Entered value {pick} is outside the allowed range 0-{max}")]
    OutOfRange { pick: i64, max: usize },
}

/// Parses one answer given `count` listed subdirectories.
///
/// Accepts the skip token in any case, or an integer in `0..count`.
pub fn parse_pick(input: &str, count: usize) -> Result<Pick, PickError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(PickError::Empty);
    }
    if trimmed.eq_ignore_ascii_case(SKIP_TOKEN) {
        return Ok(Pick::Skip);
    }

    let pick: i64 = trimmed.parse().map_err(|_| PickError::NotANumber)?;
    match usize::try_from(pick) {
        Ok(index) if index < count => Ok(Pick::Index(index)),
        _ => Err(PickError::OutOfRange {
            pick,
            max: count.saturating_sub(1),
        }),
    }
}

/// Runs the dialog over every extension in `unrecognised`, in sorted order.
///
/// Invalid answers are reported and re-prompted. If input ends, the
/// remaining extensions are skipped.
///
/// Returns extension → chosen subdirectory for every extension that was not
/// skipped.
pub fn resolve_unrecognised<R: BufRead, W: Write>(
    unrecognised: &BTreeSet<String>,
    subdirectories: &BTreeSet<String>,
    input: &mut R,
    out: &mut OutputFormatter<W>,
) -> io::Result<BTreeMap<String, String>> {
    let mut assigned = BTreeMap::new();

    out.step("Checking for unrecognised file extensions... ")?;
    if unrecognised.is_empty() {
        out.plain("\tNo unrecognised file extensions in the list")?;
        return Ok(assigned);
    }
    out.success(&format!(
        "{} unrecognised file extensions in the files sorted",
        value(unrecognised.len())
    ))?;

    let choices: Vec<&String> = subdirectories.iter().collect();

    'extensions: for extension in unrecognised {
        out.prompt(&format!(
            "\tWhich category should -{}- be added to?",
            value(extension_label(extension))
        ))?;
        out.prompt(&format!("\tType {} to skip this extension", value(SKIP_TOKEN)))?;
        for (i, category) in choices.iter().enumerate() {
            out.prompt(&format!("\t  {:>12} - {}", category, value(i)))?;
        }

        loop {
            out.input_marker("\tChoice - ")?;
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                debug!("Input ended, skipping remaining unrecognised extensions");
                break 'extensions;
            }

            match parse_pick(&line, choices.len()) {
                Ok(Pick::Skip) => {
                    debug!("Skipped {}", extension);
                    break;
                }
                Ok(Pick::Index(index)) => {
                    let category = choices[index].clone();
                    out.success(&format!(
                        "Added extension category -> {}-{}",
                        value(extension_label(extension)),
                        value(&category)
                    ))?;
                    info!("Assigned {} to {}", extension, category);
                    assigned.insert(extension.clone(), category);
                    break;
                }
                Err(e) => out.error(&format!("\t{}", e))?,
            }
        }
    }

    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn run(
        unrecognised: &[&str],
        subdirs: &[&str],
        answers: &str,
    ) -> (BTreeMap<String, String>, String) {
        let mut input = Cursor::new(answers.as_bytes().to_vec());
        let mut out = OutputFormatter::new(Vec::new());
        let result = resolve_unrecognised(&set(unrecognised), &set(subdirs), &mut input, &mut out)
            .expect("dialog should not fail on in-memory io");
        (result, String::from_utf8(out.into_inner()).unwrap())
    }

    #[test]
    fn test_parse_pick() {
        assert_eq!(parse_pick("skip", 3), Ok(Pick::Skip));
        assert_eq!(parse_pick(" SKIP \n", 3), Ok(Pick::Skip));
        assert_eq!(parse_pick("0", 3), Ok(Pick::Index(0)));
        assert_eq!(parse_pick("2\n", 3), Ok(Pick::Index(2)));
        assert_eq!(parse_pick("", 3), Err(PickError::Empty));
        assert_eq!(parse_pick("   \n", 3), Err(PickError::Empty));
        assert_eq!(parse_pick("two", 3), Err(PickError::NotANumber));
    }

    #[test]
    fn test_parse_pick_rejects_index_at_or_past_count() {
        assert!(matches!(parse_pick("3", 3), Err(PickError::OutOfRange { pick: 3, .. })));
        assert!(matches!(parse_pick("99", 3), Err(PickError::OutOfRange { .. })));
        assert!(matches!(parse_pick("-1", 3), Err(PickError::OutOfRange { .. })));
    }

    #[test]
    fn test_assigns_chosen_subdirectory() {
        // Subdirectories are numbered in sorted order: Audio=0, Documents=1, Other=2
        let (result, _) = run(&[".xyz"], &["Other", "Documents", "Audio"], "1\n");
        assert_eq!(result.get(".xyz").map(String::as_str), Some("Documents"));
    }

    #[test]
    fn test_out_of_range_is_reprompted() {
        let (result, text) = run(&[".xyz"], &["Documents", "Other"], "2\n1\n");
        assert_eq!(result.get(".xyz").map(String::as_str), Some("Other"));
        assert!(text.contains("outside the allowed range"));
    }

    #[test]
    fn test_invalid_answers_are_reprompted() {
        let (result, text) = run(&[".abc"], &["Documents", "Other"], "\nnope\n0\n");
        assert_eq!(result.get(".abc").map(String::as_str), Some("Documents"));
        assert!(text.contains("Empty values are not accepted"));
        assert!(text.contains("Enter an integer value"));
    }

    #[test]
    fn test_skip_leaves_extension_unassigned() {
        let (result, _) = run(&[".abc", ".xyz"], &["Documents", "Other"], "Skip\n0\n");
        assert_eq!(result.len(), 1);
        assert_eq!(result.get(".xyz").map(String::as_str), Some("Documents"));
    }

    #[test]
    fn test_end_of_input_skips_the_rest() {
        let (result, _) = run(&[".abc", ".xyz"], &["Documents", "Other"], "1\n");
        assert_eq!(result.len(), 1);
        assert_eq!(result.get(".abc").map(String::as_str), Some("Other"));
    }

    #[test]
    fn test_files_without_extension_are_offered_as_none() {
        let (result, text) = run(&[""], &["Documents", "Other"], "0\n");
        assert_eq!(result.get("").map(String::as_str), Some("Documents"));
        assert!(text.contains("(none)"));
    }

    #[test]
    fn test_nothing_to_resolve() {
        let (result, text) = run(&[], &["Other"], "");
        assert!(result.is_empty());
        assert!(text.contains("No unrecognised file extensions"));
    }
}
