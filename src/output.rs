//! Output formatting and styling module.
//!
//! Provides a centralized interface for all console output, including colored
//! status lines, prompts, the statistics table and a progress bar. Output goes
//! to any [`Write`] so dialogs can be driven from tests.

use colored::*;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Highlights an interpolated value inside a message.
pub fn value<T: std::fmt::Display>(v: T) -> ColoredString {
    v.to_string().cyan()
}

/// Writes styled console output to `W`.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Headings for each step (yellow)
/// - Prompts and option lists (magenta)
/// - The sorting statistics table
pub struct OutputFormatter<W: Write> {
    out: W,
}

impl OutputFormatter<io::Stdout> {
    /// Creates a formatter over standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> OutputFormatter<W> {
    /// Creates a formatter over `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Prints a success message in green with a checkmark.
    pub fn success(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{} {}", "✓".green(), message)
    }

    /// Prints an error message in red with an X mark.
    pub fn error(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{} {}", "✗".red(), message.red())
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{} {}", "⚠".yellow(), message)
    }

    /// Prints the heading of a processing step in yellow.
    pub fn step(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{}", message.yellow())
    }

    /// Prints a prompt or option line in magenta.
    pub fn prompt(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{}", message.magenta())
    }

    /// Prints an input marker without a newline and flushes.
    pub fn input_marker(&mut self, marker: &str) -> io::Result<()> {
        write!(self.out, "{}", marker.blue())?;
        self.out.flush()
    }

    /// Prints a regular message without styling.
    pub fn plain(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{}", message)
    }

    /// Prints a section header.
    pub fn header(&mut self, header: &str) -> io::Result<()> {
        writeln!(self.out, "\n{}", header.bold())
    }

    /// Prints one line per statistics key with its count.
    ///
    /// Keys are listed in sorted order; zero counts are shown.
    pub fn statistics_table(&mut self, stats: &BTreeMap<String, usize>) -> io::Result<()> {
        let width = stats.keys().map(|k| k.len()).max().unwrap_or(0).max(12);

        for (key, count) in stats {
            writeln!(
                self.out,
                "\t{:>width$} - {}",
                key,
                count.to_string().green(),
                width = width
            )?;
        }
        Ok(())
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Creates a progress bar for the move phase of a sort.
///
/// Drawn on stderr; hidden when `visible` is false.
pub fn create_progress_bar(total: u64, visible: bool) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(
        Some(total),
        if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        },
    );
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("█▓░"));
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(f: impl FnOnce(&mut OutputFormatter<Vec<u8>>) -> io::Result<()>) -> String {
        let mut formatter = OutputFormatter::new(Vec::new());
        f(&mut formatter).unwrap();
        String::from_utf8(formatter.into_inner()).unwrap()
    }

    #[test]
    fn test_messages_keep_their_text() {
        let text = rendered(|o| {
            o.success("moved")?;
            o.error("broken")?;
            o.warning("careful")
        });
        assert!(text.contains("moved"));
        assert!(text.contains("broken"));
        assert!(text.contains("careful"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_statistics_table_lists_every_key() {
        let mut stats = BTreeMap::new();
        stats.insert("Documents".to_string(), 1);
        stats.insert("Other".to_string(), 0);

        let text = rendered(|o| o.statistics_table(&stats));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Documents"));
        assert!(lines[1].contains("Other"));
        assert!(lines[1].contains('0'));
    }

    #[test]
    fn test_hidden_progress_bar_counts() {
        let pb = create_progress_bar(3, false);
        pb.inc(2);
        assert_eq!(pb.position(), 2);
        assert_eq!(pb.length(), Some(3));
    }
}
