//! Interactive text menu.
//!
//! Each [`MenuId`] lists its commands as `(word, Action)` pairs. Performing an
//! action yields a [`Transition`]: stay on the current menu, open a submenu,
//! or go back. The menus form a stack whose bottom is [`MenuId::Home`];
//! popping it ends the session.

use crate::cli::{Session, SessionError};
use crate::config::ConfigError;
use crate::file_category::{
    capitalize_category, category_name_problem, derive_subdirectories, extension_label,
    normalize_extension,
};
use crate::file_organizer::OrganizeError;
use crate::output::value;
use crate::scanner::ScanError;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::debug;

/// A menu screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuId {
    Home,
    Sort,
    Settings,
    Source,
    Destination,
    Excluded,
    Categories,
    Issues,
    FailedMoves,
    Unrecognised,
}

/// Something a command word does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Open(MenuId),
    Back,
    Sort,
    Stats,
    ShowSource,
    SetSource,
    ShowDestination,
    SetDestination,
    ShowExcluded,
    AddExcluded,
    RemoveExcluded,
    ShowCategories,
    AddCategory,
    EditCategory,
    RemoveCategory,
    ShowSubdirectories,
    ShowFailed,
    ShowUnrecognised,
    ResolveUnrecognised,
}

/// Where the menu goes after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Stay,
    Push(MenuId),
    Pop,
    /// Input ended.
    Quit,
}

impl MenuId {
    /// The commands offered on this menu, in display order.
    pub fn commands(self) -> &'static [(&'static str, Action)] {
        use Action::*;
        match self {
            MenuId::Home => &[
                ("sort", Open(MenuId::Sort)),
                ("settings", Open(MenuId::Settings)),
                ("issues", Open(MenuId::Issues)),
                ("exit", Back),
            ],
            MenuId::Sort => &[("sort", Sort), ("stats", Stats), ("back", Back)],
            MenuId::Settings => &[
                ("source", Open(MenuId::Source)),
                ("destination", Open(MenuId::Destination)),
                ("excluded", Open(MenuId::Excluded)),
                ("categories", Open(MenuId::Categories)),
                ("subdirectories", ShowSubdirectories),
                ("back", Back),
            ],
            MenuId::Source => &[("show", ShowSource), ("set", SetSource), ("back", Back)],
            MenuId::Destination => &[
                ("show", ShowDestination),
                ("set", SetDestination),
                ("back", Back),
            ],
            MenuId::Excluded => &[
                ("show", ShowExcluded),
                ("add", AddExcluded),
                ("remove", RemoveExcluded),
                ("back", Back),
            ],
            MenuId::Categories => &[
                ("show", ShowCategories),
                ("add", AddCategory),
                ("edit", EditCategory),
                ("remove", RemoveCategory),
                ("back", Back),
            ],
            MenuId::Issues => &[
                ("failed", Open(MenuId::FailedMoves)),
                ("unrecognised", Open(MenuId::Unrecognised)),
                ("back", Back),
            ],
            MenuId::FailedMoves => &[("show", ShowFailed), ("back", Back)],
            MenuId::Unrecognised => &[
                ("show", ShowUnrecognised),
                ("add", ResolveUnrecognised),
                ("back", Back),
            ],
        }
    }

    /// Finds the action for a command word (case-insensitive).
    pub fn lookup(self, command: &str) -> Option<Action> {
        let command = command.trim();
        self.commands()
            .iter()
            .find(|(word, _)| word.eq_ignore_ascii_case(command))
            .map(|(_, action)| *action)
    }
}

/// Runs the menu until `exit` or the end of input.
///
/// # Errors
///
/// Console failures and fatal sort errors (a subdirectory that cannot be
/// created, an unreadable source) end the session. A missing source or
/// destination directory is reported and the menu continues.
pub fn run_menu<R: BufRead, W: Write>(session: &mut Session<R, W>) -> Result<(), SessionError> {
    let mut stack = vec![MenuId::Home];

    while let Some(&menu) = stack.last() {
        session.out.prompt("\nPick one of these options: ")?;
        session
            .out
            .prompt("(Enter the text corresponding to your choice)")?;
        for (word, _) in menu.commands() {
            session.out.prompt(&format!("- {}", word))?;
        }

        let Some(choice) = session.read_value()? else {
            break;
        };

        let Some(action) = menu.lookup(&choice) else {
            session
                .out
                .error(&format!("Invalid choice: {}", value(&choice)))?;
            continue;
        };
        debug!("Menu {:?}: {:?}", menu, action);

        match perform(session, action)? {
            Transition::Stay => {}
            Transition::Push(next) => stack.push(next),
            Transition::Pop => {
                stack.pop();
            }
            Transition::Quit => break,
        }
    }

    session.out.flush()?;
    Ok(())
}

/// Performs one action.
pub fn perform<R: BufRead, W: Write>(
    session: &mut Session<R, W>,
    action: Action,
) -> Result<Transition, SessionError> {
    match action {
        Action::Open(menu) => return Ok(Transition::Push(menu)),
        Action::Back => return Ok(Transition::Pop),
        Action::Sort => sort_reporting_path_errors(session)?,
        Action::Stats => {
            if session.organizer().is_none() {
                sort_reporting_path_errors(session)?;
            }
            session.show_statistics()?;
        }
        Action::ShowSource => show_source(session)?,
        Action::SetSource => return set_directory(session, DirectoryKind::Source),
        Action::ShowDestination => show_destination(session)?,
        Action::SetDestination => return set_directory(session, DirectoryKind::Destination),
        Action::ShowExcluded => show_excluded(session)?,
        Action::AddExcluded => return add_excluded(session),
        Action::RemoveExcluded => return remove_excluded(session),
        Action::ShowCategories => show_categories(session)?,
        Action::AddCategory => return add_category(session),
        Action::EditCategory => return edit_category(session),
        Action::RemoveCategory => return remove_category(session),
        Action::ShowSubdirectories => show_subdirectories(session)?,
        Action::ShowFailed => {
            session.report_failed_moves()?;
        }
        Action::ShowUnrecognised => session.show_unrecognised()?,
        Action::ResolveUnrecognised => {
            let assigned = session.resolve_unrecognised()?;
            if assigned > 0 {
                show_categories(session)?;
            }
        }
    }
    Ok(Transition::Stay)
}

/// Sorts, printing path problems instead of ending the session.
fn sort_reporting_path_errors<R: BufRead, W: Write>(
    session: &mut Session<R, W>,
) -> Result<(), SessionError> {
    match session.sort() {
        Ok(_) => Ok(()),
        Err(
            e @ (SessionError::Scan(ScanError::InvalidPath(_))
            | SessionError::Organize(OrganizeError::InvalidPath(_))),
        ) => {
            session.out.error(&e.to_string())?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[derive(Debug, Clone, Copy)]
enum DirectoryKind {
    Source,
    Destination,
}

fn show_source<R: BufRead, W: Write>(session: &mut Session<R, W>) -> Result<(), SessionError> {
    let path = session.settings().source_path.display().to_string();
    session
        .out
        .success(&format!("Source folder - {}", value(path)))?;
    Ok(())
}

fn show_destination<R: BufRead, W: Write>(
    session: &mut Session<R, W>,
) -> Result<(), SessionError> {
    let path = session.settings().destination_path.display().to_string();
    session
        .out
        .success(&format!("Destination folder - {}", value(path)))?;
    Ok(())
}

fn set_directory<R: BufRead, W: Write>(
    session: &mut Session<R, W>,
    kind: DirectoryKind,
) -> Result<Transition, SessionError> {
    let label = match kind {
        DirectoryKind::Source => "source",
        DirectoryKind::Destination => "destination",
    };
    session
        .out
        .prompt(&format!("Enter the new {} folder full path: ", label))?;
    let Some(input) = session.read_value()? else {
        return Ok(Transition::Quit);
    };

    let path = Path::new(&input);
    let result = match kind {
        DirectoryKind::Source => session.settings_mut().set_source_path(path),
        DirectoryKind::Destination => session.settings_mut().set_destination_path(path),
    };

    match result {
        Ok(()) => {
            session.save_settings()?;
            match kind {
                DirectoryKind::Source => show_source(session)?,
                DirectoryKind::Destination => show_destination(session)?,
            }
        }
        Err(e @ ConfigError::InvalidPath(_)) => session.out.error(&e.to_string())?,
        Err(e) => return Err(e.into()),
    }
    Ok(Transition::Stay)
}

fn show_excluded<R: BufRead, W: Write>(session: &mut Session<R, W>) -> Result<(), SessionError> {
    let excluded = session.settings().excluded_extensions.clone();
    if excluded.is_empty() {
        session.out.warning("No excluded extensions to show")?;
        return Ok(());
    }
    session.out.success("Excluded extensions: ")?;
    for extension in &excluded {
        session.out.plain(&format!("  - {}", value(extension_label(extension))))?;
    }
    Ok(())
}

fn add_excluded<R: BufRead, W: Write>(
    session: &mut Session<R, W>,
) -> Result<Transition, SessionError> {
    session
        .out
        .prompt("Enter an extension to add to the list of excluded extensions")?;
    let Some(input) = session.read_value()? else {
        return Ok(Transition::Quit);
    };
    let extension = normalize_extension(&input);

    if session.settings_mut().add_excluded_extensions([&extension]) == 0 {
        session.out.error(&format!(
            "{} - already exists in excluded extensions",
            value(extension_label(&extension))
        ))?;
    } else {
        let mapped = session.settings().category_for(&extension).map(str::to_string);
        if let Some(category) = mapped {
            session.out.warning(&format!(
                "{} is also mapped to {}; excluded files are never moved",
                value(extension_label(&extension)),
                value(category)
            ))?;
        }
        session.out.success(&format!(
            "{} - added to excluded extensions",
            value(extension_label(&extension))
        ))?;
        session.save_settings()?;
        show_excluded(session)?;
    }
    Ok(Transition::Stay)
}

fn remove_excluded<R: BufRead, W: Write>(
    session: &mut Session<R, W>,
) -> Result<Transition, SessionError> {
    show_excluded(session)?;
    session
        .out
        .prompt("Enter an extension to remove from the list of excluded extensions")?;
    let Some(input) = session.read_value()? else {
        return Ok(Transition::Quit);
    };
    let extension = normalize_extension(&input);

    if session.settings_mut().remove_excluded_extension(&extension) {
        session
            .out
            .success(&format!("Removed extension - {}", value(extension_label(&extension))))?;
        session.save_settings()?;
        show_excluded(session)?;
    } else {
        session.out.error(&format!(
            "{} - not in list of excluded extensions",
            value(extension_label(&extension))
        ))?;
    }
    Ok(Transition::Stay)
}

fn show_categories<R: BufRead, W: Write>(
    session: &mut Session<R, W>,
) -> Result<(), SessionError> {
    let mut entries: Vec<(String, String)> = session
        .settings()
        .extension_categories
        .iter()
        .map(|(ext, cat)| (ext.clone(), cat.clone()))
        .collect();
    if entries.is_empty() {
        session.out.warning("No extension categories to show")?;
        return Ok(());
    }

    entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    session.out.success("Extension categories")?;
    for (extension, category) in &entries {
        session
            .out
            .plain(&format!("{:>8} - {}", extension_label(extension), value(category)))?;
    }
    Ok(())
}

/// Reads a category name, capitalised and checked for use as a directory.
fn read_category<R: BufRead, W: Write>(
    session: &mut Session<R, W>,
) -> Result<Option<Option<String>>, SessionError> {
    session.out.prompt("Enter the category for this extension: ")?;
    let Some(input) = session.read_value()? else {
        return Ok(None);
    };
    let category = capitalize_category(&input);
    if let Some(reason) = category_name_problem(&category) {
        session
            .out
            .error(&format!("{} - {}", value(&category), reason))?;
        return Ok(Some(None));
    }
    Ok(Some(Some(category)))
}

fn add_category<R: BufRead, W: Write>(
    session: &mut Session<R, W>,
) -> Result<Transition, SessionError> {
    session
        .out
        .prompt("Enter a new extension for a category: ")?;
    let Some(input) = session.read_value()? else {
        return Ok(Transition::Quit);
    };
    let extension = normalize_extension(&input);

    if session.settings().category_for(&extension).is_some() {
        session.out.error(&format!(
            "{} already exists in extension categories",
            value(extension_label(&extension))
        ))?;
        return Ok(Transition::Stay);
    }

    let category = match read_category(session)? {
        None => return Ok(Transition::Quit),
        Some(None) => return Ok(Transition::Stay),
        Some(Some(category)) => category,
    };

    session
        .settings_mut()
        .set_extension_category(&extension, &category)?;
    session.out.success(&format!(
        "Added {} - {} to extension categories",
        value(extension_label(&extension)),
        value(&category)
    ))?;
    session.save_settings()?;
    show_categories(session)?;
    Ok(Transition::Stay)
}

fn edit_category<R: BufRead, W: Write>(
    session: &mut Session<R, W>,
) -> Result<Transition, SessionError> {
    session
        .out
        .prompt("Pick an extension to edit the entry: ")?;
    show_categories(session)?;
    let Some(input) = session.read_value()? else {
        return Ok(Transition::Quit);
    };
    let extension = normalize_extension(&input);

    if session.settings().category_for(&extension).is_none() {
        session.out.error(&format!(
            "{} - does not exist in extension categories to edit",
            value(extension_label(&extension))
        ))?;
        return Ok(Transition::Stay);
    }

    session.out.prompt("Enter a new extension value: ")?;
    let Some(input) = session.read_value()? else {
        return Ok(Transition::Quit);
    };
    let new_extension = normalize_extension(&input);

    if new_extension != extension && session.settings().category_for(&new_extension).is_some() {
        session.out.error(&format!(
            "{} already exists as another entry in extension categories",
            value(&new_extension)
        ))?;
        return Ok(Transition::Stay);
    }

    let category = match read_category(session)? {
        None => return Ok(Transition::Quit),
        Some(None) => return Ok(Transition::Stay),
        Some(Some(category)) => category,
    };

    let settings = session.settings_mut();
    settings.remove_extension_category(&extension);
    settings.set_extension_category(&new_extension, &category)?;
    session.out.success(&format!(
        "Edited to {} - {}",
        value(&new_extension),
        value(&category)
    ))?;
    session.save_settings()?;
    show_categories(session)?;
    Ok(Transition::Stay)
}

fn remove_category<R: BufRead, W: Write>(
    session: &mut Session<R, W>,
) -> Result<Transition, SessionError> {
    session
        .out
        .prompt("Pick an extension to remove its entry: ")?;
    show_categories(session)?;
    let Some(input) = session.read_value()? else {
        return Ok(Transition::Quit);
    };
    let extension = normalize_extension(&input);

    match session.settings_mut().remove_extension_category(&extension) {
        Some(category) => {
            session.out.success(&format!(
                "Removed {} - {}",
                value(extension_label(&extension)),
                value(&category)
            ))?;
            session.save_settings()?;
            show_categories(session)?;
        }
        None => session.out.error(&format!(
            "{} not contained in extension categories",
            value(extension_label(&extension))
        ))?,
    }
    Ok(Transition::Stay)
}

fn show_subdirectories<R: BufRead, W: Write>(
    session: &mut Session<R, W>,
) -> Result<(), SessionError> {
    let subdirectories = derive_subdirectories(&session.settings().extension_categories);
    session.out.success("Subdirectories: ")?;
    for name in &subdirectories {
        session.out.plain(&format!("  - {}", value(name)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::output::OutputFormatter;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn session_with(dir: &Path, answers: &str) -> Session<Cursor<Vec<u8>>, Vec<u8>> {
        let settings = Settings {
            source_path: dir.to_path_buf(),
            destination_path: dir.to_path_buf(),
            excluded_extensions: [".tmp".to_string()].into(),
            extension_categories: [(".pdf".to_string(), "Documents".to_string())].into(),
        };
        Session::new(
            settings,
            dir.join("settings.json"),
            Cursor::new(answers.as_bytes().to_vec()),
            OutputFormatter::new(Vec::new()),
        )
    }

    #[test]
    fn test_every_menu_has_a_way_back() {
        let menus = [
            MenuId::Home,
            MenuId::Sort,
            MenuId::Settings,
            MenuId::Source,
            MenuId::Destination,
            MenuId::Excluded,
            MenuId::Categories,
            MenuId::Issues,
            MenuId::FailedMoves,
            MenuId::Unrecognised,
        ];
        for menu in menus {
            assert!(
                menu.commands().iter().any(|(_, a)| *a == Action::Back),
                "{:?} has no back command",
                menu
            );
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(MenuId::Home.lookup("SETTINGS"), Some(Action::Open(MenuId::Settings)));
        assert_eq!(MenuId::Home.lookup(" exit "), Some(Action::Back));
        assert_eq!(MenuId::Home.lookup("source"), None);
    }

    #[test]
    fn test_unknown_command_redisplays_menu() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session_with(temp_dir.path(), "dance\nexit\n");
        run_menu(&mut session).unwrap();

        let text = String::from_utf8(session.into_output()).unwrap();
        assert!(text.contains("Invalid choice"));
        assert_eq!(text.matches("Pick one of these options").count(), 2);
    }

    #[test]
    fn test_add_excluded_extension_saves() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session_with(
            temp_dir.path(),
            "settings\nexcluded\nadd\nPART\nback\nback\nexit\n",
        );
        run_menu(&mut session).unwrap();

        assert!(session.settings().excluded_extensions.contains(".part"));
        let saved = Settings::load(&temp_dir.path().join("settings.json"));
        assert!(saved.excluded_extensions.contains(".part"));
    }

    #[test]
    fn test_add_and_edit_category() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session_with(
            temp_dir.path(),
            "settings\ncategories\nadd\nepub\nbooks\nedit\n.epub\nmobi\nebooks\nback\nback\nexit\n",
        );
        run_menu(&mut session).unwrap();

        assert_eq!(session.settings().category_for(".epub"), None);
        assert_eq!(session.settings().category_for(".mobi"), Some("Ebooks"));
    }

    #[test]
    fn test_edit_rejects_collision() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session_with(temp_dir.path(), "pdf\ndoc\n");
        session
            .settings_mut()
            .set_extension_category(".doc", "Documents")
            .unwrap();

        assert_eq!(
            perform(&mut session, Action::EditCategory).unwrap(),
            Transition::Stay
        );
        assert_eq!(session.settings().category_for(".pdf"), Some("Documents"));
        let text = String::from_utf8(session.into_output()).unwrap();
        assert!(text.contains("already exists as another entry"));
    }

    #[test]
    fn test_set_source_rejects_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session_with(temp_dir.path(), "/no/such/dir\n");

        perform(&mut session, Action::SetSource).unwrap();
        assert_eq!(session.settings().source_path, temp_dir.path());
    }

    #[test]
    fn test_sort_with_missing_destination_keeps_menu_running() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session_with(temp_dir.path(), "");
        session.settings_mut().destination_path = temp_dir.path().join("missing");

        assert_eq!(perform(&mut session, Action::Sort).unwrap(), Transition::Stay);
        assert!(session.organizer().is_none());
    }

    #[test]
    fn test_sort_then_resolve_from_issues_menu() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("in");
        let dest = temp_dir.path().join("out");
        fs::create_dir(&source).unwrap();
        fs::create_dir(&dest).unwrap();
        fs::write(source.join("notes.org"), "x").unwrap();

        // Subdirectories: Documents=0, Other=1
        let mut session = session_with(
            temp_dir.path(),
            "sort\nsort\nback\nissues\nunrecognised\nadd\n0\nback\nback\nexit\n",
        );
        session.settings_mut().source_path = source.clone();
        session.settings_mut().destination_path = dest.clone();
        run_menu(&mut session).unwrap();

        assert!(dest.join("Other").join("notes.org").exists());
        assert_eq!(session.settings().category_for(".org"), Some("Documents"));
    }

    #[test]
    fn test_end_of_input_ends_menu() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session_with(temp_dir.path(), "settings\n");
        assert!(run_menu(&mut session).is_ok());
    }
}
