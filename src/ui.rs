// UI layer: an interactive menu built on `dialoguer`.
// `TerminalFields` is the terminal rendition of the upload form: it asks
// for the four values once and then serves them through `FormFields`.

use crate::files::{files_in_directory, model_directories, FileSelection, SelectedFile};
use crate::form::{FormFields, UploadForm};
use crate::hub::HubClient;
use crate::settings::Settings;
use crate::verify::verify_setup;
use anyhow::Result;
use dialoguer::{Confirm, Input, MultiSelect, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, warn};
use tracing_subscriber::fmt::MakeWriter;

/// Spinner currently on screen, if any. Log output pauses it while writing.
static ACTIVE_SPINNER: Mutex<Option<ProgressBar>> = Mutex::new(None);

fn active_spinner() -> Option<ProgressBar> {
    ACTIVE_SPINNER.lock().ok().and_then(|slot| slot.clone())
}

/// stderr log writer that clears the active spinner line before writing, so
/// log lines never land behind "Uploading...".
#[derive(Clone, Copy, Debug, Default)]
pub struct LogWriter;

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match active_spinner() {
            Some(pb) => pb.suspend(|| io::stderr().write_all(buf))?,
            None => io::stderr().write_all(buf)?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        *self
    }
}

/// A registered spinner; cleared from the screen and the registry on drop.
struct Spinner(ProgressBar);

impl Spinner {
    fn start(msg: &'static str) -> Result<Self> {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
        pb.set_message(msg);
        pb.enable_steady_tick(Duration::from_millis(100));
        Ok(Self::register(pb))
    }

    fn register(pb: ProgressBar) -> Self {
        if let Ok(mut slot) = ACTIVE_SPINNER.lock() {
            *slot = Some(pb.clone());
        }
        Spinner(pb)
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.0.finish_and_clear();
        if let Ok(mut slot) = ACTIVE_SPINNER.lock() {
            *slot = None;
        }
    }
}

/// Where the file list comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileSource {
    Dialog,
    Directory,
    Typed,
    Nothing,
}

impl FileSource {
    const ALL: [FileSource; 4] = [
        FileSource::Dialog,
        FileSource::Directory,
        FileSource::Typed,
        FileSource::Nothing,
    ];

    fn label(self) -> &'static str {
        match self {
            FileSource::Dialog => "Pick files in a dialog",
            FileSource::Directory => "Scan a directory",
            FileSource::Typed => "Type file paths",
            FileSource::Nothing => "No files",
        }
    }
}

/// Form values captured from the terminal.
pub struct TerminalFields {
    username: String,
    repository: String,
    write_key: String,
    files: FileSelection,
}

impl TerminalFields {
    /// Ask for every field. `source` skips the "where are the files" question.
    pub fn prompt(settings: &Settings, source: Option<FileSource>) -> Result<Self> {
        let username = text("Hugging Face username", &settings.default_username)?;
        let repository = text("Hugging Face repository", &settings.default_repo)?;
        // Empty is allowed; the stored key is used then.
        let write_key = Password::new()
            .with_prompt("Hugging Face write key (empty = stored key)")
            .allow_empty_password(true)
            .interact()?;

        let source = match source {
            Some(s) => s,
            None => {
                let labels: Vec<&str> = FileSource::ALL.iter().map(|s| s.label()).collect();
                let idx = Select::new()
                    .with_prompt("Files")
                    .items(&labels)
                    .default(0)
                    .interact()?;
                FileSource::ALL[idx]
            }
        };
        let files = pick_files(source)?;

        Ok(TerminalFields {
            username,
            repository,
            write_key,
            files,
        })
    }
}

impl FormFields for TerminalFields {
    fn username(&self) -> String {
        self.username.clone()
    }

    fn repository(&self) -> String {
        self.repository.clone()
    }

    fn write_key(&self) -> String {
        self.write_key.clone()
    }

    fn files(&self) -> FileSelection {
        self.files.clone()
    }
}

/// Text prompt that accepts empty input and shows `default` when there is one.
fn text(prompt: &str, default: &str) -> Result<String> {
    let mut input = Input::<String>::new();
    input.with_prompt(prompt).allow_empty(true);
    if !default.is_empty() {
        input.default(default.to_string());
    }
    Ok(input.interact_text()?)
}

fn pick_files(source: FileSource) -> Result<FileSelection> {
    match source {
        FileSource::Dialog => {
            // `None` means the dialog was cancelled.
            let picked = rfd::FileDialog::new()
                .set_title("Files to upload")
                .pick_files()
                .unwrap_or_default();
            Ok(FileSelection::from_paths(picked))
        }
        FileSource::Directory => pick_from_directory(),
        FileSource::Typed => {
            let line = text("File paths (comma separated)", "")?;
            Ok(FileSelection::from_paths(
                line.split(',').map(str::trim).filter(|p| !p.is_empty()),
            ))
        }
        FileSource::Nothing => Ok(FileSelection::new()),
    }
}

/// Choose a directory (offering the web UI model folders when the path is a
/// web UI install), then tick files inside it.
fn pick_from_directory() -> Result<FileSelection> {
    let base = PathBuf::from(text("Directory or web UI path", ".")?);

    let mut dirs = model_directories(&base);
    let dir = if dirs.is_empty() {
        base
    } else {
        dirs.insert(0, base);
        let labels: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
        let idx = Select::new()
            .with_prompt("Select directory")
            .items(&labels)
            .default(0)
            .interact()?;
        dirs.swap_remove(idx)
    };

    let entries = files_in_directory(&dir);
    if entries.is_empty() {
        println!("No files to back up in {}", dir.display());
        return Ok(FileSelection::new());
    }

    let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
    let chosen = MultiSelect::new()
        .with_prompt("Available files (space to select)")
        .items(&labels)
        .interact()?;
    debug!(dir = %dir.display(), chosen = chosen.len(), "picked files");

    Ok(chosen
        .into_iter()
        .map(|i| SelectedFile::new(entries[i].path.clone()))
        .collect::<Vec<_>>()
        .into())
}

/// Run one submission of the form with a spinner on screen.
pub fn run_upload(rt: &Runtime, settings: &Settings, source: Option<FileSource>) -> Result<()> {
    let fields = TerminalFields::prompt(settings, source)?;
    let form = UploadForm::new(HubClient::new(settings.clone())?);

    let _spinner = Spinner::start("Uploading...")?;
    rt.block_on(form.submit(&fields));
    Ok(())
}

/// Prompt for each stored setting and save the result to `path`.
pub fn edit_settings(settings: &mut Settings, path: &Path) -> Result<()> {
    settings.default_username = text("Default username", &settings.default_username)?;
    settings.default_repo = text("Default repository", &settings.default_repo)?;
    settings.commit_message = text("Commit message", &settings.commit_message)?;
    settings.endpoint = text("Hub endpoint", &settings.endpoint)?;

    let key = Password::new()
        .with_prompt("Write key (empty = keep current)")
        .allow_empty_password(true)
        .interact()?;
    if !key.is_empty() {
        settings.write_key = key;
    }

    settings.create_pr = Confirm::new()
        .with_prompt("Open a pull request instead of committing to main?")
        .default(settings.create_pr)
        .interact()?;
    settings.private = Confirm::new()
        .with_prompt("Create new repositories as private?")
        .default(settings.private)
        .interact()?;

    settings.save_to(path)?;
    println!("Settings saved to {}", path.display());
    Ok(())
}

/// Print the setup report. Returns false when any check failed.
pub fn run_verify(rt: &Runtime, settings: &Settings, path: &Path) -> Result<bool> {
    let client = HubClient::new(settings.clone())?;
    let spinner = Spinner::start("Checking setup...")?;
    let checks = rt.block_on(verify_setup(path, &client));
    drop(spinner);

    for check in &checks {
        println!("{}", check.styled());
    }
    Ok(!checks.iter().any(|c| c.is_fail()))
}

/// Main interactive menu. Runs until the user picks "Exit".
pub fn main_menu(rt: &Runtime, mut settings: Settings, settings_path: &Path) -> Result<()> {
    loop {
        let items = vec!["Upload files", "Browse directory", "Settings", "Verify setup", "Exit"];
        let selection = Select::new().items(&items).default(0).interact()?;
        let outcome = match selection {
            0 => run_upload(rt, &settings, None),
            1 => run_upload(rt, &settings, Some(FileSource::Directory)),
            2 => edit_settings(&mut settings, settings_path),
            3 => run_verify(rt, &settings, settings_path).map(|_| ()),
            4 => break,
            _ => Ok(()),
        };
        // A failed prompt or save shouldn't end the session.
        if let Err(e) = outcome {
            warn!("{:#}", e);
        }
    }
    Ok(())
}
