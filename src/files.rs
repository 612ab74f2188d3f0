// File selection and discovery.
// `FileSelection` is the "files" value the upload form hands to the
// uploader. The discovery helpers find checkpoint-like files inside a
// Stable Diffusion web UI install so the terminal UI can offer them.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Extensions considered worth backing up.
pub const BACKUP_EXTENSIONS: &[&str] = &["safetensors", "ckpt", "pt", "bin", "zip", "jpg", "png"];

/// Well-known web UI folders that usually hold models and embeddings.
const MODEL_DIRS: &[&str] = &[
    "models/Stable-diffusion",
    "models/Lora",
    "embeddings",
    "extensions",
    "textual_inversion",
];

/// A single local file picked for upload. `name` is also the path the file
/// gets inside the repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
}

impl SelectedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        SelectedFile { path, name }
    }
}

/// Zero or more files, kept in the order they were picked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileSelection(Vec<SelectedFile>);

impl FileSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        FileSelection(paths.into_iter().map(SelectedFile::new).collect())
    }

    pub fn push(&mut self, file: SelectedFile) {
        self.0.push(file);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SelectedFile> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> Vec<&Path> {
        self.0.iter().map(|f| f.path.as_path()).collect()
    }
}

impl From<Vec<SelectedFile>> for FileSelection {
    fn from(files: Vec<SelectedFile>) -> Self {
        FileSelection(files)
    }
}

impl IntoIterator for FileSelection {
    type Item = SelectedFile;
    type IntoIter = std::vec::IntoIter<SelectedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FileSelection {
    type Item = &'a SelectedFile;
    type IntoIter = std::slice::Iter<'a, SelectedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for FileSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|s| s.name.as_str()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// A file found while scanning a directory. `label` is the path relative to
/// the scanned directory and is what gets shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub path: PathBuf,
    pub label: String,
}

fn has_backup_extension(name: &str) -> bool {
    let lower = name.to_lowercase();
    BACKUP_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}

/// Recursively list backup candidates under `dir`, sorted by label
/// (case-insensitive). A missing directory yields an empty list.
pub fn files_in_directory(dir: &Path) -> Vec<DirectoryEntry> {
    if dir.as_os_str().is_empty() || !dir.exists() {
        return Vec::new();
    }

    let mut entries: Vec<DirectoryEntry> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| has_backup_extension(&e.file_name().to_string_lossy()))
        .map(|e| {
            let path = e.into_path();
            let label = path
                .strip_prefix(dir)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            DirectoryEntry { path, label }
        })
        .collect();

    entries.sort_by_key(|e| e.label.to_lowercase());
    debug!(dir = %dir.display(), found = entries.len(), "scanned directory");
    entries
}

/// Non-recursive `*.ext` match inside `dir`, sorted by path.
pub fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let ext = ext.trim_start_matches('.');
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map(|e| e == ext).unwrap_or(false))
        .collect()
}

/// The well-known model folders that exist under `base`, sorted.
pub fn model_directories(base: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = MODEL_DIRS
        .iter()
        .map(|d| base.join(d))
        .filter(|d| d.is_dir())
        .collect();
    dirs.sort();
    dirs
}
