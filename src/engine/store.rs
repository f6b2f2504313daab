use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use regex::Regex;

use crate::model::error::NotebookError;
use crate::model::notebook::Notebook;

/// Policies the store applies when resolving and recovering notebooks.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Overwrite a corrupt file with the empty replacement as soon as it is loaded.
    /// When false the corrupt file stays until the next successful save.
    pub persist_corrupt_recovery: bool,
    /// Only accept names that are a single plain file name.
    pub strict_names: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            persist_corrupt_recovery: false,
            strict_names: true,
        }
    }
}

/// Maps notebook names to files under `root`.
///
/// Every operation reads the file fresh; nothing is cached between calls. Writes go through a
/// temporary file in the target directory followed by a rename, so readers see either the old or
/// the new document. Two concurrent read-modify-write cycles can still overwrite each other.
#[derive(Debug, Clone)]
pub struct NotebookStore {
    root: PathBuf,
    options: StoreOptions,
}

fn safe_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_. -]{0,254}$").expect("static notebook name pattern")
    })
}

impl NotebookStore {
    pub fn new(root: impl Into<PathBuf>, options: StoreOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, NotebookError> {
        if name.trim().is_empty() {
            return Err(NotebookError::InvalidArgument(
                "notebook_name must not be empty".to_string(),
            ));
        }
        if self.options.strict_names && !safe_name_pattern().is_match(name) {
            return Err(NotebookError::InvalidArgument(format!(
                "Invalid notebook_name '{}': use a plain file name without path separators",
                name
            )));
        }
        Ok(self.root.join(name))
    }

    /// Load `name`, creating an empty notebook on first reference.
    /// A file that does not parse is replaced by an empty notebook in memory.
    pub fn load(&self, name: &str) -> Result<Notebook, NotebookError> {
        let path = self.path_for(name)?;

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::info!("Notebook '{}' not found. Creating a new one.", name);
                let notebook = Notebook::default();
                write_notebook(&path, &notebook)?;
                return Ok(notebook);
            }
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!("read notebook {}", path.display()))
                    .into())
            }
        };

        match Notebook::from_slice(&bytes) {
            Ok(notebook) => Ok(notebook),
            Err(err) => {
                log::warn!(
                    "Notebook '{}' is empty or corrupted ({}). Initializing a new notebook.",
                    name,
                    err
                );
                let notebook = Notebook::default();
                if self.options.persist_corrupt_recovery {
                    write_notebook(&path, &notebook)?;
                }
                Ok(notebook)
            }
        }
    }

    pub fn save(&self, notebook: &Notebook, name: &str) -> Result<(), NotebookError> {
        let path = self.path_for(name)?;
        write_notebook(&path, notebook)
    }
}

fn write_notebook(path: &Path, notebook: &Notebook) -> Result<(), NotebookError> {
    let bytes = notebook.to_bytes().context("serialize notebook")?;
    write_atomic(path, &bytes)?;
    Ok(())
}

/// Write `bytes` to a temp file next to `path`, then rename it over `path`.
/// The temp file is removed if any step fails.
fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("create notebook dir {}", dir.display()))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".notebook-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("write temp file {}", tmp.path().display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("sync temp file {}", tmp.path().display()))?;

    // Dropping the PersistError's file handle deletes the temp file.
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
