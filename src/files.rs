//! Filesystem storage for uploaded files.
//!
//! Files live at `<root>/<category>/<uuid>_<original name>`. Stored paths are
//! relative to the root and use `/` separators so they can be persisted as-is.
//! Every path is joined through a [`PathBoundary`] so nothing resolves outside
//! the root.

use std::path::PathBuf;

use strict_path::{PathBoundary, StrictPath, StrictPathError};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Directory for files attached to report values.
pub const VALUE_ATTACHMENTS: &str = "report-attachments";

/// Directory for uploaded Jendo report PDFs.
pub const JENDO_REPORTS: &str = "jendo-reports";

/// Longest file name most filesystems accept, in bytes.
const MAX_FILE_NAME_BYTES: usize = 255;

/// Extensions longer than this are truncated along with the stem.
const MAX_KEPT_EXTENSION_BYTES: usize = 16;

/// A file written by [`FileStore::store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Path relative to the store root, e.g. `jendo-reports/<uuid>_scan.pdf`
    pub path: String,
    /// Generated file name, e.g. `<uuid>_scan.pdf`
    pub file_name: String,
    /// Sanitized original name
    pub original_name: String,
    pub size: u64,
}

#[derive(Debug)]
pub enum StorageError {
    /// Name or path is unusable
    InvalidInput(String),
    /// File missing or not a regular file
    NotFound,
    /// Target exists and overwriting was not requested
    AlreadyExists,
    Io(std::io::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            StorageError::NotFound => write!(f, "File not found"),
            StorageError::AlreadyExists => write!(f, "File already exists"),
            StorageError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound,
            std::io::ErrorKind::AlreadyExists => StorageError::AlreadyExists,
            _ => StorageError::Io(e),
        }
    }
}

impl From<StrictPathError> for StorageError {
    fn from(e: StrictPathError) -> Self {
        match e {
            StrictPathError::InvalidRestriction { source, .. } => StorageError::Io(source),
            other => StorageError::InvalidInput(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    boundary: PathBoundary,
}

impl FileStore {
    /// Open the store at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let boundary = PathBoundary::try_new_create(root.into())?;
        Ok(Self { boundary })
    }

    /// Write `bytes` under `category` with a freshly generated unique name.
    pub async fn store(
        &self,
        category: &str,
        original_name: &str,
        bytes: &[u8],
        overwrite: bool,
    ) -> Result<StoredFile, StorageError> {
        let original_name = sanitize_file_name(original_name)
            .ok_or_else(|| StorageError::InvalidInput("file name is empty".into()))?;

        let id = Uuid::new_v4().to_string();
        let budget = MAX_FILE_NAME_BYTES - id.len() - 1;
        let file_name = format!("{}_{}", id, fit_file_name(&original_name, budget));
        let relative = format!("{}/{}", category, file_name);

        let dir = self.boundary.strict_join(category)?;
        if dir.interop_path() == self.boundary.interop_path() {
            return Err(StorageError::InvalidInput(format!(
                "bad category: {}",
                category
            )));
        }
        fs::create_dir_all(dir.interop_path()).await?;

        let target = dir.strict_join(&file_name)?;
        debug!(path = %relative, size = bytes.len(), "Storing file");

        let mut options = fs::OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        let mut file = options.open(target.interop_path()).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;

        Ok(StoredFile {
            path: relative,
            file_name,
            original_name,
            size: bytes.len() as u64,
        })
    }

    /// Read a stored file by its relative path.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let target = self.resolve(path)?;
        let metadata = fs::metadata(target.interop_path()).await?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound);
        }
        Ok(fs::read(target.interop_path()).await?)
    }

    /// Remove a stored file. Missing files are ignored, other failures are logged.
    pub async fn remove(&self, path: &str) {
        let target = match self.resolve(path) {
            Ok(p) => p,
            Err(e) => {
                warn!(path = %path, error = %e, "Refusing to remove file");
                return;
            }
        };

        match fs::remove_file(target.interop_path()).await {
            Ok(()) => debug!(path = %path, "Removed file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path, error = %e, "Failed to remove file"),
        }
    }

    fn resolve(&self, path: &str) -> Result<StrictPath, StorageError> {
        if path.is_empty() {
            return Err(StorageError::InvalidInput("empty path".into()));
        }
        Ok(self.boundary.strict_join(path)?)
    }
}

/// Reduce a client-supplied file name to its last path component.
/// Returns `None` when nothing usable is left.
fn sanitize_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return None;
    }
    Some(cleaned.to_string())
}

/// Shorten `name` to at most `max_bytes`, keeping a short extension intact.
fn fit_file_name(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }

    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_KEPT_EXTENSION_BYTES => name.split_at(dot),
        _ => (name, ""),
    };

    let mut end = max_bytes - extension.len();
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &stem[..end], extension)
}
