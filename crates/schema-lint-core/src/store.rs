//! Resource stores: where documents are read from.
//!
//! A resource is identified by its path. [`FsStore`] reads the filesystem;
//! [`MemoryStore`] serves in-memory buffers (unsaved editor contents, tests).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use thiserror::Error;

/// Errors raised by a [`ResourceStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The resource does not exist (any more).
    #[error("resource not found: {0}")]
    NotFound(PathBuf),

    /// The resource exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Resource being read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

impl StoreError {
    fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Returns `true` if the resource has vanished.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Access to the documents being validated.
pub trait ResourceStore: Send + Sync {
    /// Returns `true` if `id` names an existing file resource.
    fn exists(&self, id: &Path) -> bool;

    /// Reads the full content of `id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the resource vanished, [`StoreError::Io`]
    /// for any other failure.
    fn read(&self, id: &Path) -> Result<Vec<u8>, StoreError>;

    /// File resources in the same folder as `id`, `id` included.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be listed.
    fn siblings_of(&self, id: &Path) -> Result<Vec<PathBuf>, StoreError>;

    /// The resource's file name, case preserved.
    fn name_of(&self, id: &Path) -> String {
        id.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The resource's extension without the dot, if any.
    fn extension_of(&self, id: &Path) -> Option<String> {
        id.extension().map(|e| e.to_string_lossy().into_owned())
    }

    /// The project that owns `id`.
    fn project_of(&self, id: &Path) -> PathBuf {
        id.parent().map(Path::to_path_buf).unwrap_or_default()
    }
}

/// Filesystem-backed store rooted at a project directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Creates a store for the project rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResourceStore for FsStore {
    fn exists(&self, id: &Path) -> bool {
        id.is_file()
    }

    fn read(&self, id: &Path) -> Result<Vec<u8>, StoreError> {
        std::fs::read(id).map_err(|e| StoreError::from_io(id, e))
    }

    fn siblings_of(&self, id: &Path) -> Result<Vec<PathBuf>, StoreError> {
        let parent = id.parent().unwrap_or_else(|| Path::new("."));
        let entries = std::fs::read_dir(parent).map_err(|e| StoreError::from_io(parent, e))?;

        let mut siblings = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::from_io(parent, e))?.path();
            if path.is_file() {
                siblings.push(path);
            }
        }
        siblings.sort();
        Ok(siblings)
    }

    fn project_of(&self, _id: &Path) -> PathBuf {
        self.root.clone()
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a document.
    pub fn insert(&self, id: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.files
            .write()
            .insert(id.into(), content.into());
    }

    /// Removes a document. Returns `true` if it existed.
    pub fn remove(&self, id: &Path) -> bool {
        self.files
            .write()
            .remove(id)
            .is_some()
    }
}

impl ResourceStore for MemoryStore {
    fn exists(&self, id: &Path) -> bool {
        self.files
            .read()
            .contains_key(id)
    }

    fn read(&self, id: &Path) -> Result<Vec<u8>, StoreError> {
        self.files
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_path_buf()))
    }

    fn siblings_of(&self, id: &Path) -> Result<Vec<PathBuf>, StoreError> {
        let parent = id.parent();
        Ok(self
            .files
            .read()
            .keys()
            .filter(|p| p.parent() == parent)
            .cloned()
            .collect())
    }
}
