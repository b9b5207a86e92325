use std::path::{Path, PathBuf};

use crate::error::ScanError;
use crate::models::{DirectoryEntry, MediaEntry};

/// The media found directly inside one directory, in natural order.
///
/// Rebuilt wholesale on every selection; there is no incremental diffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCatalog {
    root: PathBuf,
    directories: Vec<DirectoryEntry>,
    entries: Vec<MediaEntry>,
}

impl MediaCatalog {
    /// Entries and directories must already be sorted.
    pub(crate) fn new(
        root: PathBuf,
        directories: Vec<DirectoryEntry>,
        entries: Vec<MediaEntry>,
    ) -> Self {
        Self {
            root,
            directories,
            entries,
        }
    }

    pub fn empty(root: PathBuf) -> Self {
        Self::new(root, Vec::new(), Vec::new())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn directories(&self) -> &[DirectoryEntry] {
        &self.directories
    }

    pub fn entries(&self) -> &[MediaEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<MediaEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self, path: &Path) -> Option<usize> {
        self.entries.iter().position(|e| e.path() == path)
    }

    /// Display name of the root, used in status messages.
    pub fn root_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.to_string_lossy().into_owned())
    }
}

/// Outcome of a directory scan. A failed scan still carries an (empty) catalog.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub catalog: MediaCatalog,
    pub error: Option<ScanError>,
}

impl ScanReport {
    pub fn ok(catalog: MediaCatalog) -> Self {
        Self {
            catalog,
            error: None,
        }
    }

    pub fn failed(root: PathBuf, error: ScanError) -> Self {
        Self {
            catalog: MediaCatalog::empty(root),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
