//! File scanner for building media catalogs.
//!
//! This module provides the `FileScanner` struct which handles:
//! - One-level directory listing using walkdir (children are never walked eagerly)
//! - Media type detection by file extension
//! - Natural ordering of media and subdirectories
//! - An async wrapper that runs the scan on a blocking task
//!
//! Scans never fail past this boundary: an unreadable root yields an empty
//! catalog together with a `ScanError` in the returned `ScanReport`.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use tokio::task;
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

use crate::error::ScanError;
use crate::models::{DirectoryEntry, MediaCatalog, MediaEntry, ScanReport};
use crate::scanner::natural_order;

/// Configuration for the file scanner.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to follow symbolic links when classifying children.
    pub follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: true,
        }
    }
}

/// How a directory child was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Classified {
    Directory(DirectoryEntry),
    Media(MediaEntry),
    Ignored,
}

/// Scanner for media directories.
#[derive(Debug, Clone, Default)]
pub struct FileScanner {
    config: ScanConfig,
}

impl FileScanner {
    /// Creates a new file scanner with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new file scanner with custom configuration.
    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Lists the immediate children of `dir`: subdirectories and supported media.
    pub fn scan(&self, dir: &Path) -> ScanReport {
        match self.try_scan(dir) {
            Ok(catalog) => {
                info!(
                    root = ?dir,
                    media = catalog.len(),
                    directories = catalog.directories().len(),
                    "Scan complete"
                );
                ScanReport::ok(catalog)
            }
            Err(e) => {
                warn!(root = ?dir, error = %e, "Scan failed");
                ScanReport::failed(dir.to_path_buf(), e)
            }
        }
    }

    /// Gathers the media directly inside a subdirectory the user drilled into.
    ///
    /// The resulting entries form the active media list for single and strip
    /// reading. Nested directories are listed in the catalog but not entered.
    pub fn expand(&self, directory: &DirectoryEntry) -> ScanReport {
        debug!(dir = ?directory.path(), "Expanding directory");
        self.scan(directory.path())
    }

    /// Runs `scan` on a blocking task so async shells are not stalled.
    pub async fn scan_async(&self, dir: PathBuf) -> ScanReport {
        let scanner = self.clone();
        let root = dir.clone();
        match task::spawn_blocking(move || scanner.scan(&dir)).await {
            Ok(report) => report,
            Err(e) => {
                warn!(root = ?root, error = %e, "Scan task failed");
                let reason = format!("scan task failed: {}", e);
                ScanReport::failed(root.clone(), ScanError::Unreadable { path: root, reason })
            }
        }
    }

    fn try_scan(&self, dir: &Path) -> Result<MediaCatalog, ScanError> {
        let metadata = std::fs::metadata(dir).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ScanError::NotFound(dir.to_path_buf()),
            _ => ScanError::Unreadable {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            },
        })?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(dir.to_path_buf()));
        }

        let mut directories = Vec::new();
        let mut media = Vec::new();

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(self.config.follow_symlinks);

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    // Failing to open the root itself means the whole scan failed.
                    if e.depth() == 0 || e.path() == Some(dir) {
                        return Err(ScanError::Unreadable {
                            path: dir.to_path_buf(),
                            reason: e.to_string(),
                        });
                    }
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            match Self::classify(entry.path(), entry.file_type()) {
                Classified::Directory(d) => directories.push(d),
                Classified::Media(m) => media.push(m),
                Classified::Ignored => trace!(path = ?entry.path(), "Ignoring unsupported file"),
            }
        }

        media.sort_by(|a, b| order_by_name(a.display_name(), a.path(), b.display_name(), b.path()));
        directories
            .sort_by(|a, b| order_by_name(a.display_name(), a.path(), b.display_name(), b.path()));

        Ok(MediaCatalog::new(dir.to_path_buf(), directories, media))
    }

    fn classify(path: &Path, file_type: std::fs::FileType) -> Classified {
        if file_type.is_dir() {
            return Classified::Directory(DirectoryEntry::new(path.to_path_buf()));
        }
        if !file_type.is_file() {
            return Classified::Ignored;
        }
        match MediaEntry::from_path(path.to_path_buf()) {
            Some(entry) => Classified::Media(entry),
            None => Classified::Ignored,
        }
    }
}

/// Natural order on the display name, falling back to the raw path so that
/// names equal under natural order ("01.png" and "1.png") still sort the same
/// way on every scan.
fn order_by_name(a_name: &str, a_path: &Path, b_name: &str, b_path: &Path) -> Ordering {
    natural_order::compare(a_name, b_name).then_with(|| a_path.cmp(b_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    fn names(report: &ScanReport) -> Vec<&str> {
        report
            .catalog
            .entries()
            .iter()
            .map(|e| e.display_name())
            .collect()
    }

    #[test]
    fn test_scan_orders_naturally() {
        let tmp = TempDir::new().unwrap();
        for name in ["10.png", "1.png", "2.png"] {
            touch(tmp.path(), name);
        }

        let report = FileScanner::new().scan(tmp.path());
        assert!(report.is_ok());
        assert_eq!(names(&report), vec!["1.png", "2.png", "10.png"]);
    }

    #[test]
    fn test_scan_classifies_children() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.JPG");
        touch(tmp.path(), "clip.webm");
        touch(tmp.path(), "notes.txt");
        touch(tmp.path(), "movie.mp4");
        fs::create_dir(tmp.path().join("chapter 2")).unwrap();
        fs::create_dir(tmp.path().join("chapter 10")).unwrap();
        // Nested media must not be walked.
        touch(&tmp.path().join("chapter 2"), "inner.png");

        let report = FileScanner::new().scan(tmp.path());
        assert_eq!(names(&report), vec!["a.JPG", "clip.webm"]);
        assert_eq!(report.catalog.entries()[0].kind(), MediaKind::Image);
        assert_eq!(report.catalog.entries()[1].kind(), MediaKind::Video);

        let dirs: Vec<&str> = report
            .catalog
            .directories()
            .iter()
            .map(|d| d.display_name())
            .collect();
        assert_eq!(dirs, vec!["chapter 2", "chapter 10"]);
    }

    #[test]
    fn test_directory_named_like_media_is_a_directory() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("cover.png")).unwrap();

        let report = FileScanner::new().scan(tmp.path());
        assert!(report.catalog.is_empty());
        assert_eq!(report.catalog.directories().len(), 1);
    }

    #[test]
    fn test_scan_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        for name in ["b.png", "A.png", "a.png", "01.png", "1.png", "c10.gif", "c9.bmp"] {
            touch(tmp.path(), name);
        }

        let scanner = FileScanner::new();
        let first = scanner.scan(tmp.path());
        let second = scanner.scan(tmp.path());
        assert_eq!(first.catalog, second.catalog);
    }

    #[test]
    fn test_expand_gathers_direct_children() {
        let tmp = TempDir::new().unwrap();
        let chapter = tmp.path().join("ch01");
        fs::create_dir(&chapter).unwrap();
        touch(&chapter, "p3.webp");
        touch(&chapter, "p1.png");
        fs::create_dir(chapter.join("extras")).unwrap();
        touch(&chapter.join("extras"), "bonus.png");

        let scanner = FileScanner::new();
        let top = scanner.scan(tmp.path());
        let dir = &top.catalog.directories()[0];
        let expanded = scanner.expand(dir);

        assert!(expanded.is_ok());
        assert_eq!(names(&expanded), vec!["p1.png", "p3.webp"]);
        assert_eq!(expanded.catalog.root(), chapter.as_path());
    }

    #[test]
    fn test_missing_directory_degrades_to_empty() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("gone");

        let report = FileScanner::new().scan(&missing);
        assert!(report.catalog.is_empty());
        assert_eq!(report.error, Some(ScanError::NotFound(missing)));
    }

    #[test]
    fn test_file_root_is_not_a_directory() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "single.png");
        let file = tmp.path().join("single.png");

        let report = FileScanner::new().scan(&file);
        assert!(report.catalog.is_empty());
        assert_eq!(report.error, Some(ScanError::NotADirectory(file)));
    }

    #[tokio::test]
    async fn test_scan_async_matches_sync() {
        let tmp = TempDir::new().unwrap();
        for name in ["3.png", "20.png", "100.png"] {
            touch(tmp.path(), name);
        }

        let scanner = FileScanner::new();
        let sync = scanner.scan(tmp.path());
        let async_report = scanner.scan_async(tmp.path().to_path_buf()).await;
        assert_eq!(sync.catalog, async_report.catalog);
        assert_eq!(names(&async_report), vec!["3.png", "20.png", "100.png"]);
    }
}
