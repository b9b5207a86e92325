use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a file extension (without the dot), case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "webp" => Some(Self::Image),
            "webm" => Some(Self::Video),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// A displayable file. Identity is the path; entries are never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaEntry {
    path: PathBuf,
    kind: MediaKind,
    display_name: String,
}

impl MediaEntry {
    pub fn new(path: PathBuf, kind: MediaKind) -> Self {
        let display_name = display_name_of(&path);
        Self {
            path,
            kind,
            display_name,
        }
    }

    /// Build an entry when the path has a supported extension.
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let kind = MediaKind::from_path(&path)?;
        Some(Self::new(path, kind))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }
}

/// A child directory shown in the browse tree. Listed, never walked eagerly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectoryEntry {
    path: PathBuf,
    display_name: String,
}

impl DirectoryEntry {
    pub fn new(path: PathBuf) -> Self {
        let display_name = display_name_of(&path);
        Self { path, display_name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

fn display_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
