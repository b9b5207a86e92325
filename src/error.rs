//! Error types for the stripview core.
//!
//! Every failure here is recoverable: the worst outcome is an empty catalog or a
//! strip with some slots showing an error marker.

use std::path::PathBuf;

use thiserror::Error;

/// A directory could not be listed. Scans degrade to an empty catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Directory not found: {0:?}")]
    NotFound(PathBuf),

    #[error("Not a directory: {0:?}")]
    NotADirectory(PathBuf),

    #[error("Cannot read directory {path:?}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

/// A single file could not be decoded or resized. Only its own slot degrades.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Cannot read image {path:?}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Failed to decode image {path:?}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Image has no pixels: {0:?}")]
    Empty(PathBuf),
}

impl DecodeError {
    pub fn path(&self) -> &PathBuf {
        match self {
            DecodeError::Unreadable { path, .. } => path,
            DecodeError::Corrupt { path, .. } => path,
            DecodeError::Empty(path) => path,
        }
    }
}

/// The video collaborator failed. The slot stays un-played.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("No video backend available")]
    Unavailable,

    #[error("Video backend error: {0}")]
    Backend(String),

    #[error("Not a video: {0:?}")]
    NotAVideo(PathBuf),
}

/// Which view mode an operation was attempted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    Single,
    Strip,
}

impl std::fmt::Display for ModeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeKind::Single => f.write_str("single"),
            ModeKind::Strip => f.write_str("strip"),
        }
    }
}

/// Errors reported by the reader facade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error("No images to display")]
    EmptyMediaList,

    #[error("`{operation}` is not available in {mode} mode")]
    InvalidMode {
        operation: &'static str,
        mode: ModeKind,
    },

    #[error("Index {index} is out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Slot {0} is not a video")]
    NotAVideoSlot(usize),

    #[error("No item selected")]
    NoSelection,
}

impl ReaderError {
    /// Text for the status line.
    pub fn user_message(&self) -> String {
        format!("Error: {}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefix() {
        let err = ReaderError::EmptyMediaList;
        assert_eq!(err.user_message(), "Error: No images to display");
    }

    #[test]
    fn test_invalid_mode_message() {
        let err = ReaderError::InvalidMode {
            operation: "next",
            mode: ModeKind::Strip,
        };
        assert_eq!(err.to_string(), "`next` is not available in strip mode");
    }

    #[test]
    fn test_wrapped_errors_are_transparent() {
        let scan = ScanError::NotFound(PathBuf::from("/missing"));
        let err: ReaderError = scan.clone().into();
        assert_eq!(err.to_string(), scan.to_string());
    }
}
