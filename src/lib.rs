//! stripview: the core of a long-strip comic and media reader.
//!
//! Directories are listed in natural order, images are decoded and fitted to
//! the viewport width through a shared resize cache, and the active media list
//! is shown either one item at a time or as one continuous vertical strip.
//! The windowing toolkit and the video engine stay outside this crate; the
//! shell forwards input to [`reader::Reader`] and paints what it exposes.

pub mod config;
pub mod error;
pub mod layout;
pub mod logging;
pub mod models;
pub mod raster;
pub mod reader;
pub mod scanner;
pub mod video;

pub use config::ReaderConfig;
pub use error::{DecodeError, ModeKind, PlaybackError, ReaderError, ScanError};
pub use models::{DirectoryEntry, MediaCatalog, MediaEntry, MediaKind, ScanReport};
pub use raster::{Decoder, ImageDecoder, RasterImage, ResizeCache};
pub use reader::{Command, Reader, ViewMode};
pub use scanner::{natural_compare, FileScanner};
pub use video::{NullVideoBackend, VideoBackend, VideoPlayer};
