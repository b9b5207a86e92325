//! One-at-a-time display with a cursor into the active media list.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ReaderError;
use crate::models::{MediaEntry, MediaKind};
use crate::raster::{RasterImage, ResizeCache};
use crate::video::{SurfaceHandle, VideoPlayer};

/// What the single-view surface currently shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SingleSurface {
    #[default]
    Empty,
    Image(RasterImage),
    Video(PathBuf),
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct SingleView {
    cursor: Option<usize>,
    surface: SingleSurface,
}

impl SingleView {
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn surface(&self) -> &SingleSurface {
        &self.surface
    }

    /// Show `entries[index]`.
    ///
    /// The previous surface (and any playing video) is released before the new
    /// item is rendered. On a decode or playback failure the cursor still moves
    /// and the surface shows the failure.
    pub fn display(
        &mut self,
        index: usize,
        entries: &[MediaEntry],
        cache: &ResizeCache,
        video: &mut VideoPlayer,
        width: u32,
    ) -> Result<(), ReaderError> {
        let entry = entries.get(index).ok_or(ReaderError::IndexOutOfRange {
            index,
            len: entries.len(),
        })?;

        self.release(video);
        self.cursor = Some(index);
        debug!(index, path = ?entry.path(), "Displaying single item");

        let result = match entry.kind() {
            MediaKind::Video => show_video(video, entry.path()),
            MediaKind::Image => show_image(cache, entry.path(), width),
        };

        match result {
            Ok(surface) => {
                self.surface = surface;
                Ok(())
            }
            Err(e) => {
                warn!(path = ?entry.path(), error = %e, "Failed to display item");
                self.surface = SingleSurface::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Move to the next item. Returns `Ok(false)` at the end of the list.
    pub fn next(
        &mut self,
        entries: &[MediaEntry],
        cache: &ResizeCache,
        video: &mut VideoPlayer,
        width: u32,
    ) -> Result<bool, ReaderError> {
        let cursor = self.cursor.ok_or(ReaderError::NoSelection)?;
        if cursor + 1 >= entries.len() {
            return Ok(false);
        }
        self.display(cursor + 1, entries, cache, video, width)?;
        Ok(true)
    }

    /// Move to the previous item. Returns `Ok(false)` at the start of the list.
    pub fn previous(
        &mut self,
        entries: &[MediaEntry],
        cache: &ResizeCache,
        video: &mut VideoPlayer,
        width: u32,
    ) -> Result<bool, ReaderError> {
        let cursor = self.cursor.ok_or(ReaderError::NoSelection)?;
        if cursor == 0 {
            return Ok(false);
        }
        self.display(cursor - 1, entries, cache, video, width)?;
        Ok(true)
    }

    /// Re-render the current image at a new width. A playing video is left alone.
    pub fn rerender(
        &mut self,
        entries: &[MediaEntry],
        cache: &ResizeCache,
        video: &mut VideoPlayer,
        width: u32,
    ) -> Result<(), ReaderError> {
        match (self.cursor, &self.surface) {
            (None, _) | (Some(_), SingleSurface::Video(_)) => Ok(()),
            (Some(index), _) => self.display(index, entries, cache, video, width),
        }
    }

    /// Stop playback and drop the surface. The cursor is kept.
    pub fn release(&mut self, video: &mut VideoPlayer) {
        video.stop();
        self.surface = SingleSurface::Empty;
    }
}

fn show_video(video: &mut VideoPlayer, path: &Path) -> Result<SingleSurface, ReaderError> {
    video.play(SurfaceHandle::SINGLE, path)?;
    Ok(SingleSurface::Video(path.to_path_buf()))
}

fn show_image(cache: &ResizeCache, path: &Path, width: u32) -> Result<SingleSurface, ReaderError> {
    let image = cache.get_or_compute(path, width)?;
    Ok(SingleSurface::Image(image))
}
