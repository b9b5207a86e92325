//! Strip mode: every item of the active media list stacked into one column.
//!
//! A rebuild always starts over. Prior surfaces (and a playing video) are
//! released, each entry is sized at the target width, and the layout is
//! recomputed from scratch. Decoding goes through the shared `ResizeCache`, so
//! a rebuild at a width seen before is cheap.

use tracing::{debug, info, warn};

use crate::error::ReaderError;
use crate::layout::{CompositeLayout, SlotSizing, StripLayout};
use crate::models::{MediaEntry, MediaKind};
use crate::raster::{RasterImage, ResizeCache};
use crate::video::{SurfaceHandle, VideoPlayer};

/// What one strip slot shows.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotSurface {
    Image(RasterImage),
    VideoPlaceholder,
    VideoPlaying,
    Failed(String),
}

impl SlotSurface {
    pub fn is_video(&self) -> bool {
        matches!(self, SlotSurface::VideoPlaceholder | SlotSurface::VideoPlaying)
    }

    fn sizing(&self) -> SlotSizing {
        match self {
            SlotSurface::Image(img) => SlotSizing::Image {
                height: img.height(),
            },
            SlotSurface::VideoPlaceholder | SlotSurface::VideoPlaying => {
                SlotSizing::VideoPlaceholder
            }
            SlotSurface::Failed(_) => SlotSizing::Failed,
        }
    }
}

/// Counts from one rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    pub generation: u64,
    pub width: u32,
    pub images: usize,
    pub videos: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct StripView {
    generation: u64,
    layout: CompositeLayout,
    surfaces: Vec<SlotSurface>,
    playing: Option<usize>,
    strip: StripLayout,
}

impl StripView {
    pub fn new(strip: StripLayout) -> Self {
        Self {
            strip,
            ..Self::default()
        }
    }

    /// Rebuild every slot at `width`.
    ///
    /// Per-item decode failures become `SlotSurface::Failed` and the rebuild
    /// carries on.
    pub fn rebuild(
        &mut self,
        entries: &[MediaEntry],
        cache: &ResizeCache,
        video: &mut VideoPlayer,
        width: u32,
    ) -> RebuildSummary {
        self.release(video);
        self.generation += 1;

        let mut summary = RebuildSummary {
            generation: self.generation,
            width,
            ..RebuildSummary::default()
        };

        let surfaces: Vec<SlotSurface> = entries
            .iter()
            .map(|entry| match entry.kind() {
                MediaKind::Video => {
                    summary.videos += 1;
                    SlotSurface::VideoPlaceholder
                }
                MediaKind::Image => match cache.get_or_compute(entry.path(), width) {
                    Ok(img) => {
                        summary.images += 1;
                        SlotSurface::Image(img)
                    }
                    Err(e) => {
                        warn!(path = ?entry.path(), error = %e, "Slot failed to decode");
                        summary.failed += 1;
                        SlotSurface::Failed(e.to_string())
                    }
                },
            })
            .collect();

        let sizings: Vec<SlotSizing> = surfaces.iter().map(SlotSurface::sizing).collect();
        self.layout = self.strip.compute(entries, &sizings, width);
        self.surfaces = surfaces;

        debug!(
            generation = self.generation,
            width,
            slots = self.surfaces.len(),
            extent = self.layout.total_extent_px,
            "Rebuilt strip"
        );
        summary
    }

    /// Start playback in strip slot `index`. The mode is unchanged.
    ///
    /// Any other playing slot goes back to a placeholder first. If playback
    /// fails the slot stays a placeholder.
    pub fn activate_video(
        &mut self,
        index: usize,
        video: &mut VideoPlayer,
    ) -> Result<(), ReaderError> {
        let len = self.surfaces.len();
        let surface = self
            .surfaces
            .get(index)
            .ok_or(ReaderError::IndexOutOfRange { index, len })?;
        if !surface.is_video() {
            return Err(ReaderError::NotAVideoSlot(index));
        }

        if let Some(prev) = self.playing.take() {
            self.surfaces[prev] = SlotSurface::VideoPlaceholder;
        }

        let path = self.layout.slots[index].entry.path().to_path_buf();
        video.play(SurfaceHandle::for_slot(index), &path)?;

        info!(index, ?path, "Playing video in strip");
        self.surfaces[index] = SlotSurface::VideoPlaying;
        self.playing = Some(index);
        Ok(())
    }

    /// Stop playback and drop every slot surface.
    pub fn release(&mut self, video: &mut VideoPlayer) {
        video.stop();
        self.playing = None;
        self.surfaces.clear();
        self.layout = CompositeLayout::default();
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn width(&self) -> u32 {
        self.layout.width_px
    }

    pub fn layout(&self) -> &CompositeLayout {
        &self.layout
    }

    pub fn surfaces(&self) -> &[SlotSurface] {
        &self.surfaces
    }

    pub fn surface(&self, index: usize) -> Option<&SlotSurface> {
        self.surfaces.get(index)
    }

    pub fn playing_slot(&self) -> Option<usize> {
        self.playing
    }

    pub fn total_extent_px(&self) -> u64 {
        self.layout.total_extent_px
    }

    pub fn slot_at_offset(&self, y: u64) -> Option<usize> {
        self.layout.slot_at_offset(y)
    }
}
