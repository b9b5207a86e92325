use std::ops::Range;

use crate::models::MediaEntry;

/// How a slot's height is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSizing {
    /// Decoded image with its width-fitted height.
    Image { height: u32 },
    /// Video not yet decoded; sized to 16:9 of the strip width.
    VideoPlaceholder,
    /// Decode failed; a fixed-height error marker.
    Failed,
}

/// Configuration for the vertical strip layout.
///
/// Items are stacked top to bottom at the full strip width with zero spacing.
#[derive(Debug, Clone)]
pub struct StripLayout {
    /// Aspect ratio of video placeholders as (width, height), default 16:9.
    pub video_aspect: (u32, u32),
    /// Height of the error marker shown for undecodable files (default: 48).
    pub error_height: u32,
}

impl Default for StripLayout {
    fn default() -> Self {
        Self {
            video_aspect: (16, 9),
            error_height: 48,
        }
    }
}

impl StripLayout {
    pub fn video_placeholder_height(&self, width: u32) -> u32 {
        let (aw, ah) = self.video_aspect;
        let height = width as u64 * ah as u64 / aw.max(1) as u64;
        (height as u32).max(1)
    }

    pub fn slot_height(&self, sizing: SlotSizing, width: u32) -> u32 {
        match sizing {
            SlotSizing::Image { height } => height.max(1),
            SlotSizing::VideoPlaceholder => self.video_placeholder_height(width),
            SlotSizing::Failed => self.error_height.max(1),
        }
    }

    /// Stacks `entries` vertically at `width`.
    ///
    /// `sizings[i]` describes `entries[i]`. Each slot's top offset is the sum of
    /// the heights above it; the layout is always built from scratch.
    pub fn compute(
        &self,
        entries: &[MediaEntry],
        sizings: &[SlotSizing],
        width: u32,
    ) -> CompositeLayout {
        debug_assert_eq!(entries.len(), sizings.len());

        let mut slots = Vec::with_capacity(entries.len());
        let mut top = 0u64;

        for (entry, sizing) in entries.iter().zip(sizings) {
            let height = self.slot_height(*sizing, width);
            slots.push(LayoutSlot {
                entry: entry.clone(),
                top_offset_px: top,
                height_px: height,
            });
            top += height as u64;
        }

        CompositeLayout {
            width_px: width,
            slots,
            total_extent_px: top,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutSlot {
    pub entry: MediaEntry,
    pub top_offset_px: u64,
    pub height_px: u32,
}

impl LayoutSlot {
    pub fn bottom_px(&self) -> u64 {
        self.top_offset_px + self.height_px as u64
    }
}

/// Vertical stacking geometry for strip mode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompositeLayout {
    pub width_px: u32,
    pub slots: Vec<LayoutSlot>,
    pub total_extent_px: u64,
}

impl CompositeLayout {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn heights(&self) -> Vec<u32> {
        self.slots.iter().map(|s| s.height_px).collect()
    }

    pub fn offsets(&self) -> Vec<u64> {
        self.slots.iter().map(|s| s.top_offset_px).collect()
    }

    /// Index of the slot covering scroll offset `y`, if any.
    pub fn slot_at_offset(&self, y: u64) -> Option<usize> {
        if y >= self.total_extent_px {
            return None;
        }
        let idx = self.slots.partition_point(|s| s.bottom_px() <= y);
        (idx < self.slots.len()).then_some(idx)
    }

    /// Slots intersecting the window `[top, top + height)`.
    pub fn visible_range(&self, top: u64, height: u64) -> Range<usize> {
        let bottom = top.saturating_add(height);
        let start = self.slots.partition_point(|s| s.bottom_px() <= top);
        let end = self.slots.partition_point(|s| s.top_offset_px < bottom);
        start..end.max(start)
    }
}
