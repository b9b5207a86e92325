//! Zoom factor applied to the viewport width.

/// Multiplier for button and keyboard zoom.
pub const COARSE_STEP: f64 = 1.2;
/// Multiplier for wheel zoom.
pub const FINE_STEP: f64 = 1.1;
/// Zoom never goes below this; there is no upper bound.
pub const MIN_ZOOM: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    factor: f64,
}

impl Default for ZoomState {
    fn default() -> Self {
        Self { factor: 1.0 }
    }
}

impl ZoomState {
    /// Build a zoom state, clamping `factor` to the floor. Non-finite input resets to 1.0.
    pub fn new(factor: f64) -> Self {
        let mut zoom = Self::default();
        zoom.set(factor);
        zoom
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn set(&mut self, factor: f64) {
        self.factor = if factor.is_finite() {
            factor.max(MIN_ZOOM)
        } else {
            1.0
        };
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(COARSE_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(1.0 / COARSE_STEP);
    }

    pub fn zoom_in_fine(&mut self) {
        self.zoom_by(FINE_STEP);
    }

    pub fn zoom_out_fine(&mut self) {
        self.zoom_by(1.0 / FINE_STEP);
    }

    pub fn reset(&mut self) {
        self.factor = 1.0;
    }

    fn zoom_by(&mut self, multiplier: f64) {
        self.set(self.factor * multiplier);
    }

    /// Pixel width for decoding at this zoom.
    ///
    /// An available width of 0 means the surface is not allocated yet and
    /// `fallback_width` is used instead. The result is at least 1.
    pub fn target_width(&self, available_width: u32, fallback_width: u32) -> u32 {
        let base = if available_width == 0 {
            fallback_width
        } else {
            available_width
        };
        let width = (base as f64 * self.factor).floor();
        if width >= u32::MAX as f64 {
            u32::MAX
        } else {
            (width as u32).max(1)
        }
    }

    /// Status-line label, e.g. `Zoom: 1.20x`.
    pub fn label(&self) -> String {
        format!("Zoom: {:.2}x", self.factor)
    }
}
