//! Reader facade tying the catalog, resize cache, video player and view modes together.
//!
//! The shell (a GTK window, a TUI, a test) owns the toolkit and forwards user
//! actions here. Every operation updates the status line; failures are logged,
//! written to the status line and returned, never panicked on.

pub mod composer;
pub mod keybindings;
pub mod single;
pub mod zoom;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ReaderConfig;
use crate::error::{ModeKind, ReaderError};
use crate::layout::StripLayout;
use crate::models::{DirectoryEntry, MediaCatalog, MediaEntry, MediaKind, ScanReport};
use crate::raster::{DecodeQueue, DecodeRequest, Decoder, ImageDecoder, ResizeCache};
use crate::scanner::FileScanner;
use crate::video::{NullVideoBackend, VideoBackend, VideoPlayer};

pub use composer::{RebuildSummary, SlotSurface, StripView};
pub use keybindings::{resolve_key, resolve_wheel, Command, Key, Modifiers};
pub use single::{SingleSurface, SingleView};
pub use zoom::ZoomState;

/// The active view mode together with the state only that mode has.
#[derive(Debug, Clone)]
pub enum ViewMode {
    Single(SingleView),
    Strip(StripView),
}

impl ViewMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            ViewMode::Single(_) => ModeKind::Single,
            ViewMode::Strip(_) => ModeKind::Strip,
        }
    }
}

impl Default for ViewMode {
    fn default() -> Self {
        ViewMode::Single(SingleView::default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewportState {
    /// Width the toolkit allocated to the viewport; 0 until it has been laid out.
    pub viewport_width: u32,
    /// Persists across directory changes until reset.
    pub zoom: ZoomState,
    pub mode: ViewMode,
}

pub struct Reader {
    config: ReaderConfig,
    cache: Arc<ResizeCache>,
    video: VideoPlayer,
    scanner: FileScanner,
    strip_layout: StripLayout,
    catalog: Option<MediaCatalog>,
    active: Vec<MediaEntry>,
    viewport: ViewportState,
    status: String,
    decode_queue: Option<DecodeQueue>,
    /// Width the queued prefetch was issued at.
    prefetch_width: Option<u32>,
}

impl Reader {
    /// Reader with the image-crate decoder and no video engine.
    pub fn new(config: ReaderConfig) -> Self {
        Self::with_parts(config, Arc::new(ImageDecoder), Box::new(NullVideoBackend))
    }

    pub fn with_parts(
        config: ReaderConfig,
        decoder: Arc<dyn Decoder>,
        backend: Box<dyn VideoBackend>,
    ) -> Self {
        let cache = Arc::new(ResizeCache::new(decoder, config.cache_capacity));
        Self {
            config,
            cache,
            video: VideoPlayer::new(backend),
            scanner: FileScanner::new(),
            strip_layout: StripLayout::default(),
            catalog: None,
            active: Vec::new(),
            viewport: ViewportState::default(),
            status: String::new(),
            decode_queue: None,
            prefetch_width: None,
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResizeCache> {
        &self.cache
    }

    pub fn video(&self) -> &VideoPlayer {
        &self.video
    }

    pub fn catalog(&self) -> Option<&MediaCatalog> {
        self.catalog.as_ref()
    }

    pub fn active_entries(&self) -> &[MediaEntry] {
        &self.active
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn mode(&self) -> ModeKind {
        self.viewport.mode.kind()
    }

    pub fn zoom(&self) -> f64 {
        self.viewport.zoom.factor()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn single(&self) -> Option<&SingleView> {
        match &self.viewport.mode {
            ViewMode::Single(view) => Some(view),
            ViewMode::Strip(_) => None,
        }
    }

    pub fn strip(&self) -> Option<&StripView> {
        match &self.viewport.mode {
            ViewMode::Strip(view) => Some(view),
            ViewMode::Single(_) => None,
        }
    }

    /// Pixel width images are decoded at for the current viewport and zoom.
    pub fn target_width(&self) -> u32 {
        self.viewport
            .zoom
            .target_width(self.viewport.viewport_width, self.config.fallback_width)
    }

    /// Open a directory: its subdirectories and media replace the catalog, and
    /// its media become the active list.
    pub fn scan(&mut self, dir: &Path) -> Result<usize, ReaderError> {
        let report = self.scanner.scan(dir);
        self.apply_scan(report)
    }

    /// `scan` with the directory listing run on a blocking task.
    pub async fn scan_async(&mut self, dir: PathBuf) -> Result<usize, ReaderError> {
        let report = self.scanner.scan_async(dir).await;
        self.apply_scan(report)
    }

    /// Drill into a subdirectory; its media become the active list.
    pub fn expand(&mut self, directory: &DirectoryEntry) -> Result<usize, ReaderError> {
        let report = self.scanner.expand(directory);
        if let Some(e) = report.error {
            self.replace_active(Vec::new());
            return self.fail(e.into());
        }

        let count = report.catalog.len();
        self.replace_active(report.catalog.into_entries());
        self.status = if count > 0 {
            format!("{} media files found in {}", count, directory.display_name())
        } else {
            "No media files found".to_string()
        };
        Ok(count)
    }

    /// Show `index` of the active list in single mode.
    pub fn open_item(&mut self, index: usize) -> Result<(), ReaderError> {
        if let ViewMode::Strip(strip) = &mut self.viewport.mode {
            strip.release(&mut self.video);
            info!("Leaving strip mode");
            self.viewport.mode = ViewMode::default();
        }

        let width = self.target_width();
        let result = match &mut self.viewport.mode {
            ViewMode::Single(view) => {
                view.display(index, &self.active, &self.cache, &mut self.video, width)
            }
            ViewMode::Strip(_) => Err(self.invalid("open_item")),
        };
        self.finish_single(result)
    }

    /// Switch to strip mode and build the composite for the whole active list.
    pub fn enter_strip(&mut self) -> Result<RebuildSummary, ReaderError> {
        if self.active.is_empty() {
            return self.fail(ReaderError::EmptyMediaList);
        }

        if let ViewMode::Single(view) = &mut self.viewport.mode {
            view.release(&mut self.video);
            info!(items = self.active.len(), "Entering strip mode");
            self.viewport.mode = ViewMode::Strip(StripView::new(self.strip_layout.clone()));
        }

        let summary = self.rebuild_strip()?;
        self.status = format!(
            "Reading {} images - Zoom: {:.2}x",
            self.active.len(),
            self.viewport.zoom.factor()
        );
        Ok(summary)
    }

    /// Leave strip mode. Single mode starts with nothing selected.
    pub fn exit_strip(&mut self) -> Result<(), ReaderError> {
        match &mut self.viewport.mode {
            ViewMode::Strip(strip) => {
                strip.release(&mut self.video);
                info!("Leaving strip mode");
                self.viewport.mode = ViewMode::default();
                Ok(())
            }
            ViewMode::Single(_) => self.fail(self.invalid("exit_strip")),
        }
    }

    /// Set the viewport width and zoom, then rebuild the strip.
    pub fn rebuild(&mut self, viewport_width: u32, zoom: f64) -> Result<RebuildSummary, ReaderError> {
        if self.mode() != ModeKind::Strip {
            return self.fail(self.invalid("rebuild"));
        }
        self.viewport.viewport_width = viewport_width;
        self.viewport.zoom.set(zoom);
        self.rebuild_strip()
    }

    /// The toolkit resized the viewport.
    pub fn resize(&mut self, viewport_width: u32) -> Result<(), ReaderError> {
        if viewport_width == self.viewport.viewport_width {
            return Ok(());
        }
        debug!(from = self.viewport.viewport_width, to = viewport_width, "Viewport resized");
        self.viewport.viewport_width = viewport_width;
        self.refresh()
    }

    /// Next item in single mode. A no-op on the last item.
    pub fn next(&mut self) -> Result<(), ReaderError> {
        let width = self.target_width();
        let result = match &mut self.viewport.mode {
            ViewMode::Single(view) => {
                view.next(&self.active, &self.cache, &mut self.video, width)
            }
            ViewMode::Strip(_) => return self.fail(self.invalid("next")),
        };
        match result {
            Ok(true) => self.finish_single(Ok(())),
            Ok(false) => Ok(()),
            Err(e) => self.finish_single(Err(e)),
        }
    }

    /// Previous item in single mode. A no-op on the first item.
    pub fn previous(&mut self) -> Result<(), ReaderError> {
        let width = self.target_width();
        let result = match &mut self.viewport.mode {
            ViewMode::Single(view) => {
                view.previous(&self.active, &self.cache, &mut self.video, width)
            }
            ViewMode::Strip(_) => return self.fail(self.invalid("previous")),
        };
        match result {
            Ok(true) => self.finish_single(Ok(())),
            Ok(false) => Ok(()),
            Err(e) => self.finish_single(Err(e)),
        }
    }

    /// Play the video in strip slot `index`.
    pub fn activate_video(&mut self, index: usize) -> Result<(), ReaderError> {
        let result = match &mut self.viewport.mode {
            ViewMode::Strip(strip) => strip.activate_video(index, &mut self.video),
            ViewMode::Single(_) => return self.fail(self.invalid("activate_video")),
        };
        match result {
            Ok(()) => {
                self.status = format!("Playing: {}", self.active[index].display_name());
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    pub fn zoom_in(&mut self) -> Result<(), ReaderError> {
        self.viewport.zoom.zoom_in();
        self.after_zoom()
    }

    pub fn zoom_out(&mut self) -> Result<(), ReaderError> {
        self.viewport.zoom.zoom_out();
        self.after_zoom()
    }

    pub fn zoom_in_fine(&mut self) -> Result<(), ReaderError> {
        self.viewport.zoom.zoom_in_fine();
        self.after_zoom()
    }

    pub fn zoom_out_fine(&mut self) -> Result<(), ReaderError> {
        self.viewport.zoom.zoom_out_fine();
        self.after_zoom()
    }

    pub fn reset_zoom(&mut self) -> Result<(), ReaderError> {
        self.viewport.zoom.reset();
        self.refresh()?;
        self.status = "Zoom reset to 100%".to_string();
        Ok(())
    }

    /// Run a resolved input command.
    ///
    /// Commands the toolkit carries out itself (scrolling, fullscreen) are
    /// handed back untouched.
    pub fn dispatch(&mut self, command: Command) -> Result<Option<Command>, ReaderError> {
        debug!(?command, "Dispatching command");
        match command {
            Command::Previous => self.previous()?,
            Command::Next => self.next()?,
            Command::ZoomIn => self.zoom_in()?,
            Command::ZoomOut => self.zoom_out()?,
            Command::ZoomInFine => self.zoom_in_fine()?,
            Command::ZoomOutFine => self.zoom_out_fine()?,
            Command::ResetZoom => self.reset_zoom()?,
            Command::Scroll(_) | Command::ToggleFullscreen | Command::ExitFullscreen => {
                return Ok(Some(command))
            }
        }
        Ok(None)
    }

    /// The background decode queue, once `prefetch` has started it.
    pub fn decode_queue(&self) -> Option<&DecodeQueue> {
        self.decode_queue.as_ref()
    }

    /// Queue the images of the active list at the current target width so a
    /// following strip rebuild finds them cached.
    ///
    /// Starts the decode queue on first use, sharing this reader's cache. The
    /// queue holds at most [`MAX_QUEUE_SIZE`](crate::raster::MAX_QUEUE_SIZE)
    /// pending requests; images past that are not queued and are decoded by
    /// the rebuild itself. Returns how many were queued. Any change of target
    /// width, or of the active list, drops the queued work.
    pub fn prefetch(&mut self) -> usize {
        let width = self.target_width();
        let cache = &self.cache;
        let workers = self.config.decode_workers;
        let queue = self
            .decode_queue
            .get_or_insert_with(|| DecodeQueue::new(Arc::clone(cache), workers));
        let generation = queue.begin_generation();
        let requests = self
            .active
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.kind() == MediaKind::Image)
            .map(|(index, entry)| DecodeRequest {
                generation,
                index,
                path: entry.path().to_path_buf(),
                width,
            });
        let queued = queue.submit_batch(requests);
        let wanted = self.active.iter().filter(|e| e.is_image()).count();
        if queued < wanted {
            debug!(queued, wanted, "Decode queue full, rest left to the rebuild");
        }
        debug!(generation, width, queued, "Queued prefetch");
        self.prefetch_width = Some(width);
        queued
    }

    /// Supersede queued prefetch work unless it was issued for `width`.
    fn supersede_prefetch(&mut self, width: Option<u32>) {
        if self.prefetch_width.is_none() || self.prefetch_width == width {
            return;
        }
        if let Some(queue) = &self.decode_queue {
            let generation = queue.begin_generation();
            debug!(generation, "Superseded stale prefetch");
        }
        self.prefetch_width = None;
    }

    fn apply_scan(&mut self, report: ScanReport) -> Result<usize, ReaderError> {
        let ScanReport { catalog, error } = report;
        let name = catalog.root_name();
        let count = catalog.len();

        self.replace_active(catalog.entries().to_vec());
        self.catalog = Some(catalog);

        if let Some(e) = error {
            return self.fail(e.into());
        }
        self.status = format!("Directory opened: {}", name);
        Ok(count)
    }

    /// Swap in a new active list, releasing whatever the current mode shows.
    fn replace_active(&mut self, entries: Vec<MediaEntry>) {
        match &mut self.viewport.mode {
            ViewMode::Single(view) => view.release(&mut self.video),
            ViewMode::Strip(strip) => strip.release(&mut self.video),
        }
        self.viewport.mode = ViewMode::default();
        self.active = entries;
        self.supersede_prefetch(None);
    }

    fn rebuild_strip(&mut self) -> Result<RebuildSummary, ReaderError> {
        let width = self.target_width();
        self.supersede_prefetch(Some(width));
        match &mut self.viewport.mode {
            ViewMode::Strip(strip) => Ok(strip.rebuild(&self.active, &self.cache, &mut self.video, width)),
            ViewMode::Single(_) => Err(self.invalid("rebuild")),
        }
    }

    /// Re-render the current mode at the current target width.
    fn refresh(&mut self) -> Result<(), ReaderError> {
        let width = self.target_width();
        self.supersede_prefetch(Some(width));
        let result = match &mut self.viewport.mode {
            ViewMode::Strip(strip) => {
                strip.rebuild(&self.active, &self.cache, &mut self.video, width);
                Ok(())
            }
            ViewMode::Single(view) => view.rerender(&self.active, &self.cache, &mut self.video, width),
        };
        result.or_else(|e| self.fail(e))
    }

    fn after_zoom(&mut self) -> Result<(), ReaderError> {
        self.refresh()?;
        self.status = self.viewport.zoom.label();
        debug!(zoom = self.viewport.zoom.factor(), "Zoom changed");
        Ok(())
    }

    /// Status line update after a single-mode transition.
    fn finish_single(&mut self, result: Result<(), ReaderError>) -> Result<(), ReaderError> {
        result.or_else(|e| self.fail(e))?;
        let entry = self
            .single()
            .and_then(SingleView::cursor)
            .and_then(|i| self.active.get(i));
        if let Some(entry) = entry {
            self.status = match entry.kind() {
                MediaKind::Image => format!("Image: {}", entry.display_name()),
                MediaKind::Video => format!("Playing: {}", entry.display_name()),
            };
        }
        Ok(())
    }

    fn invalid(&self, operation: &'static str) -> ReaderError {
        ReaderError::InvalidMode {
            operation,
            mode: self.mode(),
        }
    }

    fn fail<T>(&mut self, error: ReaderError) -> Result<T, ReaderError> {
        warn!(error = %error, "Reader operation failed");
        self.status = error.user_message();
        Err(error)
    }
}
