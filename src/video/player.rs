//! Single-owner video player over a pluggable playback engine.
//!
//! The engine (mpv, gstreamer, ...) lives outside this crate behind the
//! `VideoBackend` trait. `VideoPlayer` guarantees that at most one player
//! instance is active: starting playback always stops and releases the
//! previous instance first.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::PlaybackError;
use crate::models::MediaKind;

/// Opaque handle to a toolkit surface a player can render into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

impl SurfaceHandle {
    /// The surface used by single-item display.
    pub const SINGLE: SurfaceHandle = SurfaceHandle(0);

    /// The surface of strip slot `index`.
    pub fn for_slot(index: usize) -> Self {
        SurfaceHandle(index as u64 + 1)
    }

    /// Strip slot index for this surface, if it is a slot surface.
    pub fn slot_index(self) -> Option<usize> {
        self.0.checked_sub(1).map(|i| i as usize)
    }
}

/// Opaque handle to a player instance created by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerHandle(pub u64);

/// The external playback engine.
pub trait VideoBackend {
    fn create_player(&mut self, surface: SurfaceHandle) -> Result<PlayerHandle, PlaybackError>;
    fn play(&mut self, player: PlayerHandle, path: &Path) -> Result<(), PlaybackError>;
    /// Stop and release the player. Must not fail; errors are the backend's to log.
    fn stop(&mut self, player: PlayerHandle);
}

/// Backend used when no playback engine is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullVideoBackend;

impl VideoBackend for NullVideoBackend {
    fn create_player(&mut self, _surface: SurfaceHandle) -> Result<PlayerHandle, PlaybackError> {
        Err(PlaybackError::Unavailable)
    }

    fn play(&mut self, _player: PlayerHandle, _path: &Path) -> Result<(), PlaybackError> {
        Err(PlaybackError::Unavailable)
    }

    fn stop(&mut self, _player: PlayerHandle) {}
}

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

/// Callback type for playback state changes
pub type PlaybackStateCallback = Box<dyn Fn(PlaybackState) + 'static>;

struct ActivePlayback {
    player: PlayerHandle,
    surface: SurfaceHandle,
    path: PathBuf,
}

/// Owns the one active player instance.
pub struct VideoPlayer {
    backend: Box<dyn VideoBackend>,
    active: Option<ActivePlayback>,
    state_callbacks: Vec<PlaybackStateCallback>,
}

impl VideoPlayer {
    pub fn new(backend: Box<dyn VideoBackend>) -> Self {
        Self {
            backend,
            active: None,
            state_callbacks: Vec::new(),
        }
    }

    /// Play `path` on `surface`, stopping whatever was playing before.
    ///
    /// On failure nothing is left playing.
    pub fn play(&mut self, surface: SurfaceHandle, path: &Path) -> Result<(), PlaybackError> {
        self.stop();

        if MediaKind::from_path(path) != Some(MediaKind::Video) {
            return Err(PlaybackError::NotAVideo(path.to_path_buf()));
        }

        let player = self.backend.create_player(surface).map_err(|e| {
            warn!(?path, error = %e, "Failed to create video player");
            e
        })?;

        if let Err(e) = self.backend.play(player, path) {
            warn!(?path, error = %e, "Failed to start playback");
            self.backend.stop(player);
            return Err(e);
        }

        info!(?path, ?surface, "Playing video");
        self.active = Some(ActivePlayback {
            player,
            surface,
            path: path.to_path_buf(),
        });
        self.emit_state(PlaybackState::Playing);
        Ok(())
    }

    /// Stop and release the active player. A no-op when nothing is playing.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(path = ?active.path, "Stopping video");
            self.backend.stop(active.player);
            self.emit_state(PlaybackState::Stopped);
        }
    }

    pub fn playback_state(&self) -> PlaybackState {
        if self.active.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }

    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.path.as_path())
    }

    pub fn current_surface(&self) -> Option<SurfaceHandle> {
        self.active.as_ref().map(|a| a.surface)
    }

    /// Register a callback for playback state changes.
    pub fn connect_state_changed<F: Fn(PlaybackState) + 'static>(&mut self, callback: F) {
        self.state_callbacks.push(Box::new(callback));
    }

    fn emit_state(&self, state: PlaybackState) {
        for callback in &self.state_callbacks {
            callback(state);
        }
    }
}

impl Default for VideoPlayer {
    fn default() -> Self {
        Self::new(Box::new(NullVideoBackend))
    }
}

impl Drop for VideoPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
