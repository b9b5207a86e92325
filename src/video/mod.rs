//! Video playback ownership on top of an external playback engine.

pub mod player;

pub use player::{
    NullVideoBackend, PlaybackState, PlayerHandle, SurfaceHandle, VideoBackend, VideoPlayer,
};
