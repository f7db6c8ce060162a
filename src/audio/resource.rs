// Contract between the mix controller and whatever actually plays audio
//
// A provider turns a catalog sound into a live resource. Resources report
// their state through a single status listener which may be invoked from any
// thread, at any time, in any order relative to other resources.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::catalog::Sound;
use crate::error::AudioResult;

/// Point-in-time playback report for one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackStatus {
    pub loaded: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
}

impl PlaybackStatus {
    /// Status of a resource that is loaded but idle at the start.
    pub fn ready(duration_ms: u64) -> Self {
        Self {
            loaded: true,
            position_ms: 0,
            duration_ms,
            is_playing: false,
        }
    }

    /// Status published once a resource has been released.
    pub fn unloaded() -> Self {
        Self::default()
    }
}

/// Callback receiving every status change of one resource.
pub type StatusListener = Arc<dyn Fn(PlaybackStatus) + Send + Sync>;

/// A live, controllable playback handle for one sound.
#[async_trait]
pub trait AudioResource: Send + Sync {
    /// Release the resource. Further transport calls fail.
    async fn unload(&self) -> AudioResult<()>;

    async fn play(&self) -> AudioResult<()>;

    async fn pause(&self) -> AudioResult<()>;

    /// Stop playback and rewind.
    async fn stop(&self) -> AudioResult<()>;

    async fn seek_to_start(&self) -> AudioResult<()>;

    async fn status(&self) -> AudioResult<PlaybackStatus>;

    /// Install (or with `None`, remove) the status listener.
    /// Installing a listener replaces the previous one.
    fn set_status_listener(&self, listener: Option<StatusListener>);
}

/// Loads sounds into live resources.
#[async_trait]
pub trait AudioResourceProvider: Send + Sync {
    type Resource: AudioResource + 'static;

    /// Create a resource for `sound`. The resource must not start playing.
    async fn load(&self, sound: &Sound) -> AudioResult<Self::Resource>;
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.loaded {
            return write!(f, "unloaded");
        }
        write!(
            f,
            "{} {}/{}ms",
            if self.is_playing { "playing" } else { "idle" },
            self.position_ms,
            self.duration_ms
        )
    }
}
