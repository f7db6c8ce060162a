// Error types shared by the audio layer
use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by an audio resource provider or one of its resources.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to open audio file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode audio: {0}")]
    Decode(String),

    #[error("audio output unavailable: {0}")]
    Output(String),

    #[error("resource is not loaded")]
    NotLoaded,

    #[error("resource worker has shut down")]
    Closed,
}

pub type AudioResult<T> = Result<T, AudioError>;
