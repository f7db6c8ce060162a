// Sound layer mixer
// Selection, playback and progress of one theme session

pub mod controller;
pub mod progress;
pub mod wave;

pub use controller::{MixController, MixerSnapshot, PlayToggle, TrackToggle};
pub use progress::{Aggregate, TrackStatus};
