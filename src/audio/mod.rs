// Audio playback module
// Resource contract for the mixer, plus a device backend using Symphonia for
// decoding and cpal for output

pub mod decoder;
pub mod device;
pub mod output;
pub mod resample;
pub mod resource;

#[cfg(test)]
pub(crate) mod testing;

pub use device::{DeviceProvider, DeviceTrack};
pub use resource::{AudioResource, AudioResourceProvider, PlaybackStatus, StatusListener};
