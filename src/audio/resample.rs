// Sample rate conversion between a decoded file and the output device

use rubato::{FftFixedIn, Resampler};

use crate::error::{AudioError, AudioResult};

/// Frames fed to the resampler per chunk
const CHUNK_FRAMES: usize = 1024;

/// Streaming wrapper around a fixed-input resampler.
///
/// Accepts interleaved samples of any length and returns whatever full chunks
/// could be converted so far, interleaved.
pub struct StreamResampler {
    inner: FftFixedIn<f32>,
    pending: Vec<Vec<f32>>,
}

impl StreamResampler {
    pub fn new(rate_in: u32, rate_out: u32, channels: usize) -> AudioResult<Self> {
        let inner = FftFixedIn::<f32>::new(
            rate_in as usize,
            rate_out as usize,
            CHUNK_FRAMES,
            2,
            channels,
        )
        .map_err(|e| AudioError::Output(format!("Failed to create resampler: {}", e)))?;

        Ok(Self {
            inner,
            pending: vec![Vec::new(); channels],
        })
    }

    pub fn process(&mut self, interleaved: &[f32]) -> AudioResult<Vec<f32>> {
        let channels = self.pending.len();
        for frame in interleaved.chunks_exact(channels) {
            for (plane, &sample) in self.pending.iter_mut().zip(frame) {
                plane.push(sample);
            }
        }

        let mut output = Vec::new();
        loop {
            let needed = self.inner.input_frames_next();
            if self.pending[0].len() < needed {
                break;
            }

            let chunk: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|plane| plane.drain(..needed).collect())
                .collect();
            let converted = self
                .inner
                .process(&chunk, None)
                .map_err(|e| AudioError::Output(format!("Resampling failed: {}", e)))?;

            let frames = converted[0].len();
            output.reserve(frames * channels);
            for frame in 0..frames {
                for plane in &converted {
                    output.push(plane[frame]);
                }
            }
        }
        Ok(output)
    }

    /// Drop buffered input, e.g. after a seek
    pub fn reset(&mut self) {
        for plane in &mut self.pending {
            plane.clear();
        }
        self.inner.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_length_follows_ratio() {
        let mut resampler = StreamResampler::new(44100, 48000, 2).unwrap();
        let input = vec![0.0f32; 44100 * 2];
        let output = resampler.process(&input).unwrap();

        // Only whole chunks are converted, so allow one chunk of slack
        let frames = output.len() / 2;
        let expected = 48000;
        assert_eq!(output.len() % 2, 0);
        assert!(frames <= expected && expected - frames < 2 * CHUNK_FRAMES, "{frames}");
    }

    #[test]
    fn test_short_input_is_buffered() {
        let mut resampler = StreamResampler::new(22050, 44100, 1).unwrap();
        assert!(resampler.process(&[0.1; 100]).unwrap().is_empty());
    }
}
