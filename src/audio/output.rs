// Audio output using cpal
// Each loaded track owns one output stream fed through a ring buffer

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapRb,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{AudioError, AudioResult};

const RING_BUFFER_SIZE: usize = 48000 * 2 / 4; // ~250ms of stereo audio at 48kHz

type RingProducer = ringbuf::HeapProd<f32>;
type RingConsumer = ringbuf::HeapCons<f32>;

pub struct AudioOutput {
    _stream: Stream,
    producer: Arc<Mutex<RingProducer>>,
    sample_rate: u32,
    channels: usize,
    volume: Arc<Mutex<f32>>,
    clear_flag: Arc<AtomicBool>,
}

impl AudioOutput {
    /// Open the default device, preferring the source's rate and channel count
    pub fn open(preferred_rate: u32, preferred_channels: usize) -> AudioResult<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::Output("No output device available".to_string()))?;

        let config = Self::choose_config(&device, preferred_rate, preferred_channels)?;
        let sample_rate = config.sample_rate().0;
        let channels = usize::from(config.channels());

        let rb = HeapRb::<f32>::new(RING_BUFFER_SIZE);
        let (producer, consumer) = rb.split();
        let producer = Arc::new(Mutex::new(producer));
        let consumer = Arc::new(Mutex::new(consumer));

        let volume = Arc::new(Mutex::new(1.0f32));
        let clear_flag = Arc::new(AtomicBool::new(false));

        let sample_format = config.sample_format();
        let stream_config: StreamConfig = config.into();
        let stream = match sample_format {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &stream_config,
                consumer,
                volume.clone(),
                clear_flag.clone(),
            )?,
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &stream_config,
                consumer,
                volume.clone(),
                clear_flag.clone(),
            )?,
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &stream_config,
                consumer,
                volume.clone(),
                clear_flag.clone(),
            )?,
            format => {
                return Err(AudioError::Output(format!(
                    "Unsupported sample format: {:?}",
                    format
                )))
            }
        };

        stream
            .play()
            .map_err(|e| AudioError::Output(format!("Failed to start stream: {}", e)))?;

        Ok(Self {
            _stream: stream,
            producer,
            sample_rate,
            channels,
            volume,
            clear_flag,
        })
    }

    /// Use the source format when the device supports it, else the device default
    fn choose_config(
        device: &cpal::Device,
        preferred_rate: u32,
        preferred_channels: usize,
    ) -> AudioResult<cpal::SupportedStreamConfig> {
        let wanted = SampleRate(preferred_rate);
        if let Ok(mut ranges) = device.supported_output_configs() {
            let matching = ranges.find(|range| {
                usize::from(range.channels()) == preferred_channels
                    && range.min_sample_rate() <= wanted
                    && wanted <= range.max_sample_rate()
            });
            if let Some(range) = matching {
                return Ok(range.with_sample_rate(wanted));
            }
        }

        device
            .default_output_config()
            .map_err(|e| AudioError::Output(format!("Failed to get default output config: {}", e)))
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        consumer: Arc<Mutex<RingConsumer>>,
        volume: Arc<Mutex<f32>>,
        clear_flag: Arc<AtomicBool>,
    ) -> AudioResult<Stream> {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let mut consumer = consumer.lock();
                    let vol = *volume.lock();

                    // If clear flag is set, drain the buffer and output silence
                    if clear_flag.swap(false, Ordering::SeqCst) {
                        while consumer.try_pop().is_some() {}
                    }

                    for sample in data.iter_mut() {
                        let value = consumer.try_pop().unwrap_or(0.0) * vol;
                        *sample = T::from_sample(value);
                    }
                },
                move |err| {
                    log::error!("Audio output error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::Output(format!("Failed to build output stream: {}", e)))
    }

    /// Write samples to the output buffer
    /// Returns the number of samples actually written
    pub fn write(&self, samples: &[f32]) -> usize {
        let mut producer = self.producer.lock();
        let mut written = 0;

        for &sample in samples {
            if producer.try_push(sample).is_ok() {
                written += 1;
            } else {
                break;
            }
        }

        written
    }

    /// Write samples, waiting for the device to drain the buffer when full.
    ///
    /// Returns early once `cancel` is raised and fails when the device has
    /// taken nothing for `stall_limit`.
    pub fn write_blocking(
        &self,
        samples: &[f32],
        cancel: &AtomicBool,
        stall_limit: Duration,
    ) -> AudioResult<()> {
        feed(samples, cancel, stall_limit, |chunk| self.write(chunk))
    }

    /// Drop everything queued (pause, stop, seek)
    pub fn clear(&self) {
        self.clear_flag.store(true, Ordering::SeqCst);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Set the output volume (0.0 to 1.0)
    pub fn set_volume(&self, vol: f32) {
        *self.volume.lock() = vol.clamp(0.0, 1.0);
    }
}

/// Push `samples` through `write` until all are taken, the caller cancels, or
/// the sink stops accepting anything for `stall_limit`.
fn feed(
    samples: &[f32],
    cancel: &AtomicBool,
    stall_limit: Duration,
    mut write: impl FnMut(&[f32]) -> usize,
) -> AudioResult<()> {
    let mut remaining = samples;
    let mut last_progress = Instant::now();

    while !remaining.is_empty() {
        if cancel.load(Ordering::Acquire) {
            return Ok(());
        }
        let written = write(remaining);
        if written > 0 {
            remaining = &remaining[written..];
            last_progress = Instant::now();
        } else if last_progress.elapsed() >= stall_limit {
            return Err(AudioError::Output(format!(
                "Device stopped taking samples ({} still queued)",
                remaining.len()
            )));
        } else {
            std::thread::sleep(Duration::from_millis(1));
        }
    }
    Ok(())
}

/// Convert interleaved samples between channel counts.
///
/// Mono is duplicated across outputs; extra source channels beyond the output
/// count are dropped, missing ones are filled from the first channel.
pub fn remix_channels(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }

    let mut out = Vec::with_capacity(samples.len() / from * to);
    for frame in samples.chunks_exact(from) {
        for ch in 0..to {
            out.push(*frame.get(ch).unwrap_or(&frame[0]));
        }
    }
    out
}
