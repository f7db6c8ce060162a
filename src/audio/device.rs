// Device-backed resource provider
//
// Every loaded sound gets its own worker thread that owns the decoder and the
// output stream (cpal streams must stay on the thread that built them). The
// async resource methods only post commands to the worker; the worker reports
// back through the status listener.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::decoder::AudioDecoder;
use super::output::{remix_channels, AudioOutput};
use super::resample::StreamResampler;
use super::resource::{AudioResource, AudioResourceProvider, PlaybackStatus, StatusListener};
use crate::catalog::Sound;
use crate::error::{AudioError, AudioResult};

/// How long the device may refuse samples before a track gives up
const STALL_LIMIT: Duration = Duration::from_secs(2);

/// Loads catalog sounds from an assets directory and plays them on the default device.
pub struct DeviceProvider {
    assets_dir: PathBuf,
    volume: f32,
    status_interval: Duration,
}

impl DeviceProvider {
    pub fn new(assets_dir: PathBuf, volume: f32, status_interval: Duration) -> Self {
        Self {
            assets_dir,
            volume,
            status_interval,
        }
    }
}

#[async_trait]
impl AudioResourceProvider for DeviceProvider {
    type Resource = DeviceTrack;

    async fn load(&self, sound: &Sound) -> AudioResult<DeviceTrack> {
        let path = self.assets_dir.join(&sound.file);
        let shared = Arc::new(TrackShared::default());
        let (commands, inbox) = mpsc::channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let worker = TrackWorker {
            path,
            volume: self.volume,
            status_interval: self.status_interval,
            shared: Arc::clone(&shared),
            inbox,
        };
        let handle = std::thread::Builder::new()
            .name(format!("track-{}", sound.id))
            .spawn(move || worker.run(ready_tx))
            .map_err(|e| AudioError::Output(format!("Failed to spawn track worker: {}", e)))?;

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(AudioError::Closed),
        }

        log::debug!("Track {} ready", sound.id);
        Ok(DeviceTrack {
            commands: Mutex::new(commands),
            shared,
            worker: Mutex::new(Some(handle)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Pause,
    Stop,
    SeekToStart,
    Unload,
}

#[derive(Default)]
struct TrackShared {
    status: Mutex<PlaybackStatus>,
    listener: Mutex<Option<StatusListener>>,
    /// Raised on unload so a worker stuck feeding the device lets go
    shutdown: AtomicBool,
}

impl TrackShared {
    fn publish(&self, status: PlaybackStatus) {
        *self.status.lock() = status;
        // Never call out while holding our own locks
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(status);
        }
    }
}

/// One loaded sound, driven by its worker thread.
pub struct DeviceTrack {
    commands: Mutex<Sender<Command>>,
    shared: Arc<TrackShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DeviceTrack {
    fn send(&self, command: Command) -> AudioResult<()> {
        if !self.shared.status.lock().loaded {
            return Err(AudioError::NotLoaded);
        }
        self.commands
            .lock()
            .send(command)
            .map_err(|_| AudioError::Closed)
    }
}

#[async_trait]
impl AudioResource for DeviceTrack {
    async fn unload(&self) -> AudioResult<()> {
        self.shared.shutdown.store(true, Ordering::Release);
        // Ignore send errors: the worker may already be gone
        let _ = self.commands.lock().send(Command::Unload);
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            tokio::task::spawn_blocking(move || handle.join())
                .await
                .map_err(|e| AudioError::Output(format!("Task join error: {}", e)))?
                .map_err(|_| AudioError::Output("Track worker panicked".to_string()))?;
        }
        Ok(())
    }

    async fn play(&self) -> AudioResult<()> {
        self.send(Command::Play)
    }

    async fn pause(&self) -> AudioResult<()> {
        self.send(Command::Pause)
    }

    async fn stop(&self) -> AudioResult<()> {
        self.send(Command::Stop)
    }

    async fn seek_to_start(&self) -> AudioResult<()> {
        self.send(Command::SeekToStart)
    }

    async fn status(&self) -> AudioResult<PlaybackStatus> {
        Ok(*self.shared.status.lock())
    }

    fn set_status_listener(&self, listener: Option<StatusListener>) {
        *self.shared.listener.lock() = listener;
    }
}

impl Drop for DeviceTrack {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        let _ = self.commands.lock().send(Command::Unload);
    }
}

struct TrackWorker {
    path: PathBuf,
    volume: f32,
    status_interval: Duration,
    shared: Arc<TrackShared>,
    inbox: Receiver<Command>,
}

/// Decode/output state owned by the worker thread.
struct Playback {
    decoder: AudioDecoder,
    output: AudioOutput,
    resampler: Option<StreamResampler>,
    clock: Clock,
    playing: bool,
}

/// Position bookkeeping in source frames.
///
/// Containers that do not declare a length (plain MP3 streams often don't)
/// start with an unknown duration; it is learned the first time the stream
/// runs to its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Clock {
    sample_rate: u32,
    frames: u64,
    duration_ms: Option<u64>,
}

impl Clock {
    fn new(sample_rate: u32, duration_ms: Option<u64>) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            frames: 0,
            duration_ms,
        }
    }

    fn advance(&mut self, frames: u64) {
        self.frames += frames;
    }

    fn position_ms(&self) -> u64 {
        self.frames * 1000 / u64::from(self.sample_rate)
    }

    fn duration_ms(&self) -> u64 {
        self.duration_ms.unwrap_or(0)
    }

    fn reached_end(&mut self) {
        if self.duration_ms.is_none() {
            self.duration_ms = Some(self.position_ms());
        }
    }

    fn rewind(&mut self) {
        self.frames = 0;
    }
}

impl Playback {
    fn open(path: &Path, volume: f32) -> AudioResult<Self> {
        let decoder = AudioDecoder::open(path)?;
        let output = AudioOutput::open(decoder.sample_rate(), decoder.channels())?;
        output.set_volume(volume);

        let resampler = if output.sample_rate() != decoder.sample_rate() {
            log::debug!(
                "Resampling {:?} from {} Hz to {} Hz",
                path,
                decoder.sample_rate(),
                output.sample_rate()
            );
            Some(StreamResampler::new(
                decoder.sample_rate(),
                output.sample_rate(),
                decoder.channels(),
            )?)
        } else {
            None
        };

        Ok(Self {
            clock: Clock::new(decoder.sample_rate(), decoder.duration_ms()),
            decoder,
            output,
            resampler,
            playing: false,
        })
    }

    fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            loaded: true,
            position_ms: self.clock.position_ms(),
            duration_ms: self.clock.duration_ms(),
            is_playing: self.playing,
        }
    }

    fn rewind(&mut self) -> AudioResult<()> {
        self.output.clear();
        if let Some(resampler) = &mut self.resampler {
            resampler.reset();
        }
        self.clock.rewind();
        self.decoder.rewind()
    }

    /// Returns false once the stream has ended.
    fn pump(&mut self, cancel: &AtomicBool) -> AudioResult<bool> {
        let Some(samples) = self.decoder.decode_next()? else {
            self.clock.reached_end();
            return Ok(false);
        };
        let channels = self.decoder.channels();
        self.clock.advance((samples.len() / channels.max(1)) as u64);

        let samples = match &mut self.resampler {
            Some(resampler) => resampler.process(&samples)?,
            None => samples,
        };
        let samples = remix_channels(&samples, channels, self.output.channels());
        self.output.write_blocking(&samples, cancel, STALL_LIMIT)?;
        Ok(true)
    }
}

impl TrackWorker {
    fn run(self, ready: oneshot::Sender<AudioResult<()>>) {
        let mut playback = match Playback::open(&self.path, self.volume) {
            Ok(playback) => playback,
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };

        self.shared.publish(playback.status());
        if ready.send(Ok(())).is_err() {
            return;
        }

        let mut last_report = Instant::now();
        loop {
            let command = if playback.playing {
                match self.inbox.try_recv() {
                    Ok(command) => Some(command),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => break,
                }
            } else {
                match self.inbox.recv_timeout(self.status_interval) {
                    Ok(command) => Some(command),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            };

            if let Some(command) = command {
                if command == Command::Unload {
                    break;
                }
                if let Err(e) = self.apply(&mut playback, command) {
                    log::warn!("{:?} failed for {:?}: {}", command, self.path, e);
                    playback.playing = false;
                }
                self.shared.publish(playback.status());
                last_report = Instant::now();
            }

            if playback.playing {
                match playback.pump(&self.shared.shutdown) {
                    Ok(true) => {}
                    Ok(false) => {
                        log::debug!("Reached end of {:?}", self.path);
                        playback.playing = false;
                        self.shared.publish(playback.status());
                    }
                    Err(e) => {
                        log::warn!("Playback of {:?} stopped: {}", self.path, e);
                        playback.playing = false;
                        self.shared.publish(playback.status());
                    }
                }

                if last_report.elapsed() >= self.status_interval {
                    self.shared.publish(playback.status());
                    last_report = Instant::now();
                }
            }
        }

        playback.output.clear();
        self.shared.publish(PlaybackStatus::unloaded());
    }

    fn apply(&self, playback: &mut Playback, command: Command) -> AudioResult<()> {
        match command {
            Command::Play => playback.playing = true,
            Command::Pause => {
                playback.playing = false;
                playback.output.clear();
            }
            Command::Stop => {
                playback.playing = false;
                playback.rewind()?;
            }
            Command::SeekToStart => playback.rewind()?,
            Command::Unload => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_position_follows_frames() {
        let mut clock = Clock::new(44_100, Some(3_000));
        clock.advance(44_100);
        clock.advance(22_050);
        assert_eq!(clock.position_ms(), 1_500);
        assert_eq!(clock.duration_ms(), 3_000);

        clock.rewind();
        assert_eq!(clock.position_ms(), 0);
    }

    #[test]
    fn test_clock_learns_undeclared_duration_at_end() {
        let mut clock = Clock::new(48_000, None);
        clock.advance(96_000);
        assert_eq!(clock.duration_ms(), 0);

        clock.reached_end();
        assert_eq!(clock.duration_ms(), 2_000);

        // A replay keeps the learned length
        clock.rewind();
        clock.advance(48_000);
        clock.reached_end();
        assert_eq!(clock.duration_ms(), 2_000);
        assert_eq!(clock.position_ms(), 1_000);
    }

    #[test]
    fn test_clock_keeps_declared_duration() {
        let mut clock = Clock::new(48_000, Some(5_000));
        clock.advance(48_000);
        clock.reached_end();
        assert_eq!(clock.duration_ms(), 5_000);
    }
}
