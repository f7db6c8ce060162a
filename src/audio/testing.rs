// Scripted in-memory provider for exercising the mixer without a sound device

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::resource::{AudioResource, AudioResourceProvider, PlaybackStatus, StatusListener};
use crate::catalog::Sound;
use crate::error::{AudioError, AudioResult};

#[derive(Default)]
struct ProviderState {
    fail_load: HashSet<String>,
    /// Scripted transport failures as (op, id)
    failing: HashSet<(String, String)>,
    loads: HashMap<String, usize>,
    durations: HashMap<String, u64>,
    live: HashMap<String, Arc<TrackState>>,
    calls: Vec<String>,
}

struct TrackState {
    status: Mutex<PlaybackStatus>,
    listener: Mutex<Option<StatusListener>>,
}

impl TrackState {
    fn update(&self, change: impl FnOnce(&mut PlaybackStatus)) {
        let status = {
            let mut status = self.status.lock();
            change(&mut status);
            *status
        };
        self.notify(status);
    }

    fn notify(&self, status: PlaybackStatus) {
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(status);
        }
    }
}

/// Provider whose resources only change state when told to.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_load(&self, id: &str) {
        self.state.lock().fail_load.insert(id.to_string());
    }

    pub fn allow_load(&self, id: &str) {
        self.state.lock().fail_load.remove(id);
    }

    pub fn fail_play(&self, id: &str) {
        self.fail("play", id);
    }

    pub fn fail_pause(&self, id: &str) {
        self.fail("pause", id);
    }

    pub fn fail_seek(&self, id: &str) {
        self.fail("seek", id);
    }

    pub fn fail_stop(&self, id: &str) {
        self.fail("stop", id);
    }

    /// The resource stays live in the provider when its unload fails.
    pub fn fail_unload(&self, id: &str) {
        self.fail("unload", id);
    }

    fn fail(&self, op: &str, id: &str) {
        self.state
            .lock()
            .failing
            .insert((op.to_string(), id.to_string()));
    }

    /// Length reported by resources loaded for `id` from now on.
    pub fn set_duration(&self, id: &str, duration_ms: u64) {
        self.state.lock().durations.insert(id.to_string(), duration_ms);
    }

    /// Number of successful loads issued for `id`.
    pub fn load_count(&self, id: &str) -> usize {
        self.state.lock().loads.get(id).copied().unwrap_or(0)
    }

    /// Ids with a resource that has not been unloaded, sorted.
    pub fn live_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.state.lock().live.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Transport calls in the order they were issued, as `op:id`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Push a status report for a live resource through its listener.
    pub fn emit(&self, id: &str, status: PlaybackStatus) {
        let track = self.state.lock().live.get(id).cloned();
        if let Some(track) = track {
            *track.status.lock() = status;
            track.notify(status);
        }
    }

    /// The listener currently installed on a live resource.
    pub fn listener(&self, id: &str) -> Option<StatusListener> {
        let track = self.state.lock().live.get(id).cloned()?;
        let listener = track.listener.lock().clone();
        listener
    }
}

#[async_trait]
impl AudioResourceProvider for ScriptedProvider {
    type Resource = ScriptedTrack;

    async fn load(&self, sound: &Sound) -> AudioResult<ScriptedTrack> {
        let mut state = self.state.lock();
        if state.fail_load.contains(&sound.id) {
            return Err(AudioError::Decode(format!("scripted load failure for {}", sound.id)));
        }
        *state.loads.entry(sound.id.clone()).or_default() += 1;
        let duration_ms = state.durations.get(&sound.id).copied().unwrap_or(0);

        let track = Arc::new(TrackState {
            status: Mutex::new(PlaybackStatus::ready(duration_ms)),
            listener: Mutex::new(None),
        });
        state.live.insert(sound.id.clone(), Arc::clone(&track));

        Ok(ScriptedTrack {
            id: sound.id.clone(),
            track,
            provider: Arc::clone(&self.state),
        })
    }
}

pub struct ScriptedTrack {
    id: String,
    track: Arc<TrackState>,
    provider: Arc<Mutex<ProviderState>>,
}

impl ScriptedTrack {
    /// Log the call and fail it if it was scripted to.
    fn record(&self, op: &str) -> AudioResult<()> {
        let mut provider = self.provider.lock();
        provider.calls.push(format!("{op}:{}", self.id));
        if provider.failing.contains(&(op.to_string(), self.id.clone())) {
            return Err(AudioError::Output(format!("scripted {op} failure")));
        }
        Ok(())
    }

    fn ensure_loaded(&self) -> AudioResult<()> {
        if self.track.status.lock().loaded {
            Ok(())
        } else {
            Err(AudioError::NotLoaded)
        }
    }
}

#[async_trait]
impl AudioResource for ScriptedTrack {
    async fn unload(&self) -> AudioResult<()> {
        self.record("unload")?;
        self.provider.lock().live.remove(&self.id);
        self.track.update(|s| *s = PlaybackStatus::unloaded());
        Ok(())
    }

    async fn play(&self) -> AudioResult<()> {
        self.record("play")?;
        self.ensure_loaded()?;
        self.track.update(|s| s.is_playing = true);
        Ok(())
    }

    async fn pause(&self) -> AudioResult<()> {
        self.record("pause")?;
        self.ensure_loaded()?;
        self.track.update(|s| s.is_playing = false);
        Ok(())
    }

    async fn stop(&self) -> AudioResult<()> {
        self.record("stop")?;
        self.ensure_loaded()?;
        self.track.update(|s| {
            s.is_playing = false;
            s.position_ms = 0;
        });
        Ok(())
    }

    async fn seek_to_start(&self) -> AudioResult<()> {
        self.record("seek")?;
        self.ensure_loaded()?;
        self.track.update(|s| s.position_ms = 0);
        Ok(())
    }

    async fn status(&self) -> AudioResult<PlaybackStatus> {
        Ok(*self.track.status.lock())
    }

    fn set_status_listener(&self, listener: Option<StatusListener>) {
        *self.track.listener.lock() = listener;
    }
}
