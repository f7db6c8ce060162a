// Audio mix controller
//
// Owns the selection of one theme session and the resources backing it. Public
// operations take `&mut self` and so never interleave; the only concurrency is
// the fan-out of transport requests inside one operation and status callbacks
// arriving from provider threads.
//
// Resource failures never propagate. They are logged, the track is marked
// degraded, and the mix carries on with whatever did work. Play/pause writes
// the intended state immediately; the next status callback replaces it with
// the aggregate of what the resources actually report.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use futures_util::future::join_all;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;

use super::progress::{aggregate, Aggregate, TrackStatus};
use super::wave;
use crate::audio::resource::{AudioResource, AudioResourceProvider, PlaybackStatus, StatusListener};
use crate::catalog::Theme;
use crate::error::{AudioError, AudioResult};

/// Result of [`MixController::toggle_track`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackToggle {
    Selected,
    Deselected,
    /// Mix already saved, no active theme, or the id is not in the theme
    Ignored,
}

/// Result of [`MixController::toggle_play`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayToggle {
    Started,
    Paused,
    /// Nothing selected
    Ignored,
}

/// Serializable view of the controller for the UI.
#[derive(Debug, Clone, Serialize)]
pub struct MixerSnapshot {
    pub theme: Option<String>,
    pub selection: Vec<String>,
    pub progress: f64,
    pub is_playing: bool,
    pub saved: bool,
    pub degraded: Vec<String>,
    pub wave: Vec<f32>,
    pub filled_bars: usize,
}

/// Status table written by resource callbacks.
///
/// Each loaded resource is stamped with a load token; reports carrying a token
/// that is no longer live for their id are stale and dropped.
#[derive(Default)]
struct SharedStatus {
    tracks: HashMap<String, TrackStatus>,
    live: HashMap<String, u64>,
    aggregate: Aggregate,
}

impl SharedStatus {
    fn apply(&mut self, id: &str, token: u64, status: PlaybackStatus) {
        if self.live.get(id) != Some(&token) {
            return;
        }
        if status.loaded {
            self.tracks.insert(id.to_string(), status.into());
        } else {
            self.tracks.remove(id);
        }
        self.recompute();
    }

    fn forget(&mut self, id: &str) {
        self.live.remove(id);
        self.tracks.remove(id);
        self.recompute();
    }

    fn recompute(&mut self) {
        self.aggregate = aggregate(self.tracks.values());
    }
}

pub struct MixController<P: AudioResourceProvider> {
    provider: Arc<P>,
    theme: Option<Theme>,
    selection: BTreeSet<String>,
    loaded: HashMap<String, P::Resource>,
    shared: Arc<Mutex<SharedStatus>>,
    degraded: BTreeSet<String>,
    saved: bool,
    next_token: u64,
    wave_bars: usize,
}

impl<P: AudioResourceProvider> MixController<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            theme: None,
            selection: BTreeSet::new(),
            loaded: HashMap::new(),
            shared: Arc::new(Mutex::new(SharedStatus::default())),
            degraded: BTreeSet::new(),
            saved: false,
            next_token: 0,
            wave_bars: wave::DEFAULT_BAR_COUNT,
        }
    }

    pub fn with_wave_bars(mut self, wave_bars: usize) -> Self {
        self.wave_bars = wave_bars;
        self
    }

    pub fn theme(&self) -> Option<&Theme> {
        self.theme.as_ref()
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    /// Ids that currently own a live resource, sorted.
    pub fn loaded_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.loaded.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn track_statuses(&self) -> HashMap<String, TrackStatus> {
        self.shared.lock().tracks.clone()
    }

    pub fn progress(&self) -> f64 {
        self.shared.lock().aggregate.progress
    }

    pub fn is_playing(&self) -> bool {
        self.shared.lock().aggregate.is_playing
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    /// Tracks whose last load or transport request failed.
    pub fn degraded_tracks(&self) -> &BTreeSet<String> {
        &self.degraded
    }

    pub fn wave(&self) -> Vec<f32> {
        wave::seeded_wave(&wave::selection_seed(&self.selection), self.wave_bars)
    }

    pub fn filled_bars(&self) -> usize {
        wave::filled_bars(self.progress(), self.wave_bars)
    }

    pub fn snapshot(&self) -> MixerSnapshot {
        let aggregate = self.shared.lock().aggregate;
        MixerSnapshot {
            theme: self.theme.as_ref().map(|t| t.id.clone()),
            selection: self.selection.iter().cloned().collect(),
            progress: aggregate.progress,
            is_playing: aggregate.is_playing,
            saved: self.saved,
            degraded: self.degraded.iter().cloned().collect(),
            wave: self.wave(),
            filled_bars: wave::filled_bars(aggregate.progress, self.wave_bars),
        }
    }

    /// Start a fresh session for `theme`, releasing everything from the last one.
    pub async fn enter_theme(&mut self, theme: Theme) {
        self.reset_session().await;
        info!("Entered theme {} ({} sounds)", theme.id, theme.sounds.len());
        self.theme = Some(theme);
    }

    /// End the session without starting a new one.
    pub async fn leave_theme(&mut self) {
        self.reset_session().await;
        if let Some(theme) = self.theme.take() {
            info!("Left theme {}", theme.id);
        }
    }

    /// Freeze the selection. Playback controls stay usable.
    pub fn save(&mut self) {
        if !self.saved {
            info!("Saved mix: {:?}", self.selection);
        }
        self.saved = true;
    }

    /// Select or deselect one sound of the active theme.
    pub async fn toggle_track(&mut self, id: &str) -> TrackToggle {
        if self.saved {
            debug!("Ignoring toggle of {id}: mix is saved");
            return TrackToggle::Ignored;
        }
        if !self.theme.as_ref().is_some_and(|t| t.contains(id)) {
            debug!("Ignoring toggle of {id}: not part of the active theme");
            return TrackToggle::Ignored;
        }

        let outcome = if self.selection.remove(id) {
            self.unload(id).await;
            TrackToggle::Deselected
        } else {
            self.selection.insert(id.to_string());
            self.ensure_loaded(id).await;
            TrackToggle::Selected
        };

        // The set of contributing tracks changed, so the old value is stale
        self.shared.lock().aggregate.progress = 0.0;
        outcome
    }

    /// Make sure `id` has a live resource. Returns whether it has one afterwards.
    pub async fn ensure_loaded(&mut self, id: &str) -> bool {
        if self.loaded.contains_key(id) {
            return true;
        }
        let Some(sound) = self.theme.as_ref().and_then(|t| t.sound(id)).cloned() else {
            debug!("Cannot load {id}: not part of the active theme");
            return false;
        };

        match self.provider.load(&sound).await {
            Ok(resource) => {
                self.next_token += 1;
                let token = self.next_token;
                self.shared.lock().live.insert(id.to_string(), token);
                resource.set_status_listener(Some(self.status_listener(id, token)));
                // Reports published before the listener existed never reached us
                match resource.status().await {
                    Ok(status) => self.shared.lock().apply(id, token, status),
                    Err(e) => debug!("No initial status for {id}: {e}"),
                }
                self.loaded.insert(id.to_string(), resource);
                self.degraded.remove(id);
                debug!("Loaded {id} (token {token})");
                true
            }
            Err(e) => {
                self.absorb(id, "load", Err(e));
                false
            }
        }
    }

    /// Release the resource of `id`, dropping its status entry.
    pub async fn unload(&mut self, id: &str) {
        self.shared.lock().forget(id);
        self.degraded.remove(id);

        let Some(resource) = self.loaded.remove(id) else {
            return;
        };
        resource.set_status_listener(None);
        if let Err(e) = release(&resource).await {
            warn!("Unloading {id} failed: {e}");
        }
        debug!("Unloaded {id}");
    }

    /// Play or pause every selected track together.
    pub async fn toggle_play(&mut self) -> PlayToggle {
        if self.selection.is_empty() {
            return PlayToggle::Ignored;
        }

        // Tracks whose earlier load failed get another chance here
        let missing: Vec<String> = self
            .selection
            .iter()
            .filter(|id| !self.loaded.contains_key(*id))
            .cloned()
            .collect();
        for id in missing {
            self.ensure_loaded(&id).await;
        }

        let pausing = self.shared.lock().aggregate.is_playing;
        let targets: Vec<(&String, &P::Resource)> = self
            .selection
            .iter()
            .filter_map(|id| self.loaded.get(id).map(|resource| (id, resource)))
            .collect();

        let results: Vec<(String, AudioResult<()>)> = if pausing {
            join_all(
                targets
                    .into_iter()
                    .map(|(id, resource)| async move { (id.clone(), pause_if_playing(resource).await) }),
            )
            .await
        } else {
            join_all(
                targets
                    .into_iter()
                    .map(|(id, resource)| async move { (id.clone(), start_from_top(resource).await) }),
            )
            .await
        };

        let op = if pausing { "pause" } else { "play" };
        for (id, result) in results {
            self.absorb(&id, op, result);
        }

        self.shared.lock().aggregate.is_playing = !pausing;
        if pausing {
            info!("Paused mix");
            PlayToggle::Paused
        } else {
            info!("Started mix of {} tracks", self.selection.len());
            PlayToggle::Started
        }
    }

    async fn reset_session(&mut self) {
        let tracks: Vec<(String, P::Resource)> = self.loaded.drain().collect();
        for (_, resource) in &tracks {
            resource.set_status_listener(None);
        }

        let results = join_all(
            tracks
                .iter()
                .map(|(id, resource)| async move { (id, release(resource).await) }),
        )
        .await;
        for (id, result) in results {
            if let Err(e) = result {
                warn!("Unloading {id} during reset failed: {e}");
            }
        }

        self.selection.clear();
        *self.shared.lock() = SharedStatus::default();
        self.degraded.clear();
        self.saved = false;
    }

    /// Failure policy for resource requests: log, mark degraded, carry on.
    fn absorb(&mut self, id: &str, op: &str, result: AudioResult<()>) {
        match result {
            Ok(()) => {
                self.degraded.remove(id);
            }
            Err(e) => {
                warn!("{op} failed for {id}: {e}");
                self.degraded.insert(id.to_string());
            }
        }
    }

    fn status_listener(&self, id: &str, token: u64) -> StatusListener {
        let shared = Arc::clone(&self.shared);
        let id = id.to_string();
        Arc::new(move |status: PlaybackStatus| shared.lock().apply(&id, token, status))
    }
}

/// Best-effort stop, then unload.
async fn release<R: AudioResource>(resource: &R) -> AudioResult<()> {
    if let Err(e) = resource.stop().await {
        debug!("Stop before unload failed: {e}");
    }
    resource.unload().await
}

async fn pause_if_playing<R: AudioResource>(resource: &R) -> AudioResult<()> {
    let status = resource.status().await?;
    if status.loaded && status.is_playing {
        resource.pause().await?;
    }
    Ok(())
}

async fn start_from_top<R: AudioResource>(resource: &R) -> AudioResult<()> {
    let status = resource.status().await?;
    if !status.loaded {
        return Err(AudioError::NotLoaded);
    }
    resource.seek_to_start().await?;
    resource.play().await
}
