// Command handlers
// The UI-facing surface: each handler takes the app state and returns
// something serializable, or an error message for display
use serde::Serialize;

use crate::audio::AudioResourceProvider;
use crate::catalog::MissingAsset;
use crate::mixer::{MixerSnapshot, PlayToggle, TrackToggle};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct SoundSummary {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThemeSummary {
    pub id: String,
    pub title: String,
    pub sounds: Vec<SoundSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetReport {
    pub assets_dir: String,
    pub total: usize,
    pub missing: Vec<MissingAsset>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToggleResponse<T> {
    pub outcome: T,
    pub state: MixerSnapshot,
}

pub fn list_themes<P: AudioResourceProvider>(state: &AppState<P>) -> Vec<ThemeSummary> {
    state
        .catalog
        .themes
        .iter()
        .map(|theme| ThemeSummary {
            id: theme.id.clone(),
            title: theme.title.clone(),
            sounds: theme
                .sounds
                .iter()
                .map(|s| SoundSummary {
                    id: s.id.clone(),
                    label: s.label.clone(),
                })
                .collect(),
        })
        .collect()
}

pub async fn check_assets<P: AudioResourceProvider>(
    state: &AppState<P>,
) -> Result<AssetReport, String> {
    let catalog = state.catalog.clone();
    let assets_dir = state.assets_dir();

    let report = tokio::task::spawn_blocking(move || {
        let total = catalog.themes.iter().map(|t| t.sounds.len()).sum();
        let missing = catalog.missing_assets(&assets_dir);
        AssetReport {
            assets_dir: assets_dir.to_string_lossy().to_string(),
            total,
            missing,
        }
    })
    .await
    .map_err(|e| format!("Task join error: {}", e))?;

    Ok(report)
}

pub async fn select_theme<P: AudioResourceProvider>(
    state: &AppState<P>,
    theme_id: &str,
) -> Result<MixerSnapshot, String> {
    let theme = state
        .catalog
        .theme(theme_id)
        .cloned()
        .ok_or_else(|| format!("Unknown theme: {}", theme_id))?;

    let mut mixer = state.mixer.lock().await;
    mixer.enter_theme(theme).await;
    Ok(mixer.snapshot())
}

pub async fn leave_theme<P: AudioResourceProvider>(state: &AppState<P>) -> MixerSnapshot {
    let mut mixer = state.mixer.lock().await;
    mixer.leave_theme().await;
    mixer.snapshot()
}

pub async fn toggle_track<P: AudioResourceProvider>(
    state: &AppState<P>,
    sound_id: &str,
) -> ToggleResponse<TrackToggle> {
    let mut mixer = state.mixer.lock().await;
    let outcome = mixer.toggle_track(sound_id).await;
    ToggleResponse {
        outcome,
        state: mixer.snapshot(),
    }
}

pub async fn toggle_play<P: AudioResourceProvider>(
    state: &AppState<P>,
) -> ToggleResponse<PlayToggle> {
    let mut mixer = state.mixer.lock().await;
    let outcome = mixer.toggle_play().await;
    ToggleResponse {
        outcome,
        state: mixer.snapshot(),
    }
}

pub async fn save_mix<P: AudioResourceProvider>(state: &AppState<P>) -> Result<MixerSnapshot, String> {
    let mut mixer = state.mixer.lock().await;
    if mixer.theme().is_none() {
        return Err("No theme selected".to_string());
    }
    mixer.save();
    Ok(mixer.snapshot())
}

pub async fn get_mixer_state<P: AudioResourceProvider>(state: &AppState<P>) -> MixerSnapshot {
    state.mixer.lock().await.snapshot()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::ScriptedProvider;
    use crate::catalog::Catalog;
    use crate::settings::AppSettings;
    use std::path::PathBuf;

    fn state() -> (AppState<ScriptedProvider>, ScriptedProvider) {
        let provider = ScriptedProvider::new();
        let state = AppState::new(
            provider.clone(),
            Catalog::builtin(),
            AppSettings::default(),
            PathBuf::from("/tmp/soundscape-test"),
        );
        (state, provider)
    }

    #[test]
    fn test_list_themes() {
        let (state, _) = state();
        let themes = list_themes(&state);
        assert_eq!(themes.len(), 3);
        assert_eq!(themes[0].title, "Medieval Marketplace");
        assert_eq!(themes[0].sounds.len(), 8);
        assert_eq!(themes[2].sounds[1].label, "Hearth crackle");
    }

    #[tokio::test]
    async fn test_unknown_theme_is_an_error() {
        let (state, _) = state();
        assert!(select_theme(&state, "castle").await.is_err());
    }

    #[tokio::test]
    async fn test_save_requires_theme() {
        let (state, _) = state();
        assert!(save_mix(&state).await.is_err());
    }

    #[tokio::test]
    async fn test_mix_session() {
        let (state, provider) = state();
        select_theme(&state, "kitchen").await.unwrap();

        let response = toggle_track(&state, "fire_crackle").await;
        assert_eq!(response.outcome, TrackToggle::Selected);
        toggle_track(&state, "knife_chop").await;

        let saved = save_mix(&state).await.unwrap();
        assert!(saved.saved);
        assert_eq!(toggle_track(&state, "spoon_stir").await.outcome, TrackToggle::Ignored);

        let response = toggle_play(&state).await;
        assert_eq!(response.outcome, PlayToggle::Started);
        assert!(response.state.is_playing);
        assert_eq!(response.state.selection, vec!["fire_crackle", "knife_chop"]);

        let left = leave_theme(&state).await;
        assert!(left.theme.is_none());
        assert!(left.selection.is_empty());
        assert!(provider.live_ids().is_empty());
    }

    #[tokio::test]
    async fn test_check_assets_reports_everything_missing() {
        let (state, _) = state();
        let report = check_assets(&state).await.unwrap();
        assert_eq!(report.total, 20);
        assert_eq!(report.missing.len(), 20);
    }

    #[tokio::test]
    async fn test_snapshot_is_serializable() {
        let (state, _) = state();
        select_theme(&state, "ship").await.unwrap();
        toggle_track(&state, "gulls").await;

        let json = serde_json::to_value(get_mixer_state(&state).await).unwrap();
        assert_eq!(json["theme"], "ship");
        assert_eq!(json["selection"][0], "gulls");
        assert_eq!(json["wave"].as_array().unwrap().len(), 28);
    }
}
