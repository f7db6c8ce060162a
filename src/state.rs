// Application state management
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::audio::{AudioResourceProvider, DeviceProvider};
use crate::catalog::Catalog;
use crate::mixer::MixController;
use crate::settings::AppSettings;

pub struct AppState<P: AudioResourceProvider = DeviceProvider> {
    pub mixer: Mutex<MixController<P>>,
    pub catalog: Catalog,
    pub settings: AppSettings,
    pub app_dir: PathBuf,
}

impl<P: AudioResourceProvider> AppState<P> {
    pub fn new(provider: P, catalog: Catalog, settings: AppSettings, app_dir: PathBuf) -> Self {
        let mixer = MixController::new(Arc::new(provider)).with_wave_bars(settings.mixer.wave_bars);
        Self {
            mixer: Mutex::new(mixer),
            catalog,
            settings,
            app_dir,
        }
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.settings.assets_path(&self.app_dir)
    }
}

impl AppState<DeviceProvider> {
    /// State backed by the default audio device
    pub fn with_device(catalog: Catalog, settings: AppSettings, app_dir: PathBuf) -> Self {
        let provider = DeviceProvider::new(
            settings.assets_path(&app_dir),
            settings.audio.volume,
            settings.audio.status_interval(),
        );
        Self::new(provider, catalog, settings, app_dir)
    }
}
