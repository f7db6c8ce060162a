// Soundscape - ambient sound-layer mixer for themed scenes
// Module declarations
pub mod audio;
pub mod catalog;
pub mod commands;
pub mod error;
pub mod logging;
pub mod mixer;
pub mod settings;
pub mod state;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use catalog::Catalog;
use mixer::{PlayToggle, TrackToggle};
use settings::AppSettings;
use state::AppState;

#[derive(Debug, Parser)]
#[command(name = "soundscape", version, about = "Layer ambient sounds into a scene mix")]
struct Cli {
    /// Directory holding settings.json and the assets directory
    #[arg(long, env = "SOUNDSCAPE_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List scenes and their sounds
    Themes,
    /// Report sound files missing from the assets directory
    Scan,
    /// Build a mix for a scene and play it
    Mix {
        theme: String,
        #[arg(required = true)]
        sounds: Vec<String>,
        /// Lock the selection before playing
        #[arg(long)]
        save: bool,
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Print the effective settings
    Config {
        /// Also write them to settings.json in the data directory
        #[arg(long)]
        write: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let settings = AppSettings::load(&cli.data_dir)?;
    logging::init(&settings.logging.level);

    let catalog_path = settings.catalog.path.as_ref().map(|p| cli.data_dir.join(p));
    let catalog = Catalog::load_or_builtin(catalog_path.as_deref())?;

    let state = AppState::with_device(catalog, settings, cli.data_dir);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(dispatch(&state, cli.command))
}

async fn dispatch(state: &AppState, command: Command) -> Result<()> {
    match command {
        Command::Themes => {
            for theme in commands::list_themes(state) {
                println!("{} - {}", theme.id, theme.title);
                for sound in theme.sounds {
                    println!("    {:<20} {}", sound.id, sound.label);
                }
            }
        }
        Command::Scan => {
            let report = commands::check_assets(state).await.map_err(anyhow::Error::msg)?;
            println!(
                "{}: {} of {} sounds present",
                report.assets_dir,
                report.total - report.missing.len(),
                report.total
            );
            for missing in report.missing {
                println!("    missing {}/{}: {:?}", missing.theme, missing.sound, missing.path);
            }
        }
        Command::Mix {
            theme,
            sounds,
            save,
            seconds,
        } => {
            play_mix(state, &theme, &sounds, save, seconds.map(Duration::from_secs)).await?;
        }
        Command::Config { write } => {
            println!("{}", effective_config(&state.settings, &state.app_dir, write)?);
        }
    }
    Ok(())
}

async fn play_mix(
    state: &AppState,
    theme: &str,
    sounds: &[String],
    save: bool,
    limit: Option<Duration>,
) -> Result<()> {
    commands::select_theme(state, theme).await.map_err(anyhow::Error::msg)?;

    for sound in sounds {
        let response = commands::toggle_track(state, sound).await;
        if response.outcome == TrackToggle::Ignored {
            log::warn!("{} is not a sound of {}", sound, theme);
        }
    }
    if save {
        commands::save_mix(state).await.map_err(anyhow::Error::msg)?;
    }

    let started = commands::toggle_play(state).await;
    if started.outcome != PlayToggle::Started {
        commands::leave_theme(state).await;
        bail!("Nothing to play");
    }
    for id in &started.state.degraded {
        log::warn!("{} could not be started", id);
    }
    if started.state.degraded.len() == started.state.selection.len() {
        commands::leave_theme(state).await;
        bail!("None of the selected sounds could be played");
    }

    let begin = Instant::now();
    // Give the tracks a moment to report before trusting the playing flag
    tokio::time::sleep(Duration::from_millis(300)).await;
    loop {
        let snapshot = commands::get_mixer_state(state).await;
        print!(
            "\r{} {:>3}%",
            render_wave(&snapshot.wave, snapshot.filled_bars),
            (snapshot.progress * 100.0) as u32
        );
        let _ = io::stdout().flush();

        if !snapshot.is_playing || limit.is_some_and(|limit| begin.elapsed() >= limit) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    println!();

    commands::leave_theme(state).await;
    Ok(())
}

/// Pretty JSON of `settings`, persisted into `app_dir` first when `write` is set
fn effective_config(settings: &AppSettings, app_dir: &Path, write: bool) -> Result<String> {
    if write {
        settings.save(app_dir)?;
    }
    serde_json::to_string_pretty(settings).context("Failed to serialize settings")
}

fn render_wave(wave: &[f32], filled: usize) -> String {
    const LEVELS: [char; 5] = ['▁', '▂', '▄', '▆', '█'];
    const PENDING: [char; 5] = ['.', ':', '-', '=', '#'];

    wave.iter()
        .enumerate()
        .map(|(i, height)| {
            let level = ((height * 4.0).round() as usize).min(4);
            if i < filled {
                LEVELS[level]
            } else {
                PENDING[level]
            }
        })
        .collect()
}
