// Content catalog
// Static mapping of scene themes to the ambient sounds that can be layered in them

pub mod scanner;
mod themes;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub use scanner::AssetScanner;

/// One ambient sound that can be layered into a mix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sound {
    /// Stable key, unique within its theme
    pub id: String,
    pub label: String,
    /// Audio file, relative to the assets directory
    pub file: PathBuf,
}

/// A scene the user can build a mix for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: String,
    pub title: String,
    pub sounds: Vec<Sound>,
}

impl Theme {
    pub fn sound(&self, id: &str) -> Option<&Sound> {
        self.sounds.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sound(id).is_some()
    }
}

/// A sound whose audio file could not be found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingAsset {
    pub theme: String,
    pub sound: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub themes: Vec<Theme>,
}

impl Catalog {
    /// The scenes shipped with the game.
    pub fn builtin() -> Self {
        Self {
            themes: themes::builtin_themes(),
        }
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {:?}", path))?;
        let catalog: Catalog = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog file {:?}", path))?;
        log::info!("Loaded {} themes from {:?}", catalog.themes.len(), path);
        Ok(catalog)
    }

    /// Load the configured catalog, or fall back to the built-in scenes.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn theme(&self, id: &str) -> Option<&Theme> {
        self.themes.iter().find(|t| t.id == id)
    }

    /// Sounds whose file is not present under `assets_dir`.
    pub fn missing_assets(&self, assets_dir: &Path) -> Vec<MissingAsset> {
        let present = AssetScanner::scan(assets_dir).unwrap_or_default();

        let mut missing = Vec::new();
        for theme in &self.themes {
            for sound in &theme.sounds {
                let path = assets_dir.join(&sound.file);
                if !present.contains(&path) {
                    missing.push(MissingAsset {
                        theme: theme.id.clone(),
                        sound: sound.id.clone(),
                        path,
                    });
                }
            }
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_has_three_scenes() {
        let catalog = Catalog::builtin();
        let ids: Vec<_> = catalog.themes.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["market", "ship", "kitchen"]);
    }

    #[test]
    fn test_sound_ids_unique_within_theme() {
        for theme in Catalog::builtin().themes {
            let unique: HashSet<_> = theme.sounds.iter().map(|s| &s.id).collect();
            assert_eq!(unique.len(), theme.sounds.len(), "duplicate id in {}", theme.id);
        }
    }

    #[test]
    fn test_theme_lookup() {
        let catalog = Catalog::builtin();
        let ship = catalog.theme("ship").unwrap();
        assert_eq!(ship.title, "Medieval Ship");
        assert_eq!(ship.sound("gulls").unwrap().label, "Seagulls");
        assert!(!ship.contains("dog_barking"));
        assert!(catalog.theme("castle").is_none());
    }

    #[test]
    fn test_missing_assets() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sounds")).unwrap();
        fs::write(dir.path().join("sounds/gulls.mp3"), b"").unwrap();

        let catalog = Catalog {
            themes: vec![Theme {
                id: "ship".to_string(),
                title: "Ship".to_string(),
                sounds: vec![
                    Sound {
                        id: "gulls".to_string(),
                        label: "Seagulls".to_string(),
                        file: PathBuf::from("sounds/gulls.mp3"),
                    },
                    Sound {
                        id: "ship_bell".to_string(),
                        label: "Ship bell".to_string(),
                        file: PathBuf::from("sounds/ship_bell.mp3"),
                    },
                ],
            }],
        };

        let missing = catalog.missing_assets(dir.path());
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].sound, "ship_bell");
    }

    #[test]
    fn test_load_json_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(
            &path,
            r#"{"themes":[{"id":"forest","title":"Forest","sounds":[
                {"id":"owl","label":"Owl","file":"owl.ogg"}]}]}"#,
        )
        .unwrap();

        let catalog = Catalog::load_or_builtin(Some(&path)).unwrap();
        assert_eq!(catalog.themes.len(), 1);
        assert_eq!(catalog.theme("forest").unwrap().sounds[0].file, PathBuf::from("owl.ogg"));
    }
}
