use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// List of supported audio file extensions
const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "wav", "m4a", "aac"];

/// Scanner for finding sound assets in a directory tree
pub struct AssetScanner;

impl AssetScanner {
    /// Scan a directory recursively and return all audio file paths
    pub fn scan<P: AsRef<Path>>(directory: P) -> Result<HashSet<PathBuf>, anyhow::Error> {
        let mut audio_files = HashSet::new();

        for entry in WalkDir::new(directory)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            if Self::is_supported(path) {
                audio_files.insert(path.to_path_buf());
            }
        }

        log::debug!("Asset scan found {} audio files", audio_files.len());
        Ok(audio_files)
    }

    /// Check if the file has a supported audio extension
    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("sounds/extra");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("sounds/gulls.mp3"), b"").unwrap();
        fs::write(nested.join("bell.OGG"), b"").unwrap();
        fs::write(nested.join("notes.txt"), b"").unwrap();

        let found = AssetScanner::scan(dir.path()).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&dir.path().join("sounds/gulls.mp3")));
        assert!(found.contains(&nested.join("bell.OGG")));
    }

    #[test]
    fn test_scan_missing_directory() {
        let found = AssetScanner::scan("/definitely/not/here").unwrap();
        assert!(found.is_empty());
    }
}
