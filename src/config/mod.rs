// Configuration management for lofiplayer
// Handles loading/saving settings, with sensible defaults when config is missing

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::{CatalogSource, DirectoryCatalog, HttpCatalog};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub playback: PlaybackConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Base URL of a server exposing `GET /api/audio`. Wins over directories.
    pub endpoint: Option<String>,
    pub music_directories: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub volume: f32,
    pub seek_step_seconds: f64,
    pub start_muted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub tick_ms: u64,
    pub show_panel: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            music_directories: vec![
                dirs::audio_dir().unwrap_or_else(|| PathBuf::from("~/Music")),
            ],
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            volume: 0.7,
            seek_step_seconds: 5.0,
            start_muted: false,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            show_panel: true,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    /// A missing file is created with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read {}", config_path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("failed to parse {}", config_path.display()))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;

        Ok(())
    }

    pub fn catalog_source(&self) -> Result<CatalogSource> {
        match &self.catalog.endpoint {
            Some(endpoint) => {
                let source = HttpCatalog::new(endpoint)
                    .with_context(|| format!("bad catalog endpoint {}", endpoint))?;
                Ok(CatalogSource::Http(source))
            }
            None => Ok(CatalogSource::Directory(DirectoryCatalog::new(
                self.catalog.music_directories.clone(),
            ))),
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("lofiplayer");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested/config.toml");

        let config = Config::load(Some(&path)).expect("load");
        assert!(path.exists());
        assert_eq!(config.playback.seek_step_seconds, 5.0);
        assert!(config.ui.show_panel);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.catalog.endpoint = Some("http://localhost:3000".to_string());
        config.playback.start_muted = true;
        config.save_to(&path).expect("save");

        let loaded = Config::load(Some(&path)).expect("load");
        assert_eq!(loaded.catalog.endpoint.as_deref(), Some("http://localhost:3000"));
        assert!(loaded.playback.start_muted);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[playback]\nvolume = 0.3\n").expect("write");

        let loaded = Config::load(Some(&path)).expect("load");
        assert_eq!(loaded.playback.volume, 0.3);
        assert_eq!(loaded.ui.tick_ms, 100);
    }

    #[test]
    fn test_endpoint_wins_over_directories() {
        let mut config = Config::default();
        config.catalog.endpoint = Some("http://localhost:3000".to_string());
        assert!(matches!(config.catalog_source().expect("source"), CatalogSource::Http(_)));

        config.catalog.endpoint = None;
        assert!(matches!(config.catalog_source().expect("source"), CatalogSource::Directory(_)));
    }
}
