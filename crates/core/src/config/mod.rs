use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{catalog::SCROLL_CUE, Result, SoundCatalog};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub assets: AssetConfig,
    pub cues: SoundCatalog,
    pub scroll: ScrollConfig,
    pub playback: PlaybackConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing sections fall back to their
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Where asset paths are resolved.
///
/// A base URL wins over a directory when both are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub root: Option<PathBuf>,
    pub base_url: Option<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: Some(PathBuf::from("public")),
            base_url: None,
        }
    }
}

/// Configuration for the scroll-velocity cue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub cue: String,
    pub threshold: f64,
    pub volume: f32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            cue: SCROLL_CUE.to_string(),
            threshold: 20.0,
            volume: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Gain used when a trigger does not ask for a specific volume.
    pub default_volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_volume: 0.1,
        }
    }
}
