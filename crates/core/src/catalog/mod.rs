use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Cue fired while the page is scrolled quickly.
pub const SCROLL_CUE: &str = "scroll";
/// Cue fired on clicks of interactive elements.
pub const CLICK_CUE: &str = "click";
/// Cue fired when the pointer enters interactive elements.
pub const HOVER_CUE: &str = "hover";

/// Static mapping from a symbolic cue name to the source path of its asset.
///
/// Ordered so listings and preload logs are stable between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundCatalog {
    cues: BTreeMap<String, String>,
}

impl Default for SoundCatalog {
    fn default() -> Self {
        Self::new()
            .with_cue(SCROLL_CUE, "/assets/sounds/fabric_rustle.mp3")
            .with_cue(CLICK_CUE, "/assets/sounds/ink_pen.mp3")
            .with_cue(HOVER_CUE, "/assets/sounds/paper_flip.mp3")
    }
}

impl SoundCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self {
            cues: BTreeMap::new(),
        }
    }

    pub fn with_cue(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.cues.insert(name.into(), path.into());
        self
    }

    /// Returns the source path registered for `name`.
    pub fn path(&self, name: &str) -> Option<&str> {
        self.cues.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cues
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_str()))
    }

    /// Distinct source paths, in cue-name order. Several cues may share one
    /// asset; it is only listed once.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = Vec::with_capacity(self.cues.len());
        for path in self.cues.values() {
            if !paths.contains(&path.as_str()) {
                paths.push(path);
            }
        }
        paths
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}
