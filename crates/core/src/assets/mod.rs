use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{Result, SoundCueError};

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use self::http::HttpFetcher;

/// Source of encoded asset bytes.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetches the raw bytes behind a site-relative asset path such as
    /// `/assets/sounds/ink_pen.mp3`.
    async fn fetch(&self, path: &str) -> Result<Vec<u8>>;
}

/// Serves asset paths out of a local static directory.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a site-relative path onto the asset directory. Parent directory
    /// components are rejected so lookups stay inside `root`.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let escapes = relative.components().any(|component| {
            !matches!(component, std::path::Component::Normal(_) | std::path::Component::CurDir)
        });
        if escapes || relative.as_os_str().is_empty() {
            return Err(SoundCueError::NotFound {
                path: path.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AssetFetcher for FsFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let file = self.resolve(path)?;
        match tokio::fs::read(&file).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(SoundCueError::NotFound {
                    path: path.to_string(),
                })
            }
            Err(err) => Err(SoundCueError::Io(err)),
        }
    }
}
