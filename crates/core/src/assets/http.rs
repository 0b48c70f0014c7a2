use async_trait::async_trait;
use reqwest::{Client, Url};

use super::AssetFetcher;
use crate::{Result, SoundCueError};

/// Fetches assets with plain HTTP GET requests against a site origin.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base: Url,
}

impl HttpFetcher {
    /// Creates a fetcher that resolves asset paths against `base`, e.g.
    /// `https://example.com/`.
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base)
            .map_err(|err| SoundCueError::msg(format!("invalid asset base url `{base}`: {err}")))?;
        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    pub fn url_for(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|err| SoundCueError::msg(format!("invalid asset path `{path}`: {err}")))
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.url_for(path)?;
        let network = |err: reqwest::Error| SoundCueError::Network {
            path: path.to_string(),
            reason: err.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SoundCueError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(network)?;
        Ok(bytes.to_vec())
    }
}
