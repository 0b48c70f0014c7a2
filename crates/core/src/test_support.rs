//! In-memory fakes for the fetcher, decoder and context seams.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    AssetFetcher, AudioContext, AudioDecoder, ContextFactory, ContextState, DecodedBuffer, Result,
    SoundCueError,
};

/// Serves assets from a map and counts requests per path.
#[derive(Default)]
pub struct FakeFetcher {
    assets: Mutex<HashMap<String, Vec<u8>>>,
    requests: Mutex<HashMap<String, usize>>,
    latency: Option<Duration>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(self, path: &str, bytes: &[u8]) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert(&self, path: &str, bytes: &[u8]) {
        self.assets
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
    }

    pub fn requests(&self, path: &str) -> usize {
        self.requests.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

#[async_trait]
impl AssetFetcher for FakeFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        *self
            .requests
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default() += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let bytes = self.assets.lock().unwrap().get(path).cloned();
        bytes.ok_or_else(|| SoundCueError::Status {
            path: path.to_string(),
            status: 404,
        })
    }
}

/// Treats every byte as one mono sample. Bytes starting with `bad` fail.
#[derive(Default)]
pub struct FakeDecoder {
    decodes: AtomicUsize,
}

impl FakeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decodes(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }
}

impl AudioDecoder for FakeDecoder {
    fn decode(&self, path: &str, bytes: Vec<u8>) -> Result<DecodedBuffer> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        if bytes.starts_with(b"bad") {
            return Err(SoundCueError::decode(path, "unsupported container"));
        }
        let samples = bytes.iter().map(|b| *b as f32 / 255.0).collect();
        Ok(DecodedBuffer::new(samples, 1, 8_000))
    }
}

/// Records every voice it is asked to start.
#[derive(Default)]
pub struct RecordingContext {
    suspended: AtomicBool,
    resumes: AtomicUsize,
    voices: Mutex<Vec<(Arc<DecodedBuffer>, f32)>>,
}

impl RecordingContext {
    pub fn gains(&self) -> Vec<f32> {
        self.voices.lock().unwrap().iter().map(|(_, gain)| *gain).collect()
    }

    pub fn voices(&self) -> usize {
        self.voices.lock().unwrap().len()
    }

    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }
}

impl AudioContext for RecordingContext {
    fn state(&self) -> ContextState {
        if self.suspended.load(Ordering::SeqCst) {
            ContextState::Suspended
        } else {
            ContextState::Running
        }
    }

    fn resume(&self) -> Result<()> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        self.suspended.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn suspend(&self) {
        self.suspended.store(true, Ordering::SeqCst);
    }

    fn start_voice(&self, buffer: Arc<DecodedBuffer>, gain: f32) -> Result<()> {
        self.voices.lock().unwrap().push((buffer, gain));
        Ok(())
    }
}

/// Hands out one shared [`RecordingContext`] and counts constructions.
#[derive(Default)]
pub struct CountingFactory {
    context: Arc<RecordingContext>,
    created: AtomicUsize,
    fail: AtomicBool,
}

impl CountingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory whose construction attempts fail until [`Self::recover`].
    pub fn failing() -> Self {
        let factory = Self::default();
        factory.fail.store(true, Ordering::SeqCst);
        factory
    }

    pub fn recover(&self) {
        self.fail.store(false, Ordering::SeqCst);
    }

    pub fn context(&self) -> &RecordingContext {
        &self.context
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ContextFactory for CountingFactory {
    fn create(&self) -> Result<Arc<dyn AudioContext>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SoundCueError::Output("no output device".to_string()));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        let context: Arc<dyn AudioContext> = self.context.clone();
        Ok(context)
    }
}

/// Polls `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
