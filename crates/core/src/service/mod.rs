use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard},
    task::{Context, Poll},
};

use tokio::{runtime::Handle, task::JoinHandle};

use crate::{
    AssetFetcher, AudioContext, AudioDecoder, BufferCache, ContextFactory, ContextState,
    DecodedBuffer, NullContext, Result, ScrollConfig, ScrollGate, SoundCatalog, SoundCueError,
    SymphoniaDecoder,
};

/// What became of a single playback request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// A voice was handed to the audio context.
    Started,
    /// The buffer could not be fetched or decoded.
    Unavailable,
    /// The context refused to start the voice.
    Rejected,
}

/// Optional completion notification for a playback request.
///
/// Dropping the ticket leaves the playback running; awaiting it yields the
/// [`PlaybackOutcome`]. Playback cannot be cancelled.
#[derive(Debug)]
pub struct PlaybackTicket {
    task: JoinHandle<PlaybackOutcome>,
}

impl Future for PlaybackTicket {
    type Output = PlaybackOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task)
            .poll(cx)
            .map(|joined| joined.unwrap_or(PlaybackOutcome::Rejected))
    }
}

/// Best-effort player for short interface sounds.
///
/// The service is a cheap handle; clones share the same context, buffer cache
/// and scroll state, so it can be handed to every component that dispatches
/// gesture, scroll, or hover events. None of its operations block or report
/// failure to the caller: every failure ends in silence plus a log line.
#[derive(Clone)]
pub struct AudioCueService {
    inner: Arc<Inner>,
}

struct Inner {
    catalog: SoundCatalog,
    scroll_cue: String,
    scroll_volume: f32,
    fetcher: Arc<dyn AssetFetcher>,
    decoder: Arc<dyn AudioDecoder>,
    factory: Arc<dyn ContextFactory>,
    context: Mutex<Option<Arc<dyn AudioContext>>>,
    cache: BufferCache,
    scroll: Mutex<ScrollGate>,
    runtime: Handle,
}

/// Assembles an [`AudioCueService`].
pub struct AudioCueServiceBuilder {
    fetcher: Arc<dyn AssetFetcher>,
    decoder: Arc<dyn AudioDecoder>,
    factory: Arc<dyn ContextFactory>,
    catalog: SoundCatalog,
    scroll: ScrollConfig,
    runtime: Option<Handle>,
}

impl AudioCueServiceBuilder {
    pub fn catalog(mut self, catalog: SoundCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn scroll(mut self, scroll: ScrollConfig) -> Self {
        self.scroll = scroll;
        self
    }

    /// Replaces the default symphonia decoder.
    pub fn decoder(mut self, decoder: Arc<dyn AudioDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Replaces the default factory, which produces a silent [`NullContext`].
    pub fn context_factory(mut self, factory: Arc<dyn ContextFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Runtime used for background loads and voices. Defaults to the runtime
    /// the builder is finished on.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<AudioCueService> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current()
                .map_err(|_| SoundCueError::msg("audio cue service requires a tokio runtime"))?,
        };

        Ok(AudioCueService {
            inner: Arc::new(Inner {
                catalog: self.catalog,
                scroll_cue: self.scroll.cue,
                scroll_volume: self.scroll.volume,
                fetcher: self.fetcher,
                decoder: self.decoder,
                factory: self.factory,
                context: Mutex::new(None),
                cache: BufferCache::new(),
                scroll: Mutex::new(ScrollGate::new(self.scroll.threshold)),
                runtime,
            }),
        })
    }
}

fn null_context() -> Result<Arc<dyn AudioContext>> {
    Ok(Arc::new(NullContext::new()))
}

impl AudioCueService {
    pub fn builder(fetcher: Arc<dyn AssetFetcher>) -> AudioCueServiceBuilder {
        AudioCueServiceBuilder {
            fetcher,
            decoder: Arc::new(SymphoniaDecoder::new()),
            factory: Arc::new(null_context),
            catalog: SoundCatalog::default(),
            scroll: ScrollConfig::default(),
            runtime: None,
        }
    }

    pub fn catalog(&self) -> &SoundCatalog {
        &self.inner.catalog
    }

    pub fn cache(&self) -> &BufferCache {
        &self.inner.cache
    }

    /// Called from a user gesture handler.
    ///
    /// The first call creates the audio context and preloads every catalog
    /// cue in the background. Later calls resume the context if the platform
    /// suspended it. If the context cannot be created, the service stays
    /// inactive and the next gesture tries again.
    pub fn activate(&self) {
        let mut slot = match self.inner.lock_context() {
            Ok(slot) => slot,
            Err(err) => {
                tracing::warn!(%err, "cannot activate audio");
                return;
            }
        };

        if let Some(context) = slot.as_ref() {
            if context.state() == ContextState::Suspended {
                match context.resume() {
                    Ok(()) => tracing::debug!("audio context resumed"),
                    Err(err) => tracing::warn!(%err, "failed to resume audio context"),
                }
            }
            return;
        }

        match self.inner.factory.create() {
            Ok(context) => {
                *slot = Some(context);
                tracing::info!("audio context created");
            }
            Err(err) => {
                tracing::warn!(%err, "failed to create audio context");
                return;
            }
        }
        drop(slot);

        let service = self.clone();
        self.inner.runtime.spawn(async move {
            service.preload().await;
        });
    }

    /// Forwards a platform suspension to the context, if one exists.
    pub fn suspend(&self) {
        if let Some(context) = self.inner.current_context() {
            context.suspend();
            tracing::debug!("audio context suspended");
        }
    }

    /// `None` until the first successful activation.
    pub fn context_state(&self) -> Option<ContextState> {
        self.inner.current_context().map(|context| context.state())
    }

    pub fn is_active(&self) -> bool {
        self.context_state() == Some(ContextState::Running)
    }

    /// Plays the asset at `path` at `volume` (clamped to `[0, 1]`).
    ///
    /// Returns `None` without doing anything if the service has not been
    /// activated or the context is suspended. Otherwise the buffer is
    /// resolved and played on a background task; the returned ticket may be
    /// dropped.
    pub fn play_cue(&self, path: &str, volume: f32) -> Option<PlaybackTicket> {
        let context = self.inner.running_context()?;
        let gain = clamp_volume(volume);
        let inner = self.inner.clone();
        let path = path.to_string();

        let task = self.inner.runtime.spawn(async move {
            let Some(buffer) = inner.resolve_buffer(&path).await else {
                return PlaybackOutcome::Unavailable;
            };
            match context.start_voice(buffer, gain) {
                Ok(()) => {
                    tracing::trace!(path = %path, gain, "cue started");
                    PlaybackOutcome::Started
                }
                Err(err) => {
                    tracing::warn!(path = %path, %err, "failed to start cue");
                    PlaybackOutcome::Rejected
                }
            }
        });

        Some(PlaybackTicket { task })
    }

    /// Plays a cue by its catalog name.
    pub fn play_named(&self, cue: &str, volume: f32) -> Option<PlaybackTicket> {
        match self.inner.catalog.path(cue) {
            Some(path) => self.play_cue(path, volume),
            None => {
                tracing::warn!(cue, "unknown sound cue");
                None
            }
        }
    }

    /// Feeds the current scroll offset.
    ///
    /// Plays the scroll cue when the offset moved further than the threshold
    /// since the previous call. Offsets are ignored until the first
    /// successful activation, so tracking starts from 0.
    pub fn on_scroll(&self, offset: f64) -> Option<PlaybackTicket> {
        self.inner.current_context()?;
        let fire = match self.inner.scroll.lock() {
            Ok(mut gate) => gate.observe(offset),
            Err(_) => {
                tracing::warn!("scroll state has been poisoned");
                return None;
            }
        };

        if !fire {
            return None;
        }
        self.play_named(&self.inner.scroll_cue, self.inner.scroll_volume)
    }

    /// Last scroll offset seen by [`Self::on_scroll`].
    pub fn last_scroll_offset(&self) -> f64 {
        self.inner
            .scroll
            .lock()
            .map(|gate| gate.last_offset())
            .unwrap_or(0.0)
    }

    /// Returns the decoded buffer for `path`, loading it on first use.
    ///
    /// Concurrent calls for the same path share one fetch and decode. A failed
    /// load is logged, returns `None`, and is retried by the next call.
    pub async fn resolve_buffer(&self, path: &str) -> Option<Arc<DecodedBuffer>> {
        self.inner.resolve_buffer(path).await
    }

    /// Loads every catalog asset concurrently and returns how many are ready.
    pub async fn preload(&self) -> usize {
        let paths = self.inner.catalog.paths();
        let results =
            futures::future::join_all(paths.iter().map(|path| self.inner.resolve_buffer(path)))
                .await;
        let loaded = results.iter().filter(|buffer| buffer.is_some()).count();
        tracing::info!(loaded, total = paths.len(), "sound cues preloaded");
        loaded
    }
}

impl std::fmt::Debug for AudioCueService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioCueService")
            .field("catalog", &self.inner.catalog)
            .field("context", &self.context_state())
            .field("cached", &self.inner.cache.len())
            .finish()
    }
}

impl Inner {
    async fn resolve_buffer(&self, path: &str) -> Option<Arc<DecodedBuffer>> {
        match self.cache.get_or_load(path, || self.load(path)).await {
            Ok(buffer) => Some(buffer),
            Err(err) if err.is_fetch() => {
                tracing::warn!(path, %err, "sound file unavailable");
                None
            }
            Err(err) => {
                tracing::error!(path, %err, "error loading or decoding sound");
                None
            }
        }
    }

    async fn load(&self, path: &str) -> Result<DecodedBuffer> {
        let bytes = self.fetcher.fetch(path).await?;
        tracing::debug!(path, bytes = bytes.len(), "decoding sound");

        let decoder = self.decoder.clone();
        let owned = path.to_string();
        tokio::task::spawn_blocking(move || decoder.decode(&owned, bytes))
            .await
            .map_err(|err| SoundCueError::decode(path, err))?
    }

    fn current_context(&self) -> Option<Arc<dyn AudioContext>> {
        self.lock_context().ok()?.clone()
    }

    fn running_context(&self) -> Option<Arc<dyn AudioContext>> {
        let context = self.current_context()?;
        if context.state() == ContextState::Suspended {
            tracing::trace!("audio context suspended, skipping cue");
            return None;
        }
        Some(context)
    }

    fn lock_context(&self) -> Result<MutexGuard<'_, Option<Arc<dyn AudioContext>>>> {
        self.context
            .lock()
            .map_err(|_| SoundCueError::msg("audio context slot has been poisoned"))
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::{wait_until, CountingFactory, FakeDecoder, FakeFetcher};

    struct Harness {
        service: AudioCueService,
        fetcher: Arc<FakeFetcher>,
        decoder: Arc<FakeDecoder>,
        factory: Arc<CountingFactory>,
    }

    fn harness(fetcher: FakeFetcher, catalog: SoundCatalog) -> Harness {
        harness_with_factory(fetcher, catalog, CountingFactory::new())
    }

    fn harness_with_factory(
        fetcher: FakeFetcher,
        catalog: SoundCatalog,
        factory: CountingFactory,
    ) -> Harness {
        let fetcher = Arc::new(fetcher);
        let decoder = Arc::new(FakeDecoder::new());
        let factory = Arc::new(factory);
        let service = AudioCueService::builder(fetcher.clone())
            .catalog(catalog)
            .decoder(decoder.clone())
            .context_factory(factory.clone())
            .build()
            .unwrap();
        Harness {
            service,
            fetcher,
            decoder,
            factory,
        }
    }

    fn click_catalog() -> SoundCatalog {
        SoundCatalog::new().with_cue("click", "/a.mp3")
    }

    fn interface_catalog() -> SoundCatalog {
        SoundCatalog::new()
            .with_cue("click", "/a.mp3")
            .with_cue("scroll", "/s.mp3")
    }

    fn interface_assets() -> FakeFetcher {
        FakeFetcher::new()
            .with_asset("/a.mp3", &[10, 20, 30])
            .with_asset("/s.mp3", &[1, 2])
    }

    #[tokio::test]
    async fn resolving_twice_fetches_and_decodes_once() {
        let h = harness(interface_assets(), interface_catalog());

        let first = h.service.resolve_buffer("/a.mp3").await.unwrap();
        let second = h.service.resolve_buffer("/a.mp3").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(h.fetcher.requests("/a.mp3"), 1);
        assert_eq!(h.decoder.decodes(), 1);
    }

    #[tokio::test]
    async fn concurrent_resolves_share_one_fetch() {
        let fetcher = interface_assets().with_latency(Duration::from_millis(20));
        let h = harness(fetcher, interface_catalog());

        let (a, b, c) = tokio::join!(
            h.service.resolve_buffer("/a.mp3"),
            h.service.resolve_buffer("/a.mp3"),
            h.service.resolve_buffer("/a.mp3"),
        );

        assert!(a.is_some() && b.is_some() && c.is_some());
        assert_eq!(h.fetcher.requests("/a.mp3"), 1);
        assert_eq!(h.decoder.decodes(), 1);
    }

    #[tokio::test]
    async fn playing_before_activation_is_silent() {
        let h = harness(interface_assets(), interface_catalog());

        assert!(h.service.play_cue("/a.mp3", 0.5).is_none());
        assert!(h.service.play_named("click", 0.5).is_none());
        assert!(!h.service.is_active());
        assert_eq!(h.service.context_state(), None);

        tokio::task::yield_now().await;
        assert_eq!(h.fetcher.requests("/a.mp3"), 0);
        assert_eq!(h.factory.context().voices(), 0);
    }

    #[tokio::test]
    async fn repeated_activation_builds_one_context() {
        let h = harness(interface_assets(), click_catalog());

        h.service.activate();
        assert!(h.service.is_active());
        h.service.activate();
        assert_eq!(h.factory.created(), 1);
        assert_eq!(h.factory.context().resumes(), 0);

        h.service.suspend();
        assert_eq!(h.service.context_state(), Some(ContextState::Suspended));
        h.service.activate();
        assert_eq!(h.factory.created(), 1);
        assert_eq!(h.factory.context().resumes(), 1);
        assert!(h.service.is_active());
    }

    #[tokio::test]
    async fn activation_preloads_catalog() {
        let h = harness(interface_assets(), interface_catalog());

        h.service.activate();
        let cache_ready = || h.service.cache().len() == 2;
        wait_until(cache_ready).await;

        assert!(h.service.cache().contains("/a.mp3"));
        assert!(h.service.cache().contains("/s.mp3"));
        assert_eq!(h.fetcher.requests("/a.mp3"), 1);
    }

    #[tokio::test]
    async fn preload_reports_failures_without_raising() {
        let fetcher = FakeFetcher::new().with_asset("/a.mp3", &[1]);
        let catalog = interface_catalog();
        let h = harness(fetcher, catalog);

        assert_eq!(h.service.preload().await, 1);
        assert!(!h.service.cache().contains("/s.mp3"));
    }

    #[tokio::test]
    async fn gain_is_passed_through_per_voice() {
        let h = harness(interface_assets(), interface_catalog());
        h.service.activate();

        let quiet = h.service.play_cue("/a.mp3", 0.3).unwrap();
        let loud = h.service.play_cue("/a.mp3", 0.8).unwrap();
        assert_eq!(quiet.await, PlaybackOutcome::Started);
        assert_eq!(loud.await, PlaybackOutcome::Started);

        let mut gains = h.factory.context().gains();
        gains.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(gains, vec![0.3, 0.8]);
    }

    #[tokio::test]
    async fn volume_is_clamped() {
        let h = harness(interface_assets(), interface_catalog());
        h.service.activate();

        assert_eq!(
            h.service.play_cue("/a.mp3", 3.0).unwrap().await,
            PlaybackOutcome::Started
        );
        assert_eq!(
            h.service.play_cue("/a.mp3", f32::NAN).unwrap().await,
            PlaybackOutcome::Started
        );

        let mut gains = h.factory.context().gains();
        gains.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(gains, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn missing_asset_does_not_disturb_other_cues() {
        let h = harness(interface_assets(), interface_catalog());
        h.service.activate();

        let missing = h.service.play_cue("/missing.mp3", 0.5).unwrap();
        assert_eq!(missing.await, PlaybackOutcome::Unavailable);
        assert!(!h.service.cache().contains("/missing.mp3"));

        let click = h.service.play_named("click", 0.5).unwrap();
        assert_eq!(click.await, PlaybackOutcome::Started);
        assert_eq!(h.factory.context().voices(), 1);
    }

    #[tokio::test]
    async fn undecodable_asset_is_skipped() {
        let fetcher = interface_assets().with_asset("/broken.mp3", b"bad header");
        let h = harness(fetcher, interface_catalog());
        h.service.activate();

        let ticket = h.service.play_cue("/broken.mp3", 0.5).unwrap();
        assert_eq!(ticket.await, PlaybackOutcome::Unavailable);
        assert!(!h.service.cache().contains("/broken.mp3"));
        assert_eq!(h.factory.context().voices(), 0);
    }

    #[tokio::test]
    async fn failed_loads_retry_on_next_request() {
        let h = harness(FakeFetcher::new(), click_catalog());

        assert!(h.service.resolve_buffer("/a.mp3").await.is_none());
        h.fetcher.insert("/a.mp3", &[5, 6]);
        let buffer = h.service.resolve_buffer("/a.mp3").await.unwrap();

        assert_eq!(buffer.frames(), 2);
        assert_eq!(h.fetcher.requests("/a.mp3"), 2);
    }

    #[tokio::test]
    async fn suspended_context_skips_until_resumed() {
        let h = harness(interface_assets(), interface_catalog());
        h.service.activate();
        h.service.suspend();

        assert!(h.service.play_cue("/a.mp3", 0.5).is_none());

        h.service.activate();
        let ticket = h.service.play_cue("/a.mp3", 0.5).unwrap();
        assert_eq!(ticket.await, PlaybackOutcome::Started);
    }

    #[tokio::test]
    async fn failed_context_creation_retries_on_next_gesture() {
        let h = harness_with_factory(
            interface_assets(),
            interface_catalog(),
            CountingFactory::failing(),
        );

        h.service.activate();
        assert!(!h.service.is_active());
        assert!(h.service.play_cue("/a.mp3", 0.5).is_none());

        h.factory.recover();
        h.service.activate();
        assert!(h.service.is_active());
        assert_eq!(h.factory.created(), 1);
    }

    #[tokio::test]
    async fn unknown_cue_names_are_ignored() {
        let h = harness(interface_assets(), interface_catalog());
        h.service.activate();
        assert!(h.service.play_named("whoosh", 0.5).is_none());
    }

    #[tokio::test]
    async fn slow_scrolling_never_plays() {
        let h = harness(interface_assets(), interface_catalog());
        h.service.activate();

        for offset in [0.0, 15.0, 35.0, 55.0, 40.0, 60.0] {
            assert!(h.service.on_scroll(offset).is_none());
        }
        assert_eq!(h.service.last_scroll_offset(), 60.0);
    }

    #[tokio::test]
    async fn fast_scroll_plays_scroll_cue_once() {
        let h = harness(interface_assets(), interface_catalog());
        h.service.activate();

        assert!(h.service.on_scroll(10.0).is_none());
        let ticket = h.service.on_scroll(120.0).expect("large jump should fire");
        assert!(h.service.on_scroll(125.0).is_none());

        assert_eq!(ticket.await, PlaybackOutcome::Started);
        assert_eq!(h.factory.context().gains(), vec![0.05]);
        assert_eq!(h.fetcher.requests("/s.mp3"), 1);
    }

    #[tokio::test]
    async fn negative_scroll_offsets_clamp_to_zero() {
        let h = harness(interface_assets(), interface_catalog());
        h.service.activate();

        assert!(h.service.on_scroll(-5.0).is_none());
        assert_eq!(h.service.last_scroll_offset(), 0.0);
    }

    #[tokio::test]
    async fn scrolling_before_activation_is_ignored() {
        let h = harness(interface_assets(), interface_catalog());

        assert!(h.service.on_scroll(500.0).is_none());
        assert_eq!(h.service.last_scroll_offset(), 0.0);

        h.service.activate();
        let ticket = h
            .service
            .on_scroll(510.0)
            .expect("first jump after activation should fire");
        assert_eq!(ticket.await, PlaybackOutcome::Started);
        assert_eq!(h.service.last_scroll_offset(), 510.0);
        assert!(h.service.on_scroll(515.0).is_none());
    }

    #[test]
    fn building_without_runtime_fails() {
        let result = AudioCueService::builder(Arc::new(FakeFetcher::new())).build();
        assert!(result.is_err());
    }

    #[test]
    fn builds_on_explicit_runtime() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let service = AudioCueService::builder(Arc::new(FakeFetcher::new()))
            .runtime(runtime.handle().clone())
            .build()
            .unwrap();
        assert_eq!(service.catalog().len(), 3);
    }
}
