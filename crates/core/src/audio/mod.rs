use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use crate::{DecodedBuffer, Result};

#[cfg(feature = "rodio")]
mod rodio_backend;

#[cfg(feature = "rodio")]
pub use self::rodio_backend::RodioContext;

/// Whether the platform currently lets the context produce sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    /// Paused by the platform. Nothing plays until [`AudioContext::resume`].
    Suspended,
}

/// Connection to the platform audio subsystem.
///
/// One context exists per service and it lives until the service is dropped.
/// Every call to [`AudioContext::start_voice`] builds an independent signal
/// path (source plus its own gain stage), so overlapping voices never share
/// volume or position.
pub trait AudioContext: Send + Sync {
    fn state(&self) -> ContextState;

    /// Asks the platform to leave the suspended state.
    fn resume(&self) -> Result<()>;

    /// Marks the context suspended, as the platform does when the host loses
    /// focus.
    fn suspend(&self);

    /// Starts non-looping playback of `buffer` at `gain` and returns
    /// immediately.
    fn start_voice(&self, buffer: Arc<DecodedBuffer>, gain: f32) -> Result<()>;
}

/// Builds the [`AudioContext`] on first activation.
pub trait ContextFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn AudioContext>>;
}

impl<F> ContextFactory for F
where
    F: Fn() -> Result<Arc<dyn AudioContext>> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn AudioContext>> {
        self()
    }
}

/// Context that accepts voices but discards them.
///
/// Used when no output device is available or sound is muted; it keeps the
/// rest of the pipeline (fetch, decode, cache) working.
#[derive(Debug, Default)]
pub struct NullContext {
    suspended: AtomicBool,
    voices: AtomicUsize,
}

impl NullContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of voices started so far.
    pub fn voices_started(&self) -> usize {
        self.voices.load(Ordering::Relaxed)
    }
}

impl AudioContext for NullContext {
    fn state(&self) -> ContextState {
        if self.suspended.load(Ordering::Acquire) {
            ContextState::Suspended
        } else {
            ContextState::Running
        }
    }

    fn resume(&self) -> Result<()> {
        self.suspended.store(false, Ordering::Release);
        Ok(())
    }

    fn suspend(&self) {
        self.suspended.store(true, Ordering::Release);
    }

    fn start_voice(&self, buffer: Arc<DecodedBuffer>, gain: f32) -> Result<()> {
        self.voices.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(frames = buffer.frames(), gain, "discarding voice");
        Ok(())
    }
}
