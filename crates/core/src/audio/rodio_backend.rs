//! Rodio output for [`AudioContext`].
//!
//! `rodio::OutputStream` is not `Send`, so it lives on a dedicated thread for
//! the lifetime of the context. Voices are started through the stream handle,
//! each on its own detached sink.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread::JoinHandle,
    time::Duration,
};

use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

use super::{AudioContext, ContextState};
use crate::{DecodedBuffer, Result, SoundCueError};

/// Audio context backed by the default rodio output device.
pub struct RodioContext {
    handle: OutputStreamHandle,
    suspended: AtomicBool,
    shutdown: Option<mpsc::Sender<()>>,
    stream_thread: Option<JoinHandle<()>>,
}

impl RodioContext {
    /// Opens the default output device.
    pub fn open() -> Result<Self> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let stream_thread = std::thread::Builder::new()
            .name("sound-cues-output".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    if ready_tx.send(Ok(handle)).is_ok() {
                        // Blocks until the context is dropped.
                        let _ = shutdown_rx.recv();
                    }
                    drop(stream);
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err.to_string()));
                }
            })?;

        let handle = ready_rx
            .recv()
            .map_err(|_| SoundCueError::Output("output thread exited early".to_string()))?
            .map_err(SoundCueError::Output)?;

        tracing::info!("rodio output opened");
        Ok(Self {
            handle,
            suspended: AtomicBool::new(false),
            shutdown: Some(shutdown_tx),
            stream_thread: Some(stream_thread),
        })
    }
}

impl AudioContext for RodioContext {
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
        let sink = Sink::try_new(&self.handle)
            .map_err(|err| SoundCueError::Output(format!("failed to create sink: {err}")))?;
        sink.set_volume(gain);
        sink.append(BufferSource::new(buffer));
        sink.detach();
        Ok(())
    }
}

impl Drop for RodioContext {
    fn drop(&mut self) {
        self.shutdown.take();
        if let Some(thread) = self.stream_thread.take() {
            let _ = thread.join();
        }
        tracing::info!("rodio output closed");
    }
}

impl std::fmt::Debug for RodioContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioContext")
            .field("state", &self.state())
            .finish()
    }
}

/// Plays a shared buffer without copying its samples.
struct BufferSource {
    buffer: Arc<DecodedBuffer>,
    position: usize,
}

impl BufferSource {
    fn new(buffer: Arc<DecodedBuffer>) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }
}

impl Iterator for BufferSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let sample = self.buffer.samples().get(self.position).copied()?;
        self.position += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.samples().len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl Source for BufferSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.buffer.samples().len().saturating_sub(self.position))
    }

    fn channels(&self) -> u16 {
        self.buffer.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.buffer.duration())
    }
}
