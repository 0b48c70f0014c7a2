use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
};

use tokio::sync::OnceCell;

use crate::{DecodedBuffer, Result, SoundCueError};

type Slot = Arc<OnceCell<Arc<DecodedBuffer>>>;

/// Decoded buffers keyed by source path.
///
/// Every path owns a slot that is filled at most once. Callers that arrive
/// while a load is running wait on that load instead of starting their own.
/// A failed load leaves the slot empty, so the next caller retries.
#[derive(Debug, Default)]
pub struct BufferCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl BufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached buffer for `path`, running `load` only if no buffer
    /// has been stored yet and no other load for the same path is in flight.
    pub async fn get_or_load<F, Fut>(&self, path: &str, load: F) -> Result<Arc<DecodedBuffer>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DecodedBuffer>>,
    {
        let slot = self.slot(path)?;
        let loaded = slot
            .get_or_try_init(|| async move { load().await.map(Arc::new) })
            .await
            .cloned();
        if loaded.is_err() {
            self.release(path, &slot);
        }
        loaded
    }

    /// Returns the buffer for `path` if it has already been decoded.
    pub fn get(&self, path: &str) -> Option<Arc<DecodedBuffer>> {
        let slots = self.lock().ok()?;
        slots.get(path).and_then(|slot| slot.get().cloned())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Number of decoded buffers held.
    pub fn len(&self) -> usize {
        self.lock()
            .map(|slots| slots.values().filter(|slot| slot.initialized()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, path: &str) -> Result<Slot> {
        let mut slots = self.lock()?;
        Ok(slots.entry(path.to_string()).or_default().clone())
    }

    /// Drops an empty slot after a failed load unless another caller still
    /// holds it for a retry.
    fn release(&self, path: &str, slot: &Slot) {
        let Ok(mut slots) = self.lock() else {
            return;
        };
        let idle = slots.get(path).is_some_and(|stored| {
            Arc::ptr_eq(stored, slot) && !stored.initialized() && Arc::strong_count(stored) == 2
        });
        if idle {
            slots.remove(path);
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Slot>>> {
        self.slots
            .lock()
            .map_err(|_| SoundCueError::msg("buffer cache has been poisoned"))
    }
}
