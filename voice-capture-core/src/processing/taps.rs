use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::traits::input_device::{SampleCallback, TapId};

/// Registry of sample taps attached to one input stream.
///
/// Shared building block for `InputStream` implementations: the capture
/// thread calls `dispatch`, consumers add and remove taps from any thread.
/// The callback list handed to `dispatch` is rebuilt only when taps change,
/// so the audio thread never allocates.
#[derive(Default)]
pub struct TapSet {
    next_id: AtomicU64,
    registry: Mutex<Registry>,
}

struct Registry {
    entries: Vec<(TapId, SampleCallback)>,
    snapshot: Arc<[SampleCallback]>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            snapshot: Arc::from(Vec::new()),
        }
    }
}

impl Registry {
    fn rebuild(&mut self) {
        self.snapshot = self.entries.iter().map(|(_, cb)| Arc::clone(cb)).collect();
    }
}

impl TapSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, callback: SampleCallback) -> TapId {
        let id = TapId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut registry = self.registry.lock();
        registry.entries.push((id, callback));
        registry.rebuild();
        id
    }

    pub fn remove(&self, tap: TapId) {
        let mut registry = self.registry.lock();
        let before = registry.entries.len();
        registry.entries.retain(|(id, _)| *id != tap);
        if registry.entries.len() != before {
            registry.rebuild();
        }
    }

    pub fn clear(&self) {
        let mut registry = self.registry.lock();
        registry.entries.clear();
        registry.rebuild();
    }

    pub fn len(&self) -> usize {
        self.registry.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Arc<[SampleCallback]> {
        Arc::clone(&self.registry.lock().snapshot)
    }

    /// Deliver one block of mono samples to every tap.
    ///
    /// Callbacks run outside the registry lock so a tap may remove itself.
    pub fn dispatch(&self, samples: &[f32], sample_rate: u32) {
        let callbacks = self.snapshot();
        for callback in callbacks.iter() {
            callback(samples, sample_rate);
        }
    }
}
