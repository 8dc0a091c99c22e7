use std::fmt;
use std::mem;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::models::audio_models::TrackInfo;
use crate::models::error::CaptureError;
use crate::traits::input_device::{InputDevice, InputStream};

/// A consumer's reference to the shared microphone stream.
///
/// Every handle returned by `DeviceStreamBroker::acquire` must be given back
/// through `release`. Handles are deliberately not `Clone`: one acquire, one
/// release.
pub struct InputHandle {
    generation: u64,
    stream: Arc<dyn InputStream>,
}

impl InputHandle {
    /// Identity of the underlying stream. Two handles with the same
    /// generation observe the same physical capture.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stream(&self) -> &Arc<dyn InputStream> {
        &self.stream
    }

    pub fn is_live(&self) -> bool {
        self.stream.is_live()
    }

    pub fn tracks(&self) -> Vec<TrackInfo> {
        self.stream.tracks()
    }

    pub fn same_stream(&self, other: &InputHandle) -> bool {
        self.generation == other.generation && Arc::ptr_eq(&self.stream, &other.stream)
    }
}

impl fmt::Debug for InputHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputHandle")
            .field("generation", &self.generation)
            .field("live", &self.stream.is_live())
            .finish()
    }
}

enum Slot {
    Empty,
    /// A device request is in flight; other callers wait on `resolved`.
    Pending { generation: u64 },
    Live {
        generation: u64,
        stream: Arc<dyn InputStream>,
        ref_count: usize,
    },
}

struct BrokerState {
    slot: Slot,
    next_generation: u64,
    /// Outcome of the most recent failed request, served to its waiters.
    last_failure: Option<(u64, CaptureError)>,
    device_requests: u64,
    /// Callers blocked on a pending request.
    waiters: usize,
}

/// Owns the single shared microphone stream and reference-counts it.
///
/// Visualizers and recording sessions each acquire their own reference;
/// the hardware is stopped only when the last one is released. At most one
/// device request is in flight at a time, so the permission prompt shows
/// up once no matter how many consumers start together.
///
/// Inject it as `Arc<DeviceStreamBroker>`.
pub struct DeviceStreamBroker {
    device: Arc<dyn InputDevice>,
    state: Mutex<BrokerState>,
    resolved: Condvar,
}

impl DeviceStreamBroker {
    pub fn new(device: Arc<dyn InputDevice>) -> Self {
        Self {
            device,
            state: Mutex::new(BrokerState {
                slot: Slot::Empty,
                next_generation: 1,
                last_failure: None,
                device_requests: 0,
                waiters: 0,
            }),
            resolved: Condvar::new(),
        }
    }

    /// Get a reference to the shared stream, opening it if needed.
    ///
    /// Blocks while a device request is pending, whether issued by this
    /// call or by a concurrent one. Concurrent callers share the outcome of
    /// that single request.
    pub fn acquire(&self) -> Result<InputHandle, CaptureError> {
        let mut s = self.state.lock();

        loop {
            let waiting_for = match &mut s.slot {
                Slot::Live {
                    generation,
                    stream,
                    ref_count,
                } => {
                    *ref_count += 1;
                    log::debug!("Reusing input stream #{} (refs: {})", generation, ref_count);
                    return Ok(InputHandle {
                        generation: *generation,
                        stream: Arc::clone(stream),
                    });
                }
                Slot::Pending { generation } => *generation,
                Slot::Empty => break,
            };

            s.waiters += 1;
            self.resolved.wait(&mut s);
            s.waiters -= 1;

            if let Some((failed, error)) = &s.last_failure {
                if *failed == waiting_for && matches!(s.slot, Slot::Empty) {
                    return Err(error.clone());
                }
            }
        }

        let generation = s.next_generation;
        s.next_generation += 1;
        s.device_requests += 1;
        s.slot = Slot::Pending { generation };

        log::info!("Requesting microphone input (request #{})", generation);
        let device = Arc::clone(&self.device);
        let outcome = MutexGuard::unlocked(&mut s, || device.request_input());

        let result = match outcome {
            Ok(stream) => {
                s.slot = Slot::Live {
                    generation,
                    stream: Arc::clone(&stream),
                    ref_count: 1,
                };
                s.last_failure = None;
                log::info!("Microphone input #{} is live", generation);
                Ok(InputHandle { generation, stream })
            }
            Err(error) => {
                s.slot = Slot::Empty;
                s.last_failure = Some((generation, error.clone()));
                log::warn!("Microphone request #{} failed: {}", generation, error);
                Err(error)
            }
        };
        self.resolved.notify_all();
        result
    }

    /// Give a handle back. The last release stops the hardware.
    pub fn release(&self, handle: InputHandle) {
        let mut s = self.state.lock();
        let last = match &mut s.slot {
            Slot::Live {
                generation,
                ref_count,
                ..
            } if *generation == handle.generation => {
                *ref_count = ref_count.saturating_sub(1);
                log::debug!("Released input stream #{} (refs: {})", generation, ref_count);
                *ref_count == 0
            }
            _ => {
                log::warn!("Ignoring release of stale input handle #{}", handle.generation);
                return;
            }
        };

        if last {
            let slot = mem::replace(&mut s.slot, Slot::Empty);
            drop(s);
            if let Slot::Live { generation, stream, .. } = slot {
                stream.stop_tracks();
                log::info!("Stopped microphone input #{}", generation);
            }
        }
    }

    /// Number of callers currently blocked on an in-flight device request.
    pub fn waiters(&self) -> usize {
        self.state.lock().waiters
    }

    /// Number of outstanding references to the live stream.
    pub fn ref_count(&self) -> usize {
        match &self.state.lock().slot {
            Slot::Live { ref_count, .. } => *ref_count,
            _ => 0,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state.lock().slot, Slot::Live { .. })
    }

    /// Device requests issued over the broker's lifetime.
    pub fn device_requests(&self) -> u64 {
        self.state.lock().device_requests
    }
}

impl fmt::Debug for DeviceStreamBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceStreamBroker")
            .field("ref_count", &self.ref_count())
            .field("device_requests", &self.device_requests())
            .finish()
    }
}
