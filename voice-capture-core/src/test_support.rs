//! Test doubles shared by the unit tests of this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::models::audio_models::{AudioSource, TrackInfo, TrackState};
use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordingArtifact, SessionMeta, UploadReceipt};
use crate::models::state::RecordingState;
use crate::processing::taps::TapSet;
use crate::session::broker::InputHandle;
use crate::traits::analyser::{AnalyserFactory, FrequencyAnalyser};
use crate::traits::delegate::RecordingDelegate;
use crate::traits::encoder::{ChunkCallback, ChunkedEncoder, EncoderErrorCallback, EncoderFactory, EncoderOutput};
use crate::traits::input_device::{InputDevice, InputStream, SampleCallback, TapId};
use crate::traits::surface::{RenderFrame, RenderSurface, SurfaceGeometry, WavePoint};
use crate::traits::uploader::Uploader;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Input stream fed by hand from the test body.
pub struct MockStream {
    taps: TapSet,
    live: AtomicBool,
    sample_rate: u32,
    stops: AtomicUsize,
}

impl MockStream {
    pub fn new() -> Arc<Self> {
        Self::with_rate(48_000)
    }

    pub fn with_rate(sample_rate: u32) -> Arc<Self> {
        Arc::new(Self {
            taps: TapSet::new(),
            live: AtomicBool::new(true),
            sample_rate,
            stops: AtomicUsize::new(0),
        })
    }

    pub fn push(&self, samples: &[f32]) {
        self.push_at_rate(samples, self.sample_rate);
    }

    pub fn push_at_rate(&self, samples: &[f32], sample_rate: u32) {
        if self.live.load(Ordering::SeqCst) {
            self.taps.dispatch(samples, sample_rate);
        }
    }

    /// Simulate the track ending on its own (device unplugged).
    pub fn end(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    /// Number of `stop_tracks` calls received.
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl InputStream for MockStream {
    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn tracks(&self) -> Vec<TrackInfo> {
        vec![TrackInfo {
            id: "mock-track".into(),
            label: "Mock Microphone".into(),
            sample_rate: self.sample_rate,
            channels: 1,
            state: if self.is_live() { TrackState::Live } else { TrackState::Ended },
        }]
    }

    fn add_tap(&self, callback: SampleCallback) -> TapId {
        self.taps.add(callback)
    }

    fn remove_tap(&self, tap: TapId) {
        self.taps.remove(tap);
    }

    fn stop_tracks(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.live.store(false, Ordering::SeqCst);
        self.taps.clear();
    }
}

/// Device double. Opens a fresh `MockStream` per request.
pub struct MockDevice {
    requests: AtomicU64,
    failures: Mutex<VecDeque<CaptureError>>,
    gated: bool,
    gate_open: Mutex<bool>,
    gate_cv: Condvar,
    seen: Mutex<u64>,
    seen_cv: Condvar,
    last: Mutex<Option<Arc<MockStream>>>,
}

impl MockDevice {
    fn build(gated: bool) -> Arc<Self> {
        Arc::new(Self {
            requests: AtomicU64::new(0),
            failures: Mutex::new(VecDeque::new()),
            gated,
            gate_open: Mutex::new(false),
            gate_cv: Condvar::new(),
            seen: Mutex::new(0),
            seen_cv: Condvar::new(),
            last: Mutex::new(None),
        })
    }

    /// Answers every request immediately.
    pub fn granting() -> Arc<Self> {
        Self::build(false)
    }

    /// Blocks every request until `open_gate` is called.
    pub fn gated() -> Arc<Self> {
        Self::build(true)
    }

    pub fn fail_next(&self, error: CaptureError) {
        self.failures.lock().push_back(error);
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    /// The most recently opened stream.
    pub fn stream(&self) -> Arc<MockStream> {
        self.last.lock().clone().expect("no stream opened yet")
    }

    pub fn try_stream(&self) -> Option<Arc<MockStream>> {
        self.last.lock().clone()
    }

    /// Block until at least one request has reached the device.
    pub fn wait_for_request(&self) {
        let mut seen = self.seen.lock();
        while *seen == 0 {
            self.seen_cv.wait_for(&mut seen, Duration::from_secs(5));
        }
    }

    pub fn open_gate(&self) {
        *self.gate_open.lock() = true;
        self.gate_cv.notify_all();
    }
}

impl InputDevice for MockDevice {
    fn request_input(&self) -> Result<Arc<dyn InputStream>, CaptureError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.seen.lock() += 1;
        self.seen_cv.notify_all();

        if self.gated {
            let mut open = self.gate_open.lock();
            while !*open {
                self.gate_cv.wait(&mut open);
            }
        }

        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        let stream = MockStream::new();
        *self.last.lock() = Some(Arc::clone(&stream));
        Ok(stream)
    }

    fn device_info(&self) -> AudioSource {
        AudioSource {
            id: "mock".into(),
            name: "Mock Microphone".into(),
            is_default: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Scripted analyser source: every bin reads `level` unless reads are failing.
#[derive(Default)]
pub struct AnalyserProbe {
    level: AtomicUsize,
    failing: AtomicBool,
    refuse_create: AtomicBool,
    created: AtomicUsize,
}

impl AnalyserProbe {
    pub fn new(level: u8) -> Arc<Self> {
        let probe = Self::default();
        probe.level.store(level as usize, Ordering::SeqCst);
        Arc::new(probe)
    }

    pub fn set_level(&self, level: u8) {
        self.level.store(level as usize, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn refuse_create(&self) {
        self.refuse_create.store(true, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn factory(self: &Arc<Self>) -> Arc<dyn AnalyserFactory> {
        Arc::new(MockAnalyserFactory(Arc::clone(self)))
    }
}

struct MockAnalyserFactory(Arc<AnalyserProbe>);

impl AnalyserFactory for MockAnalyserFactory {
    fn create_analyser(
        &self,
        _handle: &InputHandle,
        transform_size: usize,
        smoothing: f32,
    ) -> Result<Box<dyn FrequencyAnalyser>, CaptureError> {
        if self.0.refuse_create.load(Ordering::SeqCst) {
            return Err(CaptureError::AnalysisFailed("analyser unavailable".into()));
        }
        self.0.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockAnalyser {
            probe: Arc::clone(&self.0),
            transform_size,
            smoothing,
        }))
    }
}

struct MockAnalyser {
    probe: Arc<AnalyserProbe>,
    transform_size: usize,
    smoothing: f32,
}

impl FrequencyAnalyser for MockAnalyser {
    fn transform_size(&self) -> usize {
        self.transform_size
    }

    fn smoothing(&self) -> f32 {
        self.smoothing
    }

    fn read_magnitudes(&mut self, out: &mut [u8]) -> Result<(), CaptureError> {
        if self.probe.failing.load(Ordering::SeqCst) {
            return Err(CaptureError::AnalysisFailed("read failed".into()));
        }
        out.fill(self.probe.level.load(Ordering::SeqCst) as u8);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

pub const MOCK_DEFAULT_CODEC: &str = "audio/mock";

/// Control and observation point for `MockEncoder`s.
pub struct EncoderProbe {
    supported: Vec<String>,
    on_chunk: Mutex<Option<ChunkCallback>>,
    on_error: Mutex<Option<EncoderErrorCallback>>,
    codec: Mutex<Option<String>>,
    flushed_on_request: Mutex<Vec<Vec<u8>>>,
    trailing: Mutex<Vec<Vec<u8>>>,
    finalize_error: Mutex<Option<String>>,
    requests: AtomicUsize,
    finalized: AtomicUsize,
    dropped: AtomicUsize,
}

impl EncoderProbe {
    pub fn new(supported: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            supported: supported.iter().map(|s| s.to_string()).collect(),
            on_chunk: Mutex::new(None),
            on_error: Mutex::new(None),
            codec: Mutex::new(None),
            flushed_on_request: Mutex::new(Vec::new()),
            trailing: Mutex::new(Vec::new()),
            finalize_error: Mutex::new(None),
            requests: AtomicUsize::new(0),
            finalized: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        })
    }

    pub fn factory(self: &Arc<Self>) -> Arc<dyn EncoderFactory> {
        Arc::new(MockEncoderFactory(Arc::clone(self)))
    }

    /// Deliver a chunk as if the encoder had produced it.
    pub fn emit(&self, chunk: Vec<u8>) {
        let callback = self.on_chunk.lock().clone();
        if let Some(callback) = callback {
            callback(chunk);
        }
    }

    /// Report a mid-capture error.
    pub fn fail(&self, message: &str) {
        let callback = self.on_error.lock().clone();
        if let Some(callback) = callback {
            callback(message.to_string());
        }
    }

    /// Chunk emitted by the next `request_data` call.
    pub fn flush_on_request(&self, chunk: Vec<u8>) {
        self.flushed_on_request.lock().push(chunk);
    }

    pub fn set_trailing(&self, chunks: Vec<Vec<u8>>) {
        *self.trailing.lock() = chunks;
    }

    pub fn fail_finalize(&self, message: &str) {
        *self.finalize_error.lock() = Some(message.to_string());
    }

    /// Codec passed to the last `begin`.
    pub fn codec(&self) -> Option<String> {
        self.codec.lock().clone()
    }

    pub fn data_requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn finalized(&self) -> usize {
        self.finalized.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }
}

struct MockEncoderFactory(Arc<EncoderProbe>);

impl EncoderFactory for MockEncoderFactory {
    fn create_encoder(&self, _handle: &InputHandle) -> Result<Box<dyn ChunkedEncoder>, CaptureError> {
        Ok(Box::new(MockEncoder {
            probe: Arc::clone(&self.0),
        }))
    }
}

struct MockEncoder {
    probe: Arc<EncoderProbe>,
}

impl ChunkedEncoder for MockEncoder {
    fn is_type_supported(&self, codec: &str) -> bool {
        self.probe.supported.iter().any(|c| c == codec)
    }

    fn begin(
        &mut self,
        codec: Option<&str>,
        _chunk_interval: Duration,
        on_chunk: ChunkCallback,
        on_error: EncoderErrorCallback,
    ) -> Result<String, CaptureError> {
        let codec = codec.unwrap_or(MOCK_DEFAULT_CODEC).to_string();
        *self.probe.on_chunk.lock() = Some(on_chunk);
        *self.probe.on_error.lock() = Some(on_error);
        *self.probe.codec.lock() = Some(codec.clone());
        Ok(codec)
    }

    fn request_data(&mut self) {
        self.probe.requests.fetch_add(1, Ordering::SeqCst);
        let chunks: Vec<Vec<u8>> = self.probe.flushed_on_request.lock().drain(..).collect();
        for chunk in chunks {
            self.probe.emit(chunk);
        }
    }

    fn finalize(&mut self) -> Result<EncoderOutput, CaptureError> {
        self.probe.finalized.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.probe.finalize_error.lock().clone() {
            return Err(CaptureError::EncoderError(message));
        }
        Ok(EncoderOutput {
            codec: self.probe.codec().unwrap_or_else(|| MOCK_DEFAULT_CODEC.to_string()),
            trailing_chunks: std::mem::take(&mut *self.probe.trailing.lock()),
        })
    }
}

impl Drop for MockEncoder {
    fn drop(&mut self) {
        self.probe.dropped.fetch_add(1, Ordering::SeqCst);
        *self.probe.on_chunk.lock() = None;
        *self.probe.on_error.lock() = None;
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Drawn {
    Bars(Vec<u8>),
    Waveform(Vec<WavePoint>),
    Message(String),
    Resized(SurfaceGeometry),
}

pub type DrawLog = Arc<Mutex<Vec<Drawn>>>;

/// Surface that logs everything it is asked to draw.
pub struct RecordingSurface {
    geometry: SurfaceGeometry,
    log: DrawLog,
}

impl RecordingSurface {
    pub fn new(css_width: f64, css_height: f64) -> (Self, DrawLog) {
        let log: DrawLog = Arc::new(Mutex::new(Vec::new()));
        let surface = Self {
            geometry: SurfaceGeometry::new(css_width, css_height, 1.0),
            log: Arc::clone(&log),
        };
        (surface, log)
    }
}

impl RenderSurface for RecordingSurface {
    fn geometry(&self) -> SurfaceGeometry {
        self.geometry
    }

    fn resize(&mut self, geometry: SurfaceGeometry) {
        self.geometry = geometry;
        self.log.lock().push(Drawn::Resized(geometry));
    }

    fn render(&mut self, frame: RenderFrame<'_>, _target_height: u32) {
        let drawn = match frame {
            RenderFrame::Bars(frame) => Drawn::Bars(frame.bars().to_vec()),
            RenderFrame::Waveform(points) => Drawn::Waveform(points.to_vec()),
        };
        self.log.lock().push(drawn);
    }

    fn show_message(&mut self, message: &str) {
        self.log.lock().push(Drawn::Message(message.to_string()));
    }
}

// ---------------------------------------------------------------------------
// Session collaborators
// ---------------------------------------------------------------------------

/// Delegate that records every notification.
#[derive(Default)]
pub struct DelegateLog {
    pub states: Mutex<Vec<&'static str>>,
    pub elapsed: Mutex<Vec<f64>>,
    pub errors: Mutex<Vec<CaptureError>>,
    pub finished: Mutex<Vec<usize>>,
}

impl RecordingDelegate for DelegateLog {
    fn on_state_changed(&self, state: &RecordingState) {
        self.states.lock().push(state.name());
    }

    fn on_elapsed_updated(&self, elapsed_secs: f64) {
        self.elapsed.lock().push(elapsed_secs);
    }

    fn on_error(&self, error: &CaptureError) {
        self.errors.lock().push(error.clone());
    }

    fn on_recording_finished(&self, artifact: &RecordingArtifact) {
        self.finished.lock().push(artifact.size());
    }
}

/// Uploader that records submissions and optionally refuses them.
#[derive(Default)]
pub struct MockUploader {
    pub refuse: Option<CaptureError>,
    pub received: Mutex<Vec<(String, SessionMeta)>>,
}

impl Uploader for MockUploader {
    fn upload(&self, artifact: &RecordingArtifact, meta: &SessionMeta) -> Result<UploadReceipt, CaptureError> {
        if let Some(error) = &self.refuse {
            return Err(error.clone());
        }
        self.received.lock().push((artifact.id.clone(), meta.clone()));
        Ok(UploadReceipt {
            reference: format!("mock-{}", artifact.id),
        })
    }
}
