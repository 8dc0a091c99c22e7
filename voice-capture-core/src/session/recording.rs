use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::{RecordingConfig, CHUNK_INTERVAL, TIMER_STEP_SECS};
use crate::models::error::CaptureError;
use crate::models::recording_result::{ArtifactRef, RecordingArtifact, SessionMeta, UploadReceipt};
use crate::models::state::RecordingState;
use crate::session::broker::{DeviceStreamBroker, InputHandle};
use crate::storage::recording_buffer::RecordingBuffer;
use crate::traits::delegate::RecordingDelegate;
use crate::traits::encoder::{ChunkedEncoder, EncoderFactory};
use crate::traits::uploader::Uploader;

/// Why a recording is being stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopTrigger {
    /// The caller asked for it.
    Manual,
    /// The duration timer reached the configured maximum.
    MaxDuration,
}

/// Bounded-duration recording session.
///
/// State transitions:
/// ```text
/// idle → requesting → recording → stopping → stopped(artifact)
///            │                       │
///            └─→ idle (denied)       └─→ failed(reason)
/// ```
/// `reset` brings any state back to idle.
///
/// The session is synchronous: `tick` must be called every
/// `TIMER_INTERVAL` while recording, either by the caller or by a
/// `RecordingDriver`.
pub struct RecordingSession {
    broker: Arc<DeviceStreamBroker>,
    encoders: Arc<dyn EncoderFactory>,
    config: RecordingConfig,
    delegate: Option<Arc<dyn RecordingDelegate>>,
    state: RecordingState,

    handle: Option<InputHandle>,
    encoder: Option<Box<dyn ChunkedEncoder>>,
    codec: Option<String>,

    // Shared with the encoder callbacks
    buffer: Arc<Mutex<RecordingBuffer>>,
    encoder_fault: Arc<Mutex<Option<String>>>,

    ticks: u64,
    artifact_ref: Option<ArtifactRef>,
}

impl RecordingSession {
    pub fn new(
        broker: Arc<DeviceStreamBroker>,
        encoders: Arc<dyn EncoderFactory>,
        config: RecordingConfig,
    ) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(Self {
            broker,
            encoders,
            config,
            delegate: None,
            state: RecordingState::Idle,
            handle: None,
            encoder: None,
            codec: None,
            buffer: Arc::new(Mutex::new(RecordingBuffer::new())),
            encoder_fault: Arc::new(Mutex::new(None)),
            ticks: 0,
            artifact_ref: None,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn RecordingDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> &RecordingState {
        &self.state
    }

    pub fn config(&self) -> &RecordingConfig {
        &self.config
    }

    /// Elapsed recording time for display. Advances in `TIMER_STEP_SECS` steps.
    pub fn elapsed_secs(&self) -> f64 {
        self.ticks as f64 * TIMER_STEP_SECS
    }

    /// Codec negotiated for the current or last recording.
    pub fn codec(&self) -> Option<&str> {
        self.codec.as_deref()
    }

    /// Whether this session currently holds a broker reference.
    pub fn holds_input(&self) -> bool {
        self.handle.is_some()
    }

    pub fn artifact(&self) -> Option<&RecordingArtifact> {
        self.state.artifact()
    }

    /// Acquire the microphone and begin recording.
    ///
    /// A no-op while a recording is already underway. From `stopped` or
    /// `failed` the session must be reset first.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.state.is_busy() {
            log::debug!("Start ignored: session is {}", self.state.name());
            return Ok(());
        }
        if self.state.is_terminal() {
            return Err(CaptureError::InvalidState(format!(
                "cannot start from {} state; reset first",
                self.state.name()
            )));
        }

        self.set_state(RecordingState::Requesting);

        let handle = match self.broker.acquire() {
            Ok(handle) => handle,
            Err(error) => {
                log::warn!("Recording could not acquire the microphone: {}", error);
                self.set_state(RecordingState::Idle);
                self.notify_error(&error);
                return Err(error);
            }
        };
        self.handle = Some(handle);

        if let Err(error) = self.begin_encoder() {
            return Err(self.fail(error));
        }

        self.ticks = 0;
        self.set_state(RecordingState::Recording { elapsed_secs: 0.0 });
        Ok(())
    }

    fn begin_encoder(&mut self) -> Result<(), CaptureError> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| CaptureError::InvalidState("no input acquired".into()))?;
        let mut encoder = self.encoders.create_encoder(handle)?;

        let preferred = self
            .config
            .codec_preferences
            .iter()
            .find(|codec| encoder.is_type_supported(codec))
            .map(String::as_str);
        if preferred.is_none() {
            log::info!("No preferred codec supported; using encoder default");
        }

        self.buffer.lock().clear();
        *self.encoder_fault.lock() = None;

        let buffer = Arc::clone(&self.buffer);
        let fault = Arc::clone(&self.encoder_fault);
        let codec = encoder.begin(
            preferred,
            CHUNK_INTERVAL,
            Arc::new(move |chunk: Vec<u8>| buffer.lock().push(chunk)),
            Arc::new(move |message: String| {
                let mut fault = fault.lock();
                if fault.is_none() {
                    *fault = Some(message);
                }
            }),
        )?;

        log::info!("Recording with {}", codec);
        self.codec = Some(codec);
        self.encoder = Some(encoder);
        Ok(())
    }

    /// Stop recording and assemble the artifact. No-op unless recording.
    pub fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.state.is_recording() {
            log::debug!("Stop ignored: session is {}", self.state.name());
            return Ok(());
        }
        self.finish(StopTrigger::Manual)
    }

    /// Advance the duration timer by one step.
    ///
    /// Stops the session once the maximum duration is reached, and fails it
    /// if the encoder reported an error or the input stream ended since the
    /// last tick.
    pub fn tick(&mut self) -> Result<(), CaptureError> {
        if !self.state.is_recording() {
            return Ok(());
        }

        let fault = self.encoder_fault.lock().take();
        if let Some(message) = fault {
            return Err(self.fail(CaptureError::EncoderError(message)));
        }
        if !self.handle.as_ref().is_some_and(InputHandle::is_live) {
            return Err(self.fail(CaptureError::EncoderError("input stream ended during recording".into())));
        }

        self.ticks += 1;
        let elapsed_secs = self.elapsed_secs();
        self.state = RecordingState::Recording { elapsed_secs };
        if let Some(ref delegate) = self.delegate {
            delegate.on_elapsed_updated(elapsed_secs);
        }

        if self.ticks >= self.config.max_ticks() {
            log::info!("Maximum duration reached ({:.1}s)", elapsed_secs);
            return self.finish(StopTrigger::MaxDuration);
        }
        Ok(())
    }

    /// The one transition out of `recording`, shared by both triggers.
    fn finish(&mut self, trigger: StopTrigger) -> Result<(), CaptureError> {
        log::info!("Stopping recording ({:?})", trigger);
        self.set_state(RecordingState::Stopping);

        let Some(mut encoder) = self.encoder.take() else {
            return Err(self.fail(CaptureError::InvalidState("no active encoder".into())));
        };
        encoder.request_data();
        let finalized = encoder.finalize();
        drop(encoder);
        self.release_input();

        let fault = self.encoder_fault.lock().take();
        if let Some(message) = fault {
            return Err(self.fail(CaptureError::EncoderError(message)));
        }
        let output = match finalized {
            Ok(output) => output,
            Err(error) => return Err(self.fail(error)),
        };

        let duration = self.elapsed_secs();
        let assembled = {
            let mut buffer = self.buffer.lock();
            for chunk in output.trailing_chunks {
                buffer.push(chunk);
            }
            buffer.assemble(&output.codec, duration)
        };

        match assembled {
            Ok(artifact) => {
                log::info!(
                    "Recording finished: {} bytes of {} over {:.1}s",
                    artifact.size(),
                    artifact.codec,
                    artifact.duration_secs
                );
                if let Some(ref delegate) = self.delegate {
                    delegate.on_recording_finished(&artifact);
                }
                self.set_state(RecordingState::Stopped(Box::new(artifact)));
                Ok(())
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    /// Return to idle from any state, dropping all captured data.
    pub fn reset(&mut self) {
        // dropping the encoder detaches it from the stream
        self.encoder = None;
        self.release_input();
        self.buffer.lock().clear();
        *self.encoder_fault.lock() = None;
        self.codec = None;
        self.ticks = 0;
        self.artifact_ref = None;
        if !self.state.is_idle() {
            self.set_state(RecordingState::Idle);
        }
    }

    /// Hand out a reference to the finished artifact.
    ///
    /// Repeated calls return the same reference until it is revoked by
    /// `reset` or a new recording.
    pub fn issue_artifact_ref(&mut self) -> Option<ArtifactRef> {
        let artifact_id = self.state.artifact()?.id.clone();
        let reference = self.artifact_ref.get_or_insert(ArtifactRef { artifact_id });
        Some(reference.clone())
    }

    /// Look up the artifact behind a reference. `None` once revoked.
    pub fn resolve(&self, reference: &ArtifactRef) -> Option<&RecordingArtifact> {
        if self.artifact_ref.as_ref() != Some(reference) {
            return None;
        }
        self.state
            .artifact()
            .filter(|artifact| artifact.id == reference.artifact_id)
    }

    /// Hand the finished artifact to `uploader`, then reset.
    ///
    /// On failure the artifact stays available for another attempt.
    pub fn submit(&mut self, uploader: &dyn Uploader, sponsor: &str) -> Result<UploadReceipt, CaptureError> {
        let Some(artifact) = self.state.artifact() else {
            return Err(CaptureError::InvalidState(format!(
                "nothing to submit in {} state",
                self.state.name()
            )));
        };

        let meta = SessionMeta::new(sponsor, artifact.duration_secs);
        log::info!("Submitting recording {} as {}", artifact.id, meta.uid);

        match uploader.upload(artifact, &meta) {
            Ok(receipt) => {
                log::info!("Recording submitted ({})", receipt.reference);
                self.reset();
                Ok(receipt)
            }
            Err(error) => {
                let error = match error {
                    CaptureError::UploadFailed(_) => error,
                    other => CaptureError::UploadFailed(other.to_string()),
                };
                log::error!("Submission failed: {}", error);
                self.notify_error(&error);
                Err(error)
            }
        }
    }

    // --- Internal helpers ---

    fn release_input(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.broker.release(handle);
        }
    }

    /// Tear down and enter `failed`. Returns the error for the caller.
    fn fail(&mut self, error: CaptureError) -> CaptureError {
        log::error!("Recording failed: {}", error);
        self.encoder = None;
        self.release_input();
        self.buffer.lock().clear();
        self.set_state(RecordingState::Failed(error.clone()));
        self.notify_error(&error);
        error
    }

    fn set_state(&mut self, state: RecordingState) {
        log::debug!("Recording session: {} → {}", self.state.name(), state.name());
        self.state = state;
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&self.state);
        }
    }

    fn notify_error(&self, error: &CaptureError) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(error);
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.encoder = None;
        self.release_input();
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::processing::chunk_encoder::{PcmEncoderFactory, PCM_CODEC};
    use crate::test_support::{DelegateLog, EncoderProbe, MockDevice, MockUploader, MOCK_DEFAULT_CODEC};

    struct Fixture {
        device: Arc<MockDevice>,
        broker: Arc<DeviceStreamBroker>,
        probe: Arc<EncoderProbe>,
        delegate: Arc<DelegateLog>,
        session: RecordingSession,
    }

    fn fixture_with(supported: &[&str], config: RecordingConfig) -> Fixture {
        let device = MockDevice::granting();
        let broker = Arc::new(DeviceStreamBroker::new(device.clone()));
        let probe = EncoderProbe::new(supported);
        let delegate = Arc::new(DelegateLog::default());
        let mut session = RecordingSession::new(Arc::clone(&broker), probe.factory(), config).unwrap();
        session.set_delegate(delegate.clone());
        Fixture {
            device,
            broker,
            probe,
            delegate,
            session,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(&["audio/webm"], RecordingConfig::default())
    }

    #[test]
    fn start_stop_produces_artifact() {
        let mut f = fixture();
        f.session.start().unwrap();
        assert!(f.session.state().is_recording());
        assert_eq!(f.broker.ref_count(), 1);

        f.probe.emit(vec![1; 10]);
        f.probe.emit(vec![2; 20]);
        f.probe.emit(vec![3; 15]);
        f.session.tick().unwrap();
        f.session.stop().unwrap();

        let artifact = f.session.artifact().unwrap();
        assert_eq!(artifact.size(), 45);
        assert_eq!(artifact.codec, "audio/webm");
        assert_relative_eq!(artifact.duration_secs, 0.1);
        assert_eq!(f.broker.ref_count(), 0);
        assert_eq!(f.device.stream().stop_count(), 1);
        assert_eq!(
            *f.delegate.states.lock(),
            vec!["requesting", "recording", "stopping", "stopped"]
        );
        assert_eq!(*f.delegate.finished.lock(), vec![45]);
    }

    #[test]
    fn codec_negotiation_prefers_first_supported() {
        let mut f = fixture_with(&["audio/mp4", "audio/webm;codecs=opus"], RecordingConfig::default());
        f.session.start().unwrap();
        assert_eq!(f.probe.codec().as_deref(), Some("audio/webm;codecs=opus"));
    }

    #[test]
    fn unsupported_preferences_fall_back_to_encoder_default() {
        let mut f = fixture_with(&[], RecordingConfig::default());
        f.session.start().unwrap();
        f.probe.emit(vec![9; 4]);
        f.session.stop().unwrap();
        assert_eq!(f.session.artifact().unwrap().codec, MOCK_DEFAULT_CODEC);
    }

    #[test]
    fn start_while_recording_is_a_noop() {
        let mut f = fixture();
        f.session.start().unwrap();
        f.session.start().unwrap();

        assert_eq!(f.device.requests(), 1);
        assert_eq!(f.broker.ref_count(), 1);
        assert_eq!(f.delegate.states.lock().len(), 2);
    }

    #[test]
    fn stops_automatically_at_tick_120() {
        let mut f = fixture();
        f.session.start().unwrap();
        f.probe.emit(vec![0; 8]);

        for _ in 0..119 {
            f.session.tick().unwrap();
        }
        assert!(f.session.state().is_recording());
        assert_relative_eq!(f.session.elapsed_secs(), 11.9, epsilon = 1e-9);

        f.session.tick().unwrap();
        let artifact = f.session.artifact().unwrap();
        assert_relative_eq!(artifact.duration_secs, 12.0, epsilon = 1e-9);
        assert_eq!(f.broker.ref_count(), 0);

        // further ticks do nothing
        f.session.tick().unwrap();
        assert!(f.session.artifact().is_some());
        assert_eq!(f.delegate.elapsed.lock().len(), 120);
    }

    #[test]
    fn both_stop_paths_flush_buffered_data() {
        let mut f = fixture_with(&["audio/webm"], RecordingConfig {
            max_duration_secs: 0.2,
            ..RecordingConfig::default()
        });
        f.session.start().unwrap();
        f.probe.flush_on_request(vec![4; 6]);
        f.session.tick().unwrap();
        f.session.tick().unwrap();
        assert_eq!(f.probe.data_requests(), 1);
        assert_eq!(f.session.artifact().unwrap().size(), 6);

        f.session.reset();
        f.session.start().unwrap();
        f.probe.flush_on_request(vec![5; 3]);
        f.session.stop().unwrap();
        assert_eq!(f.probe.data_requests(), 2);
        assert_eq!(f.session.artifact().unwrap().size(), 3);
    }

    #[test]
    fn trailing_chunks_are_appended() {
        let mut f = fixture();
        f.session.start().unwrap();
        f.probe.emit(vec![1; 2]);
        f.probe.set_trailing(vec![vec![2; 3], Vec::new()]);
        f.session.stop().unwrap();
        assert_eq!(f.session.artifact().unwrap().bytes(), &[1, 1, 2, 2, 2]);
    }

    #[test]
    fn empty_capture_fails() {
        let mut f = fixture();
        f.session.start().unwrap();
        f.probe.emit(Vec::new());

        assert_eq!(f.session.stop(), Err(CaptureError::EmptyRecording));
        assert_eq!(f.session.state(), &RecordingState::Failed(CaptureError::EmptyRecording));
        assert_eq!(*f.delegate.errors.lock(), vec![CaptureError::EmptyRecording]);
        assert_eq!(f.broker.ref_count(), 0);
    }

    #[test]
    fn finalize_error_fails_session() {
        let mut f = fixture();
        f.session.start().unwrap();
        f.probe.emit(vec![1; 4]);
        f.probe.fail_finalize("disk full");

        assert!(matches!(f.session.stop(), Err(CaptureError::EncoderError(_))));
        assert!(matches!(f.session.state(), RecordingState::Failed(CaptureError::EncoderError(_))));
        assert!(!f.session.holds_input());
    }

    #[test]
    fn encoder_error_mid_capture_fails_at_next_tick() {
        let mut f = fixture();
        f.session.start().unwrap();
        f.probe.fail("stream corrupted");
        assert!(f.session.state().is_recording());

        assert_eq!(
            f.session.tick(),
            Err(CaptureError::EncoderError("stream corrupted".into()))
        );
        assert_eq!(f.broker.ref_count(), 0);
        assert_eq!(f.probe.dropped(), 1);
    }

    #[test]
    fn denial_returns_to_idle() {
        let mut f = fixture();
        f.device.fail_next(CaptureError::PermissionDenied);

        assert_eq!(f.session.start(), Err(CaptureError::PermissionDenied));
        assert!(f.session.state().is_idle());
        assert_eq!(*f.delegate.states.lock(), vec!["requesting", "idle"]);
        assert_eq!(*f.delegate.errors.lock(), vec![CaptureError::PermissionDenied]);

        // retry is just another start
        f.session.start().unwrap();
        assert!(f.session.state().is_recording());
    }

    #[test]
    fn terminal_states_require_reset() {
        let mut f = fixture();
        f.session.start().unwrap();
        f.probe.emit(vec![1]);
        f.session.stop().unwrap();

        assert!(matches!(f.session.start(), Err(CaptureError::InvalidState(_))));
        f.session.reset();
        f.session.start().unwrap();
        assert!(f.session.state().is_recording());
    }

    #[test]
    fn stop_outside_recording_is_a_noop() {
        let mut f = fixture();
        f.session.stop().unwrap();
        assert!(f.session.state().is_idle());
        assert!(f.delegate.states.lock().is_empty());
    }

    #[test]
    fn reset_while_recording_releases_everything() {
        let mut f = fixture();
        f.session.start().unwrap();
        f.probe.emit(vec![1; 5]);

        f.session.reset();
        assert!(f.session.state().is_idle());
        assert_eq!(f.broker.ref_count(), 0);
        assert_eq!(f.probe.dropped(), 1);
        assert_eq!(f.probe.finalized(), 0);
    }

    #[test]
    fn artifact_refs_are_revoked_by_reset() {
        let mut f = fixture();
        assert!(f.session.issue_artifact_ref().is_none());

        f.session.start().unwrap();
        f.probe.emit(vec![1; 5]);
        f.session.stop().unwrap();

        let reference = f.session.issue_artifact_ref().unwrap();
        assert_eq!(f.session.issue_artifact_ref(), Some(reference.clone()));
        assert_eq!(f.session.resolve(&reference).unwrap().size(), 5);

        f.session.reset();
        assert!(f.session.resolve(&reference).is_none());
    }

    #[test]
    fn submit_hands_off_and_resets() {
        let mut f = fixture();
        f.session.start().unwrap();
        f.probe.emit(vec![1; 5]);
        f.session.tick().unwrap();
        f.session.stop().unwrap();
        let artifact_id = f.session.artifact().unwrap().id.clone();

        let uploader = MockUploader::default();
        let receipt = f.session.submit(&uploader, "Acme").unwrap();

        assert_eq!(receipt.reference, format!("mock-{}", artifact_id));
        let received = uploader.received.lock();
        assert_eq!(received[0].0, artifact_id);
        assert_eq!(received[0].1.sponsor, "Acme");
        assert!(received[0].1.uid.starts_with("UID-"));
        assert_relative_eq!(received[0].1.duration, 0.1);
        assert!(f.session.state().is_idle());
    }

    #[test]
    fn failed_submit_keeps_the_artifact() {
        let mut f = fixture();
        f.session.start().unwrap();
        f.probe.emit(vec![1; 5]);
        f.session.stop().unwrap();

        let uploader = MockUploader {
            refuse: Some(CaptureError::DeviceUnavailable),
            ..MockUploader::default()
        };
        assert!(matches!(
            f.session.submit(&uploader, "Acme"),
            Err(CaptureError::UploadFailed(_))
        ));
        assert!(f.session.artifact().is_some());
    }

    #[test]
    fn submit_without_artifact_is_rejected() {
        let mut f = fixture();
        let uploader = MockUploader::default();
        assert!(matches!(
            f.session.submit(&uploader, "Acme"),
            Err(CaptureError::InvalidState(_))
        ));
    }

    #[test]
    fn shares_stream_with_other_consumers() {
        let mut f = fixture();
        let visualizer_handle = f.broker.acquire().unwrap();

        f.session.start().unwrap();
        f.probe.emit(vec![1; 5]);
        f.session.stop().unwrap();

        assert!(f.broker.is_live());
        assert_eq!(f.device.stream().stop_count(), 0);
        f.broker.release(visualizer_handle);
        assert_eq!(f.device.stream().stop_count(), 1);
    }

    #[test]
    fn records_real_pcm_through_the_software_encoder() {
        let device = MockDevice::granting();
        let broker = Arc::new(DeviceStreamBroker::new(device.clone()));
        let mut session =
            RecordingSession::new(Arc::clone(&broker), Arc::new(PcmEncoderFactory), RecordingConfig::default())
                .unwrap();

        session.start().unwrap();
        device.stream().push(&[0.25; 4800]);
        session.tick().unwrap();
        device.stream().push(&[0.25; 100]);
        session.stop().unwrap();

        let artifact = session.artifact().unwrap();
        assert_eq!(artifact.codec, PCM_CODEC);
        assert_eq!(&artifact.bytes()[0..4], b"RIFF");
        assert_eq!(artifact.size(), 44 + (4800 + 100) * 2);

        let le = |at: usize| u32::from_le_bytes(artifact.bytes()[at..at + 4].try_into().unwrap());
        assert_eq!(le(40), (4800 + 100) * 2);
        assert_eq!(le(4), (4800 + 100) * 2 + 36);
    }

    #[test]
    fn losing_the_input_mid_recording_fails_the_session() {
        let device = MockDevice::granting();
        let broker = Arc::new(DeviceStreamBroker::new(device.clone()));
        let delegate = Arc::new(DelegateLog::default());
        let mut session =
            RecordingSession::new(Arc::clone(&broker), Arc::new(PcmEncoderFactory), RecordingConfig::default())
                .unwrap();
        session.set_delegate(delegate.clone());

        session.start().unwrap();
        device.stream().push(&[0.25; 4800]);
        session.tick().unwrap();
        device.stream().end();

        let err = session.tick().unwrap_err();
        assert!(matches!(err, CaptureError::EncoderError(_)));
        assert_eq!(session.state(), &RecordingState::Failed(err.clone()));
        assert!(session.artifact().is_none());
        assert_eq!(broker.ref_count(), 0);
        assert_eq!(*delegate.errors.lock(), vec![err]);

        for _ in 0..120 {
            session.tick().unwrap();
        }
        assert!(matches!(session.state(), RecordingState::Failed(_)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let broker = Arc::new(DeviceStreamBroker::new(MockDevice::granting()));
        let config = RecordingConfig {
            max_duration_secs: 0.0,
            ..RecordingConfig::default()
        };
        assert!(matches!(
            RecordingSession::new(broker, Arc::new(PcmEncoderFactory), config),
            Err(CaptureError::ConfigurationFailed(_))
        ));
    }
}
