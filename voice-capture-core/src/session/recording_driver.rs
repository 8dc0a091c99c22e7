use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::models::config::TIMER_INTERVAL;
use crate::models::error::CaptureError;
use crate::models::recording_result::UploadReceipt;
use crate::models::state::RecordingState;
use crate::session::liveness::Liveness;
use crate::session::recording::RecordingSession;
use crate::traits::uploader::Uploader;

/// Runs a `RecordingSession` in real time.
///
/// Owns the session behind a mutex and ticks it every `TIMER_INTERVAL` on a
/// background thread while it is recording. All commands go through the
/// same mutex as the ticks, so a manual stop and the automatic one can
/// never both run.
pub struct RecordingDriver {
    session: Arc<Mutex<RecordingSession>>,
    liveness: Arc<Liveness>,
    timer: Option<thread::JoinHandle<()>>,
}

impl RecordingDriver {
    pub fn new(session: RecordingSession) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            liveness: Arc::new(Liveness::new()),
            timer: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.session.lock().state().clone()
    }

    /// Direct access to the session, e.g. for artifact references.
    pub fn session(&self) -> &Arc<Mutex<RecordingSession>> {
        &self.session
    }

    /// Start recording and the duration timer.
    ///
    /// Blocks while the microphone is being acquired.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        {
            let mut session = self.session.lock();
            if session.state().is_busy() {
                log::debug!("Start ignored: recording already underway");
                return Ok(());
            }
            session.start()?;
        }
        self.stop_timer();

        let token = self.liveness.token();
        let liveness = Arc::clone(&self.liveness);
        let session = Arc::clone(&self.session);

        let spawned = thread::Builder::new()
            .name("recording-timer".into())
            .spawn(move || loop {
                thread::sleep(TIMER_INTERVAL);
                let mut session = session.lock();
                if !liveness.is_current(token) || !session.state().is_recording() {
                    break;
                }
                if let Err(e) = session.tick() {
                    log::debug!("Recording timer stopping after error: {}", e);
                    break;
                }
            });

        match spawned {
            Ok(handle) => {
                self.timer = Some(handle);
                Ok(())
            }
            Err(e) => {
                let mut session = self.session.lock();
                session.reset();
                Err(CaptureError::ConfigurationFailed(format!(
                    "failed to spawn recording timer: {}",
                    e
                )))
            }
        }
    }

    /// Stop recording now. No-op unless recording.
    pub fn stop(&mut self) -> Result<(), CaptureError> {
        self.stop_timer();
        self.session.lock().stop()
    }

    pub fn reset(&mut self) {
        self.stop_timer();
        self.session.lock().reset();
    }

    pub fn submit(&mut self, uploader: &dyn Uploader, sponsor: &str) -> Result<UploadReceipt, CaptureError> {
        self.session.lock().submit(uploader, sponsor)
    }

    /// Block until the session leaves `recording` on its own.
    pub fn wait(&mut self) -> RecordingState {
        if let Some(handle) = self.timer.take() {
            if handle.join().is_err() {
                log::error!("Recording timer panicked");
            }
        }
        self.state()
    }

    fn stop_timer(&mut self) {
        self.liveness.revoke();
        if let Some(handle) = self.timer.take() {
            if handle.join().is_err() {
                log::error!("Recording timer panicked");
            }
        }
    }
}

impl Drop for RecordingDriver {
    fn drop(&mut self) {
        self.stop_timer();
    }
}
