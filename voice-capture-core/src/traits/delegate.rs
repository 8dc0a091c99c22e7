use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingArtifact;
use crate::models::state::RecordingState;

/// Event delegate for recording session notifications.
///
/// Methods may be called from the recording timer thread, not the UI
/// thread. Implementations should marshal to the UI thread if needed.
pub trait RecordingDelegate: Send + Sync {
    /// Called on every state transition.
    fn on_state_changed(&self, state: &RecordingState);

    /// Called on every timer step while recording (advisory display value).
    fn on_elapsed_updated(&self, elapsed_secs: f64);

    /// Called whenever the session fails or rejects an acquisition.
    fn on_error(&self, error: &CaptureError);

    /// Called once the artifact is assembled.
    fn on_recording_finished(&self, artifact: &RecordingArtifact);
}
