use thiserror::Error;

/// Errors that can occur while acquiring, analysing or recording audio.
///
/// Recording-path errors always reach the session's caller. Analysis-path
/// errors (`AnalysisFailed`) are swallowed by the render loop and only cost
/// one frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The user declined microphone access. Retrying may succeed.
    #[error("permission denied")]
    PermissionDenied,

    /// No compatible input hardware or capability.
    #[error("device not available")]
    DeviceUnavailable,

    /// The recording finished without a single byte of audio.
    #[error("no audio recorded")]
    EmptyRecording,

    #[error("encoder error: {0}")]
    EncoderError(String),

    #[error("analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("upload failed: {0}")]
    UploadFailed(String),
}

impl CaptureError {
    /// Whether this error came from device acquisition.
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::DeviceUnavailable)
    }
}
