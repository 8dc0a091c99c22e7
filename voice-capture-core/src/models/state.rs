use super::error::CaptureError;
use super::recording_result::RecordingArtifact;

/// Recording session state machine.
///
/// State transitions:
/// ```text
/// idle → requesting → recording → stopping → stopped / failed
///   ↑        │                                    │
///   └────────┴──────────── reset ─────────────────┘
/// ```
/// A failed acquisition drops back from `requesting` to `idle`.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingState {
    Idle,
    Requesting,
    Recording { elapsed_secs: f64 },
    Stopping,
    Stopped(Box<RecordingArtifact>),
    Failed(CaptureError),
}

impl RecordingState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    /// Whether a start command should be ignored as a duplicate.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Requesting | Self::Recording { .. } | Self::Stopping)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped(_) | Self::Failed(_))
    }

    /// Short lowercase name, for logs and UI payloads.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requesting => "requesting",
            Self::Recording { .. } => "recording",
            Self::Stopping => "stopping",
            Self::Stopped(_) => "stopped",
            Self::Failed(_) => "failed",
        }
    }

    pub fn elapsed(&self) -> Option<f64> {
        match self {
            Self::Recording { elapsed_secs } => Some(*elapsed_secs),
            Self::Stopped(artifact) => Some(artifact.duration_secs),
            _ => None,
        }
    }

    pub fn artifact(&self) -> Option<&RecordingArtifact> {
        match self {
            Self::Stopped(artifact) => Some(artifact),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&CaptureError> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }
}
