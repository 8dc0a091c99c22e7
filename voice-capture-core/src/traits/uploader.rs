use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordingArtifact, SessionMeta, UploadReceipt};

/// External collaborator that takes finished recordings.
///
/// The core only distinguishes success from failure; the receipt is opaque.
pub trait Uploader: Send + Sync {
    fn upload(&self, artifact: &RecordingArtifact, meta: &SessionMeta) -> Result<UploadReceipt, CaptureError>;
}
