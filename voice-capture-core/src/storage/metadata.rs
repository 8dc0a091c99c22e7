use serde::Serialize;

use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordingArtifact, SessionMeta};

/// Description of an artifact as sent to an upload collaborator.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadManifest<'a> {
    artifact_id: &'a str,
    codec: &'a str,
    size: usize,
    checksum: &'a str,
    meta: &'a SessionMeta,
}

/// Serialize the manifest that accompanies an artifact upload.
///
/// The audio itself is not included; uploaders send `artifact.bytes()`
/// alongside.
pub fn upload_manifest(artifact: &RecordingArtifact, meta: &SessionMeta) -> Result<String, CaptureError> {
    let manifest = UploadManifest {
        artifact_id: &artifact.id,
        codec: &artifact.codec,
        size: artifact.size(),
        checksum: &artifact.checksum,
        meta,
    };
    serde_json::to_string_pretty(&manifest)
        .map_err(|e| CaptureError::UploadFailed(format!("failed to serialize manifest: {}", e)))
}
