use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The finalized audio produced by a successful recording session.
///
/// `data` is shared, so cloning an artifact never copies the audio.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingArtifact {
    pub id: String,
    /// Codec / MIME identifier negotiated with the encoder.
    pub codec: String,
    pub data: Arc<[u8]>,
    pub duration_secs: f64,
    /// SHA-256 of `data`, lowercase hex.
    pub checksum: String,
    pub created_at: String,
}

impl RecordingArtifact {
    pub(crate) fn new(codec: &str, data: Vec<u8>, duration_secs: f64) -> Self {
        let checksum = hex_digest(&data);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            codec: codec.to_string(),
            data: Arc::from(data),
            duration_secs,
            checksum,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    /// Size of the artifact in bytes. Always > 0.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

fn hex_digest(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Token standing in for a finished artifact.
///
/// Resolves only while the artifact it names is still the session's
/// current one. Reset or a new recording revokes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactRef {
    pub(crate) artifact_id: String,
}

impl ArtifactRef {
    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }
}

/// Metadata handed to the upload collaborator alongside an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    pub uid: String,
    pub sponsor: String,
    /// ISO-8601 UTC timestamp with millisecond precision.
    pub timestamp: String,
    /// Elapsed recording time in seconds.
    pub duration: f64,
}

impl SessionMeta {
    pub fn new(sponsor: &str, duration_secs: f64) -> Self {
        let now = Utc::now();
        Self {
            uid: format!("UID-{}", now.timestamp_millis()),
            sponsor: sponsor.to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            duration: duration_secs,
        }
    }
}

/// Opaque result returned by the upload collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub reference: String,
}
