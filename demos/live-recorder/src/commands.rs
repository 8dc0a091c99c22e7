use std::fs;
use std::path::Path;

use serde::Deserialize;

use voice_capture_core::storage::metadata::upload_manifest;
use voice_capture_core::{
    CaptureError, RecordingArtifact, RecordingConfig, SessionMeta, UploadReceipt, Uploader,
    VisualizerConfig,
};
use voice_capture_cpal::DeviceEnumerator;

use crate::console::DeviceInfo;

/// Settings file accepted by `--config`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DemoSettings {
    pub mic_device: Option<String>,
    pub sponsor: Option<String>,
    pub destination: Option<String>,
    pub bar_count: Option<usize>,
    pub height_px: Option<u32>,
    pub max_duration_secs: Option<f64>,
    pub codec_preferences: Option<Vec<String>>,
}

impl DemoSettings {
    pub fn load(path: &Path) -> Result<Self, CaptureError> {
        let text = fs::read_to_string(path).map_err(|e| {
            CaptureError::ConfigurationFailed(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            CaptureError::ConfigurationFailed(format!("invalid settings in {}: {}", path.display(), e))
        })
    }

    pub fn visualizer_config(&self) -> VisualizerConfig {
        let defaults = VisualizerConfig::default();
        VisualizerConfig {
            bar_count: self.bar_count.unwrap_or(defaults.bar_count),
            height_px: self.height_px.unwrap_or(defaults.height_px),
        }
    }

    pub fn recording_config(&self) -> RecordingConfig {
        let defaults = RecordingConfig::default();
        RecordingConfig {
            max_duration_secs: self.max_duration_secs.unwrap_or(defaults.max_duration_secs),
            codec_preferences: self
                .codec_preferences
                .clone()
                .unwrap_or(defaults.codec_preferences),
        }
    }
}

pub fn list_input_devices() -> Result<Vec<DeviceInfo>, CaptureError> {
    let devices = DeviceEnumerator::new().list_input_devices()?;
    Ok(devices.into_iter().map(DeviceInfo::from).collect())
}

/// Uploader that hands recordings to the log instead of a server.
///
/// Prints the upload manifest on stdout and logs the payload size. The
/// receipt names the artifact.
pub struct LoggingUploader {
    destination: String,
}

impl LoggingUploader {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
        }
    }
}

impl Uploader for LoggingUploader {
    fn upload(&self, artifact: &RecordingArtifact, meta: &SessionMeta) -> Result<UploadReceipt, CaptureError> {
        if artifact.bytes().is_empty() {
            return Err(CaptureError::UploadFailed("artifact has no audio".into()));
        }
        let manifest = upload_manifest(artifact, meta)?;
        println!("{}", manifest);
        log::info!(
            "Uploaded {} bytes of {} to {} for {}",
            artifact.size(),
            artifact.codec,
            self.destination,
            meta.sponsor
        );
        Ok(UploadReceipt {
            reference: format!("{}/{}", self.destination.trim_end_matches('/'), artifact.id),
        })
    }
}
