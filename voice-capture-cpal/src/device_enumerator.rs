//! Input device enumeration through the cpal default host.
//!
//! cpal has no stable device identifiers, so the device name doubles as the
//! id in `AudioSource`.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

use voice_capture_core::models::audio_models::AudioSource;
use voice_capture_core::models::error::CaptureError;

/// Lists and looks up microphones on the default host.
pub struct DeviceEnumerator {
    host: Host,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// List every input device, marking the system default.
    pub fn list_input_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        let default_name = self.default_input_name();
        let devices = self.host.input_devices().map_err(|e| {
            log::warn!("Failed to enumerate input devices: {}", e);
            CaptureError::DeviceUnavailable
        })?;

        let mut sources = Vec::new();
        for (i, device) in devices.enumerate() {
            let name = device.name().unwrap_or_else(|_| format!("Input {}", i));
            sources.push(AudioSource {
                id: name.clone(),
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
            });
        }
        Ok(sources)
    }

    pub fn default_input_name(&self) -> Option<String> {
        self.host.default_input_device().and_then(|d| d.name().ok())
    }

    /// Open a device by name, or the default input when `name` is `None`.
    pub fn find_input_device(&self, name: Option<&str>) -> Result<Device, CaptureError> {
        let Some(name) = name else {
            return self
                .host
                .default_input_device()
                .ok_or(CaptureError::DeviceUnavailable);
        };

        let mut devices = self
            .host
            .input_devices()
            .map_err(|_| CaptureError::DeviceUnavailable)?;
        devices
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or(CaptureError::DeviceUnavailable)
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}
