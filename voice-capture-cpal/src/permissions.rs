//! Microphone availability probe.
//!
//! Desktop platforms reached through cpal have no consent prompt of their
//! own. A denied OS privacy setting shows up as a failure to query or open
//! the input device, which is what this probe looks for.

use cpal::traits::{DeviceTrait, HostTrait};

use voice_capture_core::models::error::CaptureError;

/// Check whether the default microphone can be opened.
///
/// `Ok(false)` when there is no input device or its configuration cannot be
/// read.
pub fn check_microphone_permission() -> Result<bool, CaptureError> {
    let host = cpal::default_host();
    let Some(device) = host.default_input_device() else {
        return Ok(false);
    };

    match device.default_input_config() {
        Ok(_) => Ok(true),
        Err(e) => {
            log::warn!("Microphone probe failed: {}", e);
            Ok(false)
        }
    }
}

/// Classify a backend error message as a permission problem.
pub(crate) fn looks_like_denial(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["permission", "denied", "not authorized", "access"]
        .iter()
        .any(|needle| lower.contains(needle))
}
