use std::sync::Arc;

use crate::models::audio_models::{AudioSource, TrackInfo};
use crate::models::error::CaptureError;

/// Callback invoked when a block of captured audio is available.
///
/// Parameters:
/// - `samples`: mono f32 samples in `[-1.0, 1.0]`.
/// - `sample_rate`: the actual sample rate of the delivered audio.
pub type SampleCallback = Arc<dyn Fn(&[f32], u32) + Send + Sync + 'static>;

/// Identifies one tap registered on an `InputStream`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TapId(pub u64);

/// A live microphone capture stream handed out by an `InputDevice`.
///
/// Analysers and encoders observe the stream through taps; any number of
/// taps may be attached at once.
pub trait InputStream: Send + Sync {
    /// Whether the stream still delivers audio.
    fn is_live(&self) -> bool;

    /// Tracks backing this stream.
    fn tracks(&self) -> Vec<TrackInfo>;

    /// Start delivering samples to `callback`.
    ///
    /// The callback fires on the capture thread. Keep it short.
    fn add_tap(&self, callback: SampleCallback) -> TapId;

    /// Stop delivering samples to a tap. Unknown ids are ignored.
    fn remove_tap(&self, tap: TapId);

    /// Stop every track and release the hardware. Idempotent.
    fn stop_tracks(&self);
}

/// Platform capability that opens microphone streams.
///
/// Implemented by:
/// - `CpalMicrophone` (voice-capture-cpal)
/// - test doubles in this crate
pub trait InputDevice: Send + Sync {
    /// Ask the platform for a new input stream.
    ///
    /// May block while the user answers a permission prompt.
    fn request_input(&self) -> Result<Arc<dyn InputStream>, CaptureError>;

    /// Information about the device backing this capability.
    fn device_info(&self) -> AudioSource;
}
