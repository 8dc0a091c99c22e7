//! # voice-capture-core
//!
//! Platform-agnostic core of a voice recording widget: a shared microphone
//! broker, spectral bar analysis, a ~60 Hz visualization loop and a
//! bounded-duration recording session.
//!
//! Platform backends (cpal) implement the `InputDevice` trait and plug into
//! the `DeviceStreamBroker`, which every visualizer and recording session
//! shares.
//!
//! ## Architecture
//!
//! ```text
//! voice-capture-core (this crate)
//! ├── traits/       ← InputDevice, FrequencyAnalyser, ChunkedEncoder, RenderSurface, Uploader, RecordingDelegate
//! ├── models/       ← CaptureError, RecordingState, configs, AnalysisFrame, RecordingArtifact
//! ├── processing/   ← FFT analyser, bar reduction, PCM chunk encoder, synthetic waveform
//! ├── session/      ← DeviceStreamBroker, analysis engine, render loop, visualizer, recording session
//! └── storage/      ← chunk buffer, upload manifest
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
mod test_support;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioSource, TrackInfo, TrackState};
pub use models::config::{RecordingConfig, VisualizerConfig};
pub use models::error::CaptureError;
pub use models::frame::AnalysisFrame;
pub use models::recording_result::{ArtifactRef, RecordingArtifact, SessionMeta, UploadReceipt};
pub use models::state::RecordingState;
pub use processing::chunk_encoder::{PcmChunkEncoder, PcmEncoderFactory};
pub use processing::fft_analyser::{FftAnalyser, FftAnalyserFactory};
pub use processing::spectrum::reduce_magnitudes;
pub use processing::taps::TapSet;
pub use session::analysis::SpectralAnalysisEngine;
pub use session::broker::{DeviceStreamBroker, InputHandle};
pub use session::recording::RecordingSession;
pub use session::recording_driver::RecordingDriver;
pub use session::render_loop::{TickOutcome, VisualizationRenderLoop};
pub use session::visualizer::{VisualizerStatus, WaveformVisualizer};
pub use traits::analyser::{AnalyserFactory, FrequencyAnalyser};
pub use traits::delegate::RecordingDelegate;
pub use traits::encoder::{ChunkedEncoder, EncoderFactory};
pub use traits::input_device::{InputDevice, InputStream, SampleCallback, TapId};
pub use traits::surface::{RenderFrame, RenderSurface, SurfaceGeometry};
pub use traits::uploader::Uploader;
