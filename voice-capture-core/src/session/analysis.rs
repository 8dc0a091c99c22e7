use std::fmt;
use std::sync::Arc;

use crate::models::config::{FFT_SIZE, SMOOTHING};
use crate::models::error::CaptureError;
use crate::models::frame::AnalysisFrame;
use crate::processing::spectrum;
use crate::session::broker::InputHandle;
use crate::traits::analyser::{AnalyserFactory, FrequencyAnalyser};
use crate::traits::input_device::InputStream;

struct Binding {
    analyser: Box<dyn FrequencyAnalyser>,
    stream: Arc<dyn InputStream>,
    bins: Vec<u8>,
    frame: AnalysisFrame,
}

/// Turns the live input into bar-height frames, one per render tick.
///
/// The engine does not own the input handle; whoever acquired it releases
/// it after calling `stop`.
pub struct SpectralAnalysisEngine {
    factory: Arc<dyn AnalyserFactory>,
    binding: Option<Binding>,
}

impl SpectralAnalysisEngine {
    pub fn new(factory: Arc<dyn AnalyserFactory>) -> Self {
        Self { factory, binding: None }
    }

    /// Bind an analysis node to `handle`. Rebinding replaces the old node.
    pub fn start(&mut self, handle: &InputHandle, bar_count: usize) -> Result<(), CaptureError> {
        if bar_count == 0 {
            return Err(CaptureError::ConfigurationFailed("bar count must be at least 1".into()));
        }
        let analyser = self.factory.create_analyser(handle, FFT_SIZE, SMOOTHING)?;
        let bins = vec![0u8; analyser.bin_count()];

        log::debug!(
            "Analysis bound to input #{} ({} bins → {} bars)",
            handle.generation(),
            bins.len(),
            bar_count
        );
        self.binding = Some(Binding {
            analyser,
            stream: Arc::clone(handle.stream()),
            bins,
            frame: AnalysisFrame::new(bar_count),
        });
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Bound to a stream that still delivers audio.
    pub fn is_live(&self) -> bool {
        self.binding.as_ref().is_some_and(|b| b.stream.is_live())
    }

    /// Read the analyser and reduce into the current frame.
    ///
    /// `None` when unbound or when the read failed; the failure is logged
    /// and the caller just skips this tick.
    pub fn next_frame(&mut self) -> Option<&AnalysisFrame> {
        let binding = self.binding.as_mut()?;
        if let Err(e) = binding.analyser.read_magnitudes(&mut binding.bins) {
            log::debug!("Skipping analysis frame: {}", e);
            return None;
        }
        spectrum::reduce_into(&binding.bins, &mut binding.frame);
        Some(&binding.frame)
    }

    /// Detach the analysis node. The handle stays with its owner.
    pub fn stop(&mut self) {
        if self.binding.take().is_some() {
            log::debug!("Analysis stopped");
        }
    }
}

impl fmt::Debug for SpectralAnalysisEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectralAnalysisEngine")
            .field("bound", &self.is_bound())
            .field("live", &self.is_live())
            .finish()
    }
}
