use crate::models::error::CaptureError;
use crate::session::broker::InputHandle;

/// Frequency-domain analysis node bound to one input stream.
pub trait FrequencyAnalyser: Send {
    /// FFT size in samples.
    fn transform_size(&self) -> usize;

    /// Smoothing constant applied between consecutive reads.
    fn smoothing(&self) -> f32;

    /// Number of frequency bins produced per read.
    fn bin_count(&self) -> usize {
        self.transform_size() / 2
    }

    /// Fill `out` with the latest byte magnitudes, one per bin.
    ///
    /// `out.len()` must equal `bin_count()`.
    fn read_magnitudes(&mut self, out: &mut [u8]) -> Result<(), CaptureError>;
}

/// Creates analysis nodes for input handles.
pub trait AnalyserFactory: Send + Sync {
    fn create_analyser(
        &self,
        handle: &InputHandle,
        transform_size: usize,
        smoothing: f32,
    ) -> Result<Box<dyn FrequencyAnalyser>, CaptureError>;
}
