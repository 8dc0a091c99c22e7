use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::models::error::CaptureError;
use crate::processing::ring_buffer::RingBuffer;
use crate::session::broker::InputHandle;
use crate::traits::analyser::{AnalyserFactory, FrequencyAnalyser};
use crate::traits::input_device::{InputStream, TapId};

/// Magnitude in dB mapped to byte 0.
const MIN_DECIBELS: f32 = -100.0;

/// Magnitude in dB mapped to byte 255.
const MAX_DECIBELS: f32 = -30.0;

/// Software frequency-analysis node.
///
/// Keeps a sliding window of the newest `transform_size` samples from a tap
/// on the input stream. Each read applies a Blackman window, runs a real
/// FFT, normalises magnitudes by the transform size, smooths them
/// exponentially against the previous read, and maps the result from
/// `[-100 dB, -30 dB]` onto `[0, 255]`.
pub struct FftAnalyser {
    stream: Arc<dyn InputStream>,
    tap: TapId,
    window: Arc<Mutex<RingBuffer>>,
    transform_size: usize,
    smoothing: f32,
    plan: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    blackman: Vec<f32>,
    smoothed: Vec<f32>,
}

impl FftAnalyser {
    /// Attach a new analyser to `stream`.
    pub fn attach(
        stream: Arc<dyn InputStream>,
        transform_size: usize,
        smoothing: f32,
    ) -> Result<Self, CaptureError> {
        if transform_size < 32 || !transform_size.is_power_of_two() {
            return Err(CaptureError::ConfigurationFailed(format!(
                "transform size must be a power of two >= 32, got {}",
                transform_size
            )));
        }
        if !(0.0..=1.0).contains(&smoothing) {
            return Err(CaptureError::ConfigurationFailed(format!(
                "smoothing must be within [0, 1], got {}",
                smoothing
            )));
        }

        let window = Arc::new(Mutex::new(RingBuffer::new(transform_size)));
        let sink = Arc::clone(&window);
        let tap = stream.add_tap(Arc::new(move |samples: &[f32], _rate: u32| {
            sink.lock().write(samples);
        }));

        let plan = RealFftPlanner::<f32>::new().plan_fft_forward(transform_size);
        let input = plan.make_input_vec();
        let spectrum = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        Ok(Self {
            stream,
            tap,
            window,
            transform_size,
            smoothing,
            plan,
            input,
            spectrum,
            scratch,
            blackman: blackman_window(transform_size),
            smoothed: vec![0.0; transform_size / 2],
        })
    }
}

impl FrequencyAnalyser for FftAnalyser {
    fn transform_size(&self) -> usize {
        self.transform_size
    }

    fn smoothing(&self) -> f32 {
        self.smoothing
    }

    fn read_magnitudes(&mut self, out: &mut [u8]) -> Result<(), CaptureError> {
        if out.len() != self.smoothed.len() {
            return Err(CaptureError::AnalysisFailed(format!(
                "expected {} bins, got a buffer of {}",
                self.smoothed.len(),
                out.len()
            )));
        }
        if !self.stream.is_live() {
            return Err(CaptureError::AnalysisFailed("input stream has ended".into()));
        }

        self.window.lock().copy_latest(&mut self.input);
        for (sample, weight) in self.input.iter_mut().zip(&self.blackman) {
            *sample *= weight;
        }

        self.plan
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
            .map_err(|e| CaptureError::AnalysisFailed(e.to_string()))?;

        let norm = 1.0 / self.transform_size as f32;
        let tau = self.smoothing;
        let db_range = MAX_DECIBELS - MIN_DECIBELS;
        for ((bin, previous), byte) in self.spectrum.iter().zip(self.smoothed.iter_mut()).zip(out.iter_mut()) {
            let magnitude = bin.norm() * norm;
            *previous = tau * *previous + (1.0 - tau) * magnitude;

            let db = 20.0 * previous.log10();
            let scaled = (255.0 / db_range) * (db - MIN_DECIBELS);
            // log10(0) is -inf, which clamps to 0
            *byte = if scaled.is_nan() { 0 } else { scaled.floor().clamp(0.0, 255.0) as u8 };
        }
        Ok(())
    }
}

impl Drop for FftAnalyser {
    fn drop(&mut self) {
        self.stream.remove_tap(self.tap);
    }
}

impl fmt::Debug for FftAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftAnalyser")
            .field("transform_size", &self.transform_size)
            .field("smoothing", &self.smoothing)
            .field("tap", &self.tap)
            .finish()
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;
    (0..size)
        .map(|n| {
            let x = n as f32 / size as f32;
            a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
        })
        .collect()
}

/// Builds an `FftAnalyser` on the stream behind a handle.
#[derive(Debug, Default, Clone, Copy)]
pub struct FftAnalyserFactory;

impl AnalyserFactory for FftAnalyserFactory {
    fn create_analyser(
        &self,
        handle: &InputHandle,
        transform_size: usize,
        smoothing: f32,
    ) -> Result<Box<dyn FrequencyAnalyser>, CaptureError> {
        let analyser = FftAnalyser::attach(Arc::clone(handle.stream()), transform_size, smoothing)?;
        Ok(Box::new(analyser))
    }
}
