use crate::traits::surface::WavePoint;

/// Phase advance per rendered tick.
pub const PHASE_STEP: f64 = 0.1;

const BASE_FREQUENCY: f64 = 0.012;
const BASE_AMPLITUDE: f64 = 40.0;
const X_STEP: usize = 2;

/// (frequency multiplier, phase multiplier, amplitude multiplier)
const HARMONICS: [(f64, f64, f64); 4] = [
    (1.0, 1.0, 1.0),
    (2.5, 1.5, 0.65),
    (0.6, 0.7, 0.45),
    (4.0, 2.2, 0.25),
];

/// Decorative idle waveform built from four sine harmonics.
///
/// Entirely deterministic: the same phase and width always give the same
/// points. Independent of any real audio.
#[derive(Debug, Clone, Default)]
pub struct SyntheticWaveform {
    phase: f64,
    points: Vec<WavePoint>,
}

impl SyntheticWaveform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Compute the curve for the current phase across `width × height`
    /// (CSS pixels), one point every two pixels.
    pub fn sample(&mut self, width: f64, height: f64) -> &[WavePoint] {
        self.points.clear();
        let center = height / 2.0;
        let mut x = 0usize;
        while (x as f64) < width {
            let xf = x as f64;
            let offset: f64 = HARMONICS
                .iter()
                .map(|&(freq, phase_mul, amp)| {
                    (xf * BASE_FREQUENCY * freq + self.phase * phase_mul).sin() * BASE_AMPLITUDE * amp
                })
                .sum();
            self.points.push(WavePoint { x: xf, y: center + offset });
            x += X_STEP;
        }
        &self.points
    }

    /// Move to the next tick's phase.
    pub fn advance(&mut self) {
        self.phase += PHASE_STEP;
    }
}
