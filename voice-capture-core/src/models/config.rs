use std::time::Duration;

/// Transform size of the frequency-domain analysis node, in samples.
pub const FFT_SIZE: usize = 2048;

/// Exponential smoothing applied by the analysis node between reads.
pub const SMOOTHING: f32 = 0.8;

/// Multiplier applied to each averaged bin group.
pub const BAR_SCALE: f64 = 1.5;

/// Lower clamp of a bar magnitude. Keeps every bar visible.
pub const BAR_MIN: u8 = 5;

/// Upper clamp of a bar magnitude.
pub const BAR_MAX: u8 = 100;

/// Interval at which the encoder emits chunks while recording.
pub const CHUNK_INTERVAL: Duration = Duration::from_millis(100);

/// Step of the recording duration timer, in seconds.
pub const TIMER_STEP_SECS: f64 = 0.1;

/// Wall-clock period of one recording timer tick.
pub const TIMER_INTERVAL: Duration = Duration::from_millis(100);

/// Render loop period (~60 Hz).
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Codecs tried in order when a recording starts.
pub const DEFAULT_CODEC_PREFERENCES: [&str; 3] = ["audio/webm", "audio/webm;codecs=opus", "audio/mp4"];

/// Configuration for a waveform visualizer.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizerConfig {
    /// Number of bars per analysis frame (default: 40).
    pub bar_count: usize,

    /// Height of the rendering surface in CSS pixels (default: 120).
    pub height_px: u32,
}

impl VisualizerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.bar_count == 0 {
            return Err("bar count must be at least 1".into());
        }
        if self.height_px == 0 {
            return Err("visualization height must be positive".into());
        }
        Ok(())
    }
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            bar_count: 40,
            height_px: 120,
        }
    }
}

/// Configuration for a recording session.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingConfig {
    /// Recording stops automatically once this much time has elapsed (default: 12s).
    pub max_duration_secs: f64,

    /// Ordered codec preference list. The first one the encoder supports wins;
    /// when none is supported the encoder picks its own default.
    pub codec_preferences: Vec<String>,
}

impl RecordingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.max_duration_secs.is_finite() || self.max_duration_secs < TIMER_STEP_SECS {
            return Err(format!(
                "max duration must be at least {TIMER_STEP_SECS}s, got {}",
                self.max_duration_secs
            ));
        }
        Ok(())
    }

    /// Number of timer steps after which the session stops on its own.
    pub fn max_ticks(&self) -> u64 {
        (self.max_duration_secs / TIMER_STEP_SECS).round() as u64
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: 12.0,
            codec_preferences: DEFAULT_CODEC_PREFERENCES.iter().map(|c| c.to_string()).collect(),
        }
    }
}
