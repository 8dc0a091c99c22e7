use crate::models::frame::AnalysisFrame;

/// Width used when the container has not reported a size yet.
pub const FALLBACK_WIDTH: f64 = 800.0;

/// Share of the surface height the tallest bar may occupy.
const BAR_HEIGHT_RATIO: f64 = 0.85;

/// Minimum drawn bar height in CSS pixels.
const MIN_BAR_PX: f64 = 6.0;

/// Size of a rendering surface.
///
/// Drawing coordinates are CSS pixels; the backing store is
/// `css size × device_pixel_ratio` physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceGeometry {
    pub css_width: f64,
    pub css_height: f64,
    pub device_pixel_ratio: f64,
}

impl SurfaceGeometry {
    pub fn new(css_width: f64, css_height: f64, device_pixel_ratio: f64) -> Self {
        let sanitize = |v: f64, fallback: f64| if v.is_finite() && v > 0.0 { v } else { fallback };
        Self {
            css_width: sanitize(css_width, FALLBACK_WIDTH),
            css_height: sanitize(css_height, 1.0),
            device_pixel_ratio: sanitize(device_pixel_ratio, 1.0),
        }
    }

    /// Geometry of a surface that has not been laid out yet.
    pub fn fallback(css_height: u32) -> Self {
        Self::new(FALLBACK_WIDTH, css_height as f64, 1.0)
    }

    pub fn pixel_width(&self) -> u32 {
        (self.css_width * self.device_pixel_ratio).round() as u32
    }

    pub fn pixel_height(&self) -> u32 {
        (self.css_height * self.device_pixel_ratio).round() as u32
    }
}

/// A point of the synthetic waveform, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavePoint {
    pub x: f64,
    pub y: f64,
}

/// What a surface is asked to draw on one tick.
#[derive(Debug, Clone, Copy)]
pub enum RenderFrame<'a> {
    /// Live spectral bars.
    Bars(&'a AnalysisFrame),
    /// Decorative idle waveform.
    Waveform(&'a [WavePoint]),
}

/// Drawing target of the visualization render loop.
pub trait RenderSurface: Send {
    fn geometry(&self) -> SurfaceGeometry;

    /// Rescale the backing store. Must not reset anything but pixels.
    fn resize(&mut self, geometry: SurfaceGeometry);

    fn render(&mut self, frame: RenderFrame<'_>, target_height: u32);

    /// Replace the visualization with an inline message.
    fn show_message(&mut self, message: &str);
}

/// Map bar magnitudes to drawn heights in CSS pixels.
pub fn bar_pixel_heights(frame: &AnalysisFrame, target_height: u32) -> Vec<f64> {
    let max_height = target_height as f64 * BAR_HEIGHT_RATIO;
    frame
        .bars()
        .iter()
        .map(|&h| (h as f64 / 100.0 * max_height).max(MIN_BAR_PX))
        .collect()
}
