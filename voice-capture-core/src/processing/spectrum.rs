//! Reduction of raw frequency bins into bar heights.
//!
//! Pure integer/f64 math so the same bins always give the same bars.

use crate::models::config::{BAR_MAX, BAR_MIN, BAR_SCALE};
use crate::models::frame::AnalysisFrame;

/// Reduce `bins` into a new frame of `bar_count` bars.
pub fn reduce_magnitudes(bins: &[u8], bar_count: usize) -> AnalysisFrame {
    let mut frame = AnalysisFrame::new(bar_count);
    reduce_into(bins, &mut frame);
    frame
}

/// Reduce `bins` into `frame` in place, keeping its bar count.
///
/// Bins are split into contiguous groups of `bins / bars` (floored); the last
/// group also takes the remainder. Each group's mean is scaled by
/// `BAR_SCALE`, rounded, and clamped to `[BAR_MIN, BAR_MAX]`. Groups with no
/// bins (more bars than bins) rest at `BAR_MIN`.
pub fn reduce_into(bins: &[u8], frame: &mut AnalysisFrame) {
    let bar_count = frame.len();
    let per_bar = bins.len() / bar_count;

    for (i, bar) in frame.bars_mut().iter_mut().enumerate() {
        let start = (i * per_bar).min(bins.len());
        let end = if i + 1 == bar_count {
            bins.len()
        } else {
            (start + per_bar).min(bins.len())
        };
        *bar = scale_group(&bins[start..end]);
    }
}

fn scale_group(group: &[u8]) -> u8 {
    if group.is_empty() {
        return BAR_MIN;
    }
    let sum: u64 = group.iter().map(|&b| b as u64).sum();
    let mean = sum as f64 / group.len() as f64;
    let scaled = (mean * BAR_SCALE).round();
    scaled.clamp(BAR_MIN as f64, BAR_MAX as f64) as u8
}
