use super::config::BAR_MIN;

/// One tick's reduced bar-height sequence.
///
/// Always exactly `bar_count` values, each in `[BAR_MIN, BAR_MAX]`. The
/// engine rewrites it in place every tick; nothing keeps old frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisFrame {
    bars: Vec<u8>,
}

impl AnalysisFrame {
    /// A frame of `bar_count` bars resting at the floor value.
    ///
    /// A zero bar count is bumped to one so the frame is never empty.
    pub fn new(bar_count: usize) -> Self {
        Self {
            bars: vec![BAR_MIN; bar_count.max(1)],
        }
    }

    pub fn bars(&self) -> &[u8] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Never true; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub(crate) fn bars_mut(&mut self) -> &mut [u8] {
        &mut self.bars
    }
}
