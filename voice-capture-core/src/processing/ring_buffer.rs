/// Fixed-capacity circular window over the most recent audio samples.
///
/// Feeds the analyser: the capture thread writes, the render thread takes
/// snapshots of the newest samples without consuming them. Wrap in
/// `Arc<parking_lot::Mutex<RingBuffer>>` for cross-thread access.
///
/// Overflow behavior: drops oldest samples.
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Vec<f32>,
    write_index: usize,
    filled: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(1)],
            write_index: 0,
            filled: 0,
        }
    }

    /// Append samples, overwriting the oldest once full.
    pub fn write(&mut self, samples: &[f32]) {
        let capacity = self.buffer.len();
        let samples = if samples.len() > capacity {
            &samples[samples.len() - capacity..]
        } else {
            samples
        };

        for &sample in samples {
            self.buffer[self.write_index] = sample;
            self.write_index = (self.write_index + 1) % capacity;
        }
        self.filled = (self.filled + samples.len()).min(capacity);
    }

    /// Copy the newest `out.len()` samples into `out`, oldest first.
    ///
    /// When fewer samples have been written, the front of `out` is
    /// zero-filled (silence before capture started).
    pub fn copy_latest(&self, out: &mut [f32]) {
        let capacity = self.buffer.len();
        let wanted = out.len().min(capacity);
        let available = self.filled.min(wanted);
        let pad = out.len() - available;

        out[..pad].fill(0.0);
        let start = (self.write_index + capacity - available) % capacity;
        for (i, slot) in out[pad..].iter_mut().enumerate() {
            *slot = self.buffer[(start + i) % capacity];
        }
    }

    /// Number of valid samples held (saturates at capacity).
    pub fn count(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn reset(&mut self) {
        self.write_index = 0;
        self.filled = 0;
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}
