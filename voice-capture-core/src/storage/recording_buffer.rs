use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingArtifact;
use crate::processing::wav_format;

/// Append-only, in-memory store of the chunks emitted during one session.
///
/// Shared with the encoder's chunk callback through
/// `Arc<parking_lot::Mutex<RecordingBuffer>>`.
#[derive(Debug, Default)]
pub struct RecordingBuffer {
    chunks: Vec<Vec<u8>>,
    total_bytes: usize,
}

impl RecordingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Zero-length chunks carry nothing and are dropped.
    pub fn push(&mut self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        self.total_bytes += chunk.len();
        self.chunks.push(chunk);
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_bytes = 0;
    }

    /// Concatenate every chunk into one artifact and empty the buffer.
    ///
    /// A streamed WAV gets its real sizes written into the header. Fails
    /// with `EmptyRecording` when nothing was captured.
    pub fn assemble(&mut self, codec: &str, duration_secs: f64) -> Result<RecordingArtifact, CaptureError> {
        if self.chunks.is_empty() || self.total_bytes == 0 {
            return Err(CaptureError::EmptyRecording);
        }

        let mut data = Vec::with_capacity(self.total_bytes);
        for chunk in self.chunks.drain(..) {
            data.extend_from_slice(&chunk);
        }
        self.total_bytes = 0;

        if wav_format::is_wav_codec(codec) && wav_format::seal_sizes(&mut data) {
            log::debug!("Sealed WAV header ({} bytes)", data.len());
        }

        Ok(RecordingArtifact::new(codec, data, duration_secs))
    }
}
