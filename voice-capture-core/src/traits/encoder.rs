use std::sync::Arc;
use std::time::Duration;

use crate::models::error::CaptureError;
use crate::session::broker::InputHandle;

/// Receives each encoded chunk, in emission order.
pub type ChunkCallback = Arc<dyn Fn(Vec<u8>) + Send + Sync + 'static>;

/// Receives errors the encoder hits while capturing.
pub type EncoderErrorCallback = Arc<dyn Fn(String) + Send + Sync + 'static>;

/// What `finalize` hands back: the codec actually used and any chunks that
/// were still buffered when the encoder stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderOutput {
    pub codec: String,
    pub trailing_chunks: Vec<Vec<u8>>,
}

/// Chunked encoder capability bound to one input stream.
pub trait ChunkedEncoder: Send {
    fn is_type_supported(&self, codec: &str) -> bool;

    /// Start capturing. `codec = None` lets the encoder use its default.
    ///
    /// Returns the codec the encoder settled on.
    fn begin(
        &mut self,
        codec: Option<&str>,
        chunk_interval: Duration,
        on_chunk: ChunkCallback,
        on_error: EncoderErrorCallback,
    ) -> Result<String, CaptureError>;

    /// Emit whatever is buffered right now as a chunk.
    fn request_data(&mut self);

    /// Stop capturing and flush.
    fn finalize(&mut self) -> Result<EncoderOutput, CaptureError>;
}

/// Creates encoders for input handles.
pub trait EncoderFactory: Send + Sync {
    fn create_encoder(&self, handle: &InputHandle) -> Result<Box<dyn ChunkedEncoder>, CaptureError>;
}
