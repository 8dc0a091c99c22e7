use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::CaptureError;
use crate::processing::pcm;
use crate::processing::wav_format::{self, PCM_BIT_DEPTH};
use crate::session::broker::InputHandle;
use crate::traits::encoder::{ChunkCallback, ChunkedEncoder, EncoderErrorCallback, EncoderFactory, EncoderOutput};
use crate::traits::input_device::{InputStream, TapId};

/// Codec reported by the PCM encoder.
///
/// Chunks carry a streaming header; the assembled artifact gets its real
/// sizes from `RecordingBuffer::assemble`.
pub const PCM_CODEC: &str = "audio/wav";

/// State shared between the capture tap and the encoder owner.
struct Emitter {
    pending: Vec<u8>,
    header_sent: bool,
    sample_rate: Option<u32>,
    chunk_interval: Duration,
    chunk_bytes: usize,
    on_chunk: ChunkCallback,
    on_error: EncoderErrorCallback,
}

impl Emitter {
    fn push(&mut self, samples: &[f32], sample_rate: u32) {
        match self.sample_rate {
            None => {
                self.sample_rate = Some(sample_rate);
                let frames = sample_rate as u128 * self.chunk_interval.as_millis() / 1000;
                self.chunk_bytes = (frames as usize * (PCM_BIT_DEPTH / 8) as usize).max(1);
            }
            Some(rate) if rate != sample_rate => {
                (self.on_error)(format!("sample rate changed from {} to {} Hz", rate, sample_rate));
                return;
            }
            Some(_) => {}
        }

        pcm::extend_int16_pcm(&mut self.pending, samples);
        if self.pending.len() >= self.chunk_bytes {
            self.emit();
        }
    }

    /// Take everything pending as one chunk. The first chunk carries the header.
    fn take_chunk(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            return None;
        }
        let body = std::mem::take(&mut self.pending);
        if self.header_sent {
            return Some(body);
        }
        self.header_sent = true;
        let header = wav_format::pcm_header(self.sample_rate.unwrap_or(0), 1, None);
        let mut chunk = Vec::with_capacity(header.len() + body.len());
        chunk.extend_from_slice(&header);
        chunk.extend_from_slice(&body);
        Some(chunk)
    }

    fn emit(&mut self) {
        if let Some(chunk) = self.take_chunk() {
            (self.on_chunk)(chunk);
        }
    }
}

/// Chunked encoder producing a streamed 16-bit mono WAV.
///
/// Samples arrive through a tap on the input stream. Once a chunk interval's
/// worth of audio is buffered it is handed to the chunk callback. The
/// sample clock drives emission, so no timer thread is involved.
pub struct PcmChunkEncoder {
    stream: Arc<dyn InputStream>,
    tap: Option<TapId>,
    emitter: Arc<Mutex<Option<Emitter>>>,
    codec: Option<String>,
}

impl PcmChunkEncoder {
    pub fn new(stream: Arc<dyn InputStream>) -> Self {
        Self {
            stream,
            tap: None,
            emitter: Arc::new(Mutex::new(None)),
            codec: None,
        }
    }

    fn detach(&mut self) {
        if let Some(tap) = self.tap.take() {
            self.stream.remove_tap(tap);
        }
    }
}

impl ChunkedEncoder for PcmChunkEncoder {
    fn is_type_supported(&self, codec: &str) -> bool {
        wav_format::is_wav_codec(codec)
    }

    fn begin(
        &mut self,
        codec: Option<&str>,
        chunk_interval: Duration,
        on_chunk: ChunkCallback,
        on_error: EncoderErrorCallback,
    ) -> Result<String, CaptureError> {
        if self.tap.is_some() {
            return Err(CaptureError::EncoderError("encoder already started".into()));
        }
        if !self.stream.is_live() {
            return Err(CaptureError::EncoderError("input stream has ended".into()));
        }
        if chunk_interval.is_zero() {
            return Err(CaptureError::EncoderError("chunk interval must be positive".into()));
        }
        let codec = match codec {
            Some(requested) if !self.is_type_supported(requested) => {
                return Err(CaptureError::EncoderError(format!("unsupported codec: {}", requested)));
            }
            Some(requested) => requested.to_string(),
            None => PCM_CODEC.to_string(),
        };

        *self.emitter.lock() = Some(Emitter {
            pending: Vec::new(),
            header_sent: false,
            sample_rate: None,
            chunk_interval,
            chunk_bytes: usize::MAX,
            on_chunk,
            on_error,
        });

        let emitter = Arc::clone(&self.emitter);
        self.tap = Some(self.stream.add_tap(Arc::new(move |samples: &[f32], sample_rate: u32| {
            if let Some(ref mut e) = *emitter.lock() {
                e.push(samples, sample_rate);
            }
        })));

        log::debug!("PCM encoder started ({}, {:?} chunks)", codec, chunk_interval);
        self.codec = Some(codec.clone());
        Ok(codec)
    }

    fn request_data(&mut self) {
        if let Some(ref mut e) = *self.emitter.lock() {
            e.emit();
        }
    }

    fn finalize(&mut self) -> Result<EncoderOutput, CaptureError> {
        let codec = self
            .codec
            .take()
            .ok_or_else(|| CaptureError::EncoderError("encoder was never started".into()))?;
        self.detach();

        let mut emitter = self
            .emitter
            .lock()
            .take()
            .ok_or_else(|| CaptureError::EncoderError("encoder state missing".into()))?;
        let trailing_chunks = emitter.take_chunk().into_iter().collect();

        Ok(EncoderOutput { codec, trailing_chunks })
    }
}

impl Drop for PcmChunkEncoder {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Builds a `PcmChunkEncoder` on the stream behind a handle.
#[derive(Debug, Default, Clone, Copy)]
pub struct PcmEncoderFactory;

impl EncoderFactory for PcmEncoderFactory {
    fn create_encoder(&self, handle: &InputHandle) -> Result<Box<dyn ChunkedEncoder>, CaptureError> {
        Ok(Box::new(PcmChunkEncoder::new(Arc::clone(handle.stream()))))
    }
}
