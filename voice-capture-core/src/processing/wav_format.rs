//! RIFF/WAVE header for streamed 16-bit PCM.
//!
//! Chunks leave the encoder before the total length is known, so the size
//! fields carry the streaming placeholder `0xFFFFFFFF` that players treat
//! as "read until end of file". `seal_sizes` writes the real sizes once the
//! whole file is assembled.

/// Size of the canonical PCM WAV header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Placeholder written into both size fields of a streamed header.
pub const STREAMING_SIZE: u32 = u32::MAX;

/// Bit depth produced by the chunk encoder.
pub const PCM_BIT_DEPTH: u16 = 16;

/// MIME identifiers that name a WAV file.
pub const WAV_CODECS: [&str; 3] = ["audio/wav", "audio/wave", "audio/x-wav"];

pub fn is_wav_codec(codec: &str) -> bool {
    WAV_CODECS.iter().any(|c| c.eq_ignore_ascii_case(codec))
}

/// Build a 44-byte PCM header.
///
/// `data_size = None` writes the streaming placeholder.
///
/// Layout (little-endian):
/// ```text
/// 0  "RIFF"        4  riff size      8  "WAVE"
/// 12 "fmt "        16 16             20 1 (PCM)
/// 22 channels      24 sample rate    28 byte rate
/// 32 block align   34 bit depth      36 "data"
/// 40 data size
/// ```
pub fn pcm_header(sample_rate: u32, channels: u16, data_size: Option<u32>) -> [u8; WAV_HEADER_SIZE] {
    let block_align = channels * PCM_BIT_DEPTH / 8;
    let byte_rate = sample_rate * block_align as u32;
    let (riff_size, data_size) = match data_size {
        Some(size) => (size.saturating_add(36), size),
        None => (STREAMING_SIZE, STREAMING_SIZE),
    };

    let mut header = [0u8; WAV_HEADER_SIZE];
    let fields: [(usize, &[u8]); 13] = [
        (0, b"RIFF"),
        (4, &riff_size.to_le_bytes()),
        (8, b"WAVE"),
        (12, b"fmt "),
        (16, &16u32.to_le_bytes()),
        (20, &1u16.to_le_bytes()),
        (22, &channels.to_le_bytes()),
        (24, &sample_rate.to_le_bytes()),
        (28, &byte_rate.to_le_bytes()),
        (32, &block_align.to_le_bytes()),
        (34, &PCM_BIT_DEPTH.to_le_bytes()),
        (36, b"data"),
        (40, &data_size.to_le_bytes()),
    ];
    for (offset, bytes) in fields {
        header[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
    header
}

/// Replace streaming placeholder sizes in a complete WAV file.
///
/// Only touches a canonical 44-byte header whose size fields still hold the
/// placeholder. Returns whether the header was rewritten.
pub fn seal_sizes(file: &mut [u8]) -> bool {
    if file.len() < WAV_HEADER_SIZE
        || &file[0..4] != b"RIFF"
        || &file[8..12] != b"WAVE"
        || &file[36..40] != b"data"
        || file[4..8] != STREAMING_SIZE.to_le_bytes()
        || file[40..44] != STREAMING_SIZE.to_le_bytes()
    {
        return false;
    }

    let data_size = u32::try_from(file.len() - WAV_HEADER_SIZE).unwrap_or(STREAMING_SIZE - 36);
    let riff_size = data_size.saturating_add(36);
    file[4..8].copy_from_slice(&riff_size.to_le_bytes());
    file[40..44].copy_from_slice(&data_size.to_le_bytes());
    true
}
