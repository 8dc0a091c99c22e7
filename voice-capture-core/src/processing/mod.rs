pub mod chunk_encoder;
pub mod fft_analyser;
pub mod pcm;
pub mod ring_buffer;
pub mod spectrum;
pub mod synthetic_wave;
pub mod taps;
pub mod wav_format;
