//! cpal microphone capture.
//!
//! A cpal `Stream` cannot leave the thread that built it, so every opened
//! input lives on its own capture thread. The thread builds the stream,
//! reports back, and parks until the stream is stopped. Samples are
//! converted to mono `f32` in the cpal callback and fanned out to taps.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, SizedSample, Stream, StreamConfig, StreamError};
use parking_lot::Mutex;

use voice_capture_core::models::audio_models::{AudioSource, TrackInfo, TrackState};
use voice_capture_core::models::error::CaptureError;
use voice_capture_core::processing::pcm;
use voice_capture_core::processing::taps::TapSet;
use voice_capture_core::traits::input_device::{InputDevice, InputStream, SampleCallback, TapId};

use crate::device_enumerator::DeviceEnumerator;
use crate::permissions::looks_like_denial;

/// How often the parked capture thread rechecks its running flag.
const PARK_INTERVAL: Duration = Duration::from_millis(100);

/// Microphone capability backed by cpal.
///
/// Each `request_input` opens a fresh stream; share it through a
/// `DeviceStreamBroker`.
pub struct CpalMicrophone {
    device_name: Option<String>,
}

impl CpalMicrophone {
    /// Capture from the system default microphone.
    pub fn default_device() -> Self {
        Self { device_name: None }
    }

    /// Capture from a specific microphone by name.
    pub fn with_device(name: String) -> Self {
        Self {
            device_name: Some(name),
        }
    }
}

impl InputDevice for CpalMicrophone {
    fn request_input(&self) -> Result<Arc<dyn InputStream>, CaptureError> {
        let stream = CpalInputStream::open(self.device_name.clone())?;
        Ok(stream)
    }

    fn device_info(&self) -> AudioSource {
        let enumerator = DeviceEnumerator::new();
        let default_name = enumerator.default_input_name();
        let name = self
            .device_name
            .clone()
            .or_else(|| default_name.clone())
            .unwrap_or_else(|| "Default Microphone".into());
        AudioSource {
            id: name.clone(),
            is_default: self.device_name.is_none() || default_name.as_deref() == Some(name.as_str()),
            name,
        }
    }
}

/// One open cpal input stream.
pub struct CpalInputStream {
    taps: Arc<TapSet>,
    live: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    track: TrackInfo,
    capture_thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CpalInputStream {
    fn open(device_name: Option<String>) -> Result<Arc<Self>, CaptureError> {
        let taps = Arc::new(TapSet::new());
        let live = Arc::new(AtomicBool::new(true));
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<TrackInfo, CaptureError>>();

        let thread_taps = Arc::clone(&taps);
        let thread_live = Arc::clone(&live);
        let thread_running = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("cpal-mic-capture".into())
            .spawn(move || {
                let stream = match build_stream(device_name.as_deref(), thread_taps, Arc::clone(&thread_live)) {
                    Ok((stream, track)) => {
                        let _ = ready_tx.send(Ok(track));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while thread_running.load(Ordering::SeqCst) {
                    thread::park_timeout(PARK_INTERVAL);
                }

                drop(stream);
                thread_live.store(false, Ordering::SeqCst);
                log::debug!("Microphone capture thread finished");
            })
            .map_err(|e| {
                log::error!("Failed to spawn capture thread: {}", e);
                CaptureError::DeviceUnavailable
            })?;

        let track = match ready_rx.recv() {
            Ok(Ok(track)) => track,
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => {
                let _ = handle.join();
                return Err(CaptureError::DeviceUnavailable);
            }
        };

        log::info!(
            "Microphone '{}' open: {} Hz, {} channel(s)",
            track.label,
            track.sample_rate,
            track.channels
        );

        Ok(Arc::new(Self {
            taps,
            live,
            running,
            track,
            capture_thread: Mutex::new(Some(handle)),
        }))
    }
}

impl InputStream for CpalInputStream {
    fn is_live(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.live.load(Ordering::SeqCst)
    }

    fn tracks(&self) -> Vec<TrackInfo> {
        let mut track = self.track.clone();
        track.state = if self.is_live() { TrackState::Live } else { TrackState::Ended };
        vec![track]
    }

    fn add_tap(&self, callback: SampleCallback) -> TapId {
        self.taps.add(callback)
    }

    fn remove_tap(&self, tap: TapId) {
        self.taps.remove(tap);
    }

    fn stop_tracks(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.taps.clear();

        if let Some(handle) = self.capture_thread.lock().take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                log::error!("Microphone capture thread panicked");
            }
        }
        log::info!("Microphone '{}' stopped", self.track.label);
    }
}

impl Drop for CpalInputStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

impl fmt::Debug for CpalInputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpalInputStream")
            .field("label", &self.track.label)
            .field("live", &self.is_live())
            .field("taps", &self.taps.len())
            .finish()
    }
}

/// Build and start the cpal stream. Runs on the capture thread.
fn build_stream(
    device_name: Option<&str>,
    taps: Arc<TapSet>,
    live: Arc<AtomicBool>,
) -> Result<(Stream, TrackInfo), CaptureError> {
    let device = DeviceEnumerator::new().find_input_device(device_name)?;
    let label = device.name().unwrap_or_else(|_| "Microphone".into());

    let supported = device.default_input_config().map_err(|e| classify("input config", &e))?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();

    // any stream error ends the track; consumers see it through `is_live`
    let on_error = move |err: StreamError| {
        log::error!("Microphone stream error: {}", err);
        live.store(false, Ordering::SeqCst);
    };

    let stream = match sample_format {
        SampleFormat::F32 => build_typed::<f32>(&device, &config, taps, |s| s, on_error),
        SampleFormat::I16 => build_typed::<i16>(&device, &config, taps, pcm::i16_to_f32, on_error),
        SampleFormat::U16 => build_typed::<u16>(&device, &config, taps, pcm::u16_to_f32, on_error),
        other => {
            log::warn!("Unsupported microphone sample format: {:?}", other);
            return Err(CaptureError::DeviceUnavailable);
        }
    }?;

    stream.play().map_err(|e| classify("start stream", &e))?;

    let track = TrackInfo {
        id: format!("{}#{:?}", label, sample_format),
        label,
        sample_rate: config.sample_rate.0,
        channels: config.channels,
        state: TrackState::Live,
    };
    Ok((stream, track))
}

fn build_typed<T>(
    device: &Device,
    config: &StreamConfig,
    taps: Arc<TapSet>,
    convert: fn(T) -> f32,
    on_error: impl FnMut(StreamError) + Send + 'static,
) -> Result<Stream, CaptureError>
where
    T: SizedSample + Send + 'static,
{
    let channels = config.channels as usize;
    let sample_rate = config.sample_rate.0;
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if taps.is_empty() {
                    return;
                }
                scratch.clear();
                scratch.extend(data.iter().map(|&s| convert(s)));
                let mono = pcm::downmix_to_mono(&scratch, channels);
                taps.dispatch(&mono, sample_rate);
            },
            on_error,
            None,
        )
        .map_err(|e| classify("build stream", &e))
}

/// Map a cpal failure to the capture error callers can act on.
fn classify(stage: &str, error: &dyn fmt::Display) -> CaptureError {
    let message = error.to_string();
    log::warn!("Microphone {} failed: {}", stage, message);
    if looks_like_denial(&message) {
        CaptureError::PermissionDenied
    } else {
        CaptureError::DeviceUnavailable
    }
}
