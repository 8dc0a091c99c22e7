use std::io::{self, Write};

use serde::Serialize;

use voice_capture_core::traits::surface::{bar_pixel_heights, WavePoint};
use voice_capture_core::{
    AudioSource, CaptureError, RecordingArtifact, RecordingDelegate, RecordingState, RenderFrame,
    RenderSurface, SurfaceGeometry,
};

/// Glyphs from lowest to tallest.
const LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render surface drawing one line of block glyphs on stderr.
///
/// One column per bar, or one column per waveform point. The line is
/// redrawn in place.
pub struct TerminalSurface {
    geometry: SurfaceGeometry,
}

impl TerminalSurface {
    /// `columns` is treated as the CSS width, one column per two pixels.
    pub fn new(columns: u16, height_px: u32) -> Self {
        Self {
            geometry: SurfaceGeometry::new(columns as f64 * 2.0, height_px as f64, 1.0),
        }
    }

    fn draw_line(&self, line: &str) {
        let mut err = io::stderr().lock();
        let _ = write!(err, "\r{}\x1b[K", line);
        let _ = err.flush();
    }
}

fn glyph(fraction: f64) -> char {
    let index = (fraction.clamp(0.0, 1.0) * (LEVELS.len() - 1) as f64).round() as usize;
    LEVELS[index]
}

impl RenderSurface for TerminalSurface {
    fn geometry(&self) -> SurfaceGeometry {
        self.geometry
    }

    fn resize(&mut self, geometry: SurfaceGeometry) {
        self.geometry = geometry;
    }

    fn render(&mut self, frame: RenderFrame<'_>, target_height: u32) {
        let height = target_height.max(1) as f64;
        let line: String = match frame {
            RenderFrame::Bars(frame) => bar_pixel_heights(frame, target_height)
                .into_iter()
                .map(|px| glyph(px / height))
                .collect(),
            // y grows downwards; the centre line is half the height
            RenderFrame::Waveform(points) => points
                .iter()
                .map(|WavePoint { y, .. }| glyph(1.0 - y / height))
                .collect(),
        };
        self.draw_line(&line);
    }

    fn show_message(&mut self, message: &str) {
        self.draw_line(message);
        eprintln!();
    }
}

/// RecordingDelegate that reports session events as log lines, or as JSON
/// events on stdout for scripting.
pub struct ConsoleDelegate {
    json: bool,
}

impl ConsoleDelegate {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn emit<T: Serialize>(&self, event: &str, payload: T) {
        if !self.json {
            return;
        }
        let envelope = EventEnvelope { event, payload };
        match serde_json::to_string(&envelope) {
            Ok(line) => println!("{}", line),
            Err(e) => log::warn!("Failed to serialize {} event: {}", event, e),
        }
    }
}

// -- Event payloads --

#[derive(Serialize)]
struct EventEnvelope<'a, T> {
    event: &'a str,
    payload: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateChangedPayload {
    state: &'static str,
    elapsed_secs: f64,
}

#[derive(Serialize)]
struct ErrorPayload {
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordingFinishedPayload<'a> {
    artifact_id: &'a str,
    codec: &'a str,
    size_bytes: usize,
    duration_secs: f64,
    checksum: &'a str,
}

impl RecordingDelegate for ConsoleDelegate {
    fn on_state_changed(&self, state: &RecordingState) {
        log::info!("Recording state: {}", state.name());
        self.emit(
            "recording://state-changed",
            StateChangedPayload {
                state: state.name(),
                elapsed_secs: state.elapsed().unwrap_or(0.0),
            },
        );
    }

    fn on_elapsed_updated(&self, elapsed_secs: f64) {
        // whole seconds only, the timer fires ten times a second
        let tenths = (elapsed_secs * 10.0).round() as u64;
        if tenths % 10 == 0 {
            log::info!("Recording {:.0}s", elapsed_secs);
        }
    }

    fn on_error(&self, error: &CaptureError) {
        log::error!("Recording error: {}", error);
        self.emit(
            "recording://error",
            ErrorPayload {
                message: error.to_string(),
            },
        );
    }

    fn on_recording_finished(&self, artifact: &RecordingArtifact) {
        log::info!(
            "Recording finished: {} bytes of {} over {:.1}s",
            artifact.size(),
            artifact.codec,
            artifact.duration_secs
        );
        self.emit(
            "recording://finished",
            RecordingFinishedPayload {
                artifact_id: &artifact.id,
                codec: &artifact.codec,
                size_bytes: artifact.size(),
                duration_secs: artifact.duration_secs,
                checksum: &artifact.checksum,
            },
        );
    }
}

/// Serializable view of an input device.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

impl From<AudioSource> for DeviceInfo {
    fn from(src: AudioSource) -> Self {
        Self {
            id: src.id,
            name: src.name,
            is_default: src.is_default,
        }
    }
}
