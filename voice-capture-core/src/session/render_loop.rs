use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::models::config::FRAME_INTERVAL;
use crate::models::error::CaptureError;
use crate::processing::synthetic_wave::SyntheticWaveform;
use crate::session::analysis::SpectralAnalysisEngine;
use crate::session::liveness::Liveness;
use crate::traits::surface::{RenderFrame, RenderSurface, SurfaceGeometry};

/// What one tick ended up drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Live spectral bars.
    Bars,
    /// The synthetic idle waveform.
    Waveform,
    /// The analyser read failed; nothing was drawn.
    Skipped,
}

/// Everything a tick touches. Lives behind the tick gate.
struct Renderer {
    surface: Box<dyn RenderSurface>,
    engine: Option<SpectralAnalysisEngine>,
    wave: SyntheticWaveform,
    target_height: u32,
}

impl Renderer {
    fn tick(&mut self) -> TickOutcome {
        if let Some(engine) = self.engine.as_mut().filter(|e| e.is_live()) {
            return match engine.next_frame() {
                Some(frame) => {
                    self.surface.render(RenderFrame::Bars(frame), self.target_height);
                    TickOutcome::Bars
                }
                None => TickOutcome::Skipped,
            };
        }

        let geometry = self.surface.geometry();
        let points = self.wave.sample(geometry.css_width, geometry.css_height);
        self.surface.render(RenderFrame::Waveform(points), self.target_height);
        self.wave.advance();
        TickOutcome::Waveform
    }
}

/// Drives a render surface at roughly 60 Hz.
///
/// Draws live bars while an engine bound to a live stream is attached, the
/// synthetic waveform otherwise. Ticks run on a named background thread
/// started by `start`; `tick` runs one frame on the caller's thread.
///
/// Every tick, resize and message goes through the same lock (the tick
/// gate), so they never interleave.
pub struct VisualizationRenderLoop {
    renderer: Arc<Mutex<Renderer>>,
    liveness: Arc<Liveness>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl VisualizationRenderLoop {
    pub fn new(surface: Box<dyn RenderSurface>, target_height: u32) -> Self {
        Self {
            renderer: Arc::new(Mutex::new(Renderer {
                surface,
                engine: None,
                wave: SyntheticWaveform::new(),
                target_height,
            })),
            liveness: Arc::new(Liveness::new()),
            worker: Mutex::new(None),
        }
    }

    /// Attach an engine. From the next tick on, bars replace the waveform.
    pub fn bind(&self, engine: SpectralAnalysisEngine) {
        self.renderer.lock().engine = Some(engine);
    }

    /// Detach the engine, handing it back to the caller.
    pub fn unbind(&self) -> Option<SpectralAnalysisEngine> {
        self.renderer.lock().engine.take()
    }

    /// Rescale the surface. The animation phase carries over.
    pub fn resize(&self, geometry: SurfaceGeometry) {
        self.renderer.lock().surface.resize(geometry);
    }

    pub fn show_message(&self, message: &str) {
        self.renderer.lock().surface.show_message(message);
    }

    /// Current phase of the synthetic waveform.
    pub fn phase(&self) -> f64 {
        self.renderer.lock().wave.phase()
    }

    /// Render one frame now.
    pub fn tick(&self) -> TickOutcome {
        self.renderer.lock().tick()
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Start ticking every `FRAME_INTERVAL` on a background thread.
    ///
    /// No-op when already running.
    pub fn start(&self) -> Result<(), CaptureError> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        let token = self.liveness.token();
        let renderer = Arc::clone(&self.renderer);
        let liveness = Arc::clone(&self.liveness);

        let handle = thread::Builder::new()
            .name("visualizer-render".into())
            .spawn(move || loop {
                {
                    let mut r = renderer.lock();
                    if !liveness.is_current(token) {
                        break;
                    }
                    r.tick();
                }
                thread::sleep(FRAME_INTERVAL);
            })
            .map_err(|e| CaptureError::ConfigurationFailed(format!("failed to spawn render thread: {}", e)))?;

        *worker = Some(handle);
        log::debug!("Render loop started");
        Ok(())
    }

    /// Stop ticking.
    ///
    /// Waits for an in-flight tick to finish; once this returns the surface
    /// receives no further frames from the background thread.
    pub fn cancel(&self) {
        self.liveness.revoke();
        // acquiring the gate waits out any tick already past its token check
        drop(self.renderer.lock());

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                log::error!("Render thread panicked");
            }
            log::debug!("Render loop cancelled");
        }
    }
}

impl Drop for VisualizationRenderLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}
