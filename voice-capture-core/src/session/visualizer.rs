use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::models::config::VisualizerConfig;
use crate::models::error::CaptureError;
use crate::session::analysis::SpectralAnalysisEngine;
use crate::session::broker::{DeviceStreamBroker, InputHandle};
use crate::session::render_loop::VisualizationRenderLoop;
use crate::traits::analyser::AnalyserFactory;
use crate::traits::surface::{RenderSurface, SurfaceGeometry};

/// Lifecycle of a visualizer's microphone connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualizerStatus {
    /// Not opened yet.
    Idle,
    /// Waiting for the broker; the synthetic waveform is shown.
    Pending,
    /// Bound to the live stream; bars are shown.
    Ready,
    /// Acquisition or analysis setup failed. `open` may be called again.
    Error(CaptureError),
    /// Torn down. Terminal.
    Closed,
}

struct Shared {
    status: VisualizerStatus,
    handle: Option<InputHandle>,
}

/// A self-contained waveform widget.
///
/// Owns a render loop and one broker reference. `open` starts the idle
/// animation and asks the broker for the microphone on a background
/// thread; `close` stops rendering and gives the reference back.
pub struct WaveformVisualizer {
    broker: Arc<DeviceStreamBroker>,
    analysers: Arc<dyn AnalyserFactory>,
    config: VisualizerConfig,
    render: Arc<VisualizationRenderLoop>,
    shared: Arc<Mutex<Shared>>,
}

impl WaveformVisualizer {
    pub fn new(
        broker: Arc<DeviceStreamBroker>,
        analysers: Arc<dyn AnalyserFactory>,
        surface: Box<dyn RenderSurface>,
        config: VisualizerConfig,
    ) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        let render = Arc::new(VisualizationRenderLoop::new(surface, config.height_px));
        Ok(Self {
            broker,
            analysers,
            config,
            render,
            shared: Arc::new(Mutex::new(Shared {
                status: VisualizerStatus::Idle,
                handle: None,
            })),
        })
    }

    pub fn status(&self) -> VisualizerStatus {
        self.shared.lock().status.clone()
    }

    pub fn render_loop(&self) -> &VisualizationRenderLoop {
        &self.render
    }

    pub fn resize(&self, geometry: SurfaceGeometry) {
        self.render.resize(geometry);
    }

    /// Start animating and request the microphone.
    ///
    /// Returns immediately; the outcome shows up in `status()`. Calling it
    /// again after an `Error` retries the acquisition.
    pub fn open(&self) -> Result<(), CaptureError> {
        {
            let mut shared = self.shared.lock();
            match shared.status {
                VisualizerStatus::Idle => {}
                VisualizerStatus::Error(ref error) => log::info!("Retrying microphone after: {}", error),
                _ => {
                    log::warn!("Visualizer already opened");
                    return Ok(());
                }
            }
            shared.status = VisualizerStatus::Pending;
        }
        self.render.start()?;

        let broker = Arc::clone(&self.broker);
        let analysers = Arc::clone(&self.analysers);
        let render = Arc::clone(&self.render);
        let shared = Arc::clone(&self.shared);
        let bar_count = self.config.bar_count;

        thread::Builder::new()
            .name("visualizer-acquire".into())
            .spawn(move || {
                let outcome = broker.acquire();
                Self::on_acquired(&broker, &analysers, &render, &shared, bar_count, outcome);
            })
            .map_err(|e| CaptureError::ConfigurationFailed(format!("failed to spawn acquire thread: {}", e)))?;
        Ok(())
    }

    fn on_acquired(
        broker: &DeviceStreamBroker,
        analysers: &Arc<dyn AnalyserFactory>,
        render: &VisualizationRenderLoop,
        shared: &Mutex<Shared>,
        bar_count: usize,
        outcome: Result<InputHandle, CaptureError>,
    ) {
        let mut s = shared.lock();
        if s.status == VisualizerStatus::Closed {
            if let Ok(handle) = outcome {
                log::debug!("Visualizer closed before input arrived; releasing");
                broker.release(handle);
            }
            return;
        }

        let handle = match outcome {
            Ok(handle) => handle,
            Err(error) => {
                log::warn!("Visualizer could not open the microphone: {}", error);
                if error.is_device_error() {
                    render.cancel();
                    render.show_message(&format!("Microphone error: {}", error));
                }
                s.status = VisualizerStatus::Error(error);
                return;
            }
        };

        let mut engine = SpectralAnalysisEngine::new(Arc::clone(analysers));
        match engine.start(&handle, bar_count) {
            Ok(()) => {
                render.bind(engine);
                s.handle = Some(handle);
                s.status = VisualizerStatus::Ready;
                log::info!("Visualizer live");
            }
            Err(error) => {
                // keep the idle animation; the microphone is not needed
                log::warn!("Visualizer analysis unavailable: {}", error);
                broker.release(handle);
                s.status = VisualizerStatus::Error(error);
            }
        }
    }

    /// Stop rendering and release the microphone reference.
    ///
    /// A handle still in flight is released as soon as it arrives.
    pub fn close(&self) {
        let handle = {
            let mut s = self.shared.lock();
            if s.status == VisualizerStatus::Closed {
                return;
            }
            s.status = VisualizerStatus::Closed;
            s.handle.take()
        };

        self.render.cancel();
        if let Some(mut engine) = self.render.unbind() {
            engine.stop();
        }
        if let Some(handle) = handle {
            self.broker.release(handle);
        }
        log::debug!("Visualizer closed");
    }
}

impl Drop for WaveformVisualizer {
    fn drop(&mut self) {
        self.close();
    }
}
