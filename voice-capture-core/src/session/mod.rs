pub mod analysis;
pub mod broker;
pub mod liveness;
pub mod recording;
pub mod recording_driver;
pub mod render_loop;
pub mod visualizer;
