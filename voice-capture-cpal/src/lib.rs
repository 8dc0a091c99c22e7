//! # voice-capture-cpal
//!
//! cpal microphone backend for voice-capture-kit.
//!
//! Provides:
//! - `CpalMicrophone`: `InputDevice` that opens cpal input streams
//! - `DeviceEnumerator`: input device listing on the default host
//! - `permissions`: microphone availability probe
//!
//! ## Platform Requirements
//! - Linux: ALSA development headers (`libasound2-dev`)
//! - macOS / Windows: no extra requirements
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use voice_capture_cpal::CpalMicrophone;
//! use voice_capture_core::DeviceStreamBroker;
//!
//! let broker = Arc::new(DeviceStreamBroker::new(Arc::new(CpalMicrophone::default_device())));
//! let handle = broker.acquire()?;
//! ```

pub mod device_enumerator;
pub mod microphone;
pub mod permissions;

pub use device_enumerator::DeviceEnumerator;
pub use microphone::{CpalInputStream, CpalMicrophone};
pub use permissions::check_microphone_permission;
