//! # audio-loopback-windows
//!
//! Windows WASAPI backend for audio-loopback-core.
//!
//! Provides:
//! - `WindowsPlatform`: [`AudioPlatform`] over shared-mode WASAPI endpoints
//! - `WasapiCaptureDevice`: microphone capture into a jitter ring buffer
//! - `WasapiRenderDevice`: playback of processed blocks
//! - `DeviceEnumerator`: output enumeration via the MMDevice API
//! - `permissions`: Windows microphone privacy check
//!
//! Output classification ([`classify`]), the error mapping ([`error`]) and
//! duration arithmetic ([`timing`]) build on every target so they can be
//! tested off Windows.
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use audio_loopback_core::{AudioConfig, LoopbackController};
//! use audio_loopback_windows::WindowsPlatform;
//!
//! let mut controller = LoopbackController::new(Arc::new(WindowsPlatform::new()));
//! controller.init(AudioConfig::default())?;
//! controller.start()?;
//! ```
//!
//! [`AudioPlatform`]: audio_loopback_core::AudioPlatform

pub mod classify;
pub mod error;
pub mod timing;

#[cfg(target_os = "windows")]
mod com;
#[cfg(target_os = "windows")]
pub mod device_enumerator;
#[cfg(target_os = "windows")]
pub mod permissions;
#[cfg(target_os = "windows")]
pub mod platform;
#[cfg(target_os = "windows")]
mod stream;
#[cfg(target_os = "windows")]
pub mod wasapi_capture;
#[cfg(target_os = "windows")]
pub mod wasapi_render;

pub use classify::classify_output;
pub use error::WasapiError;

#[cfg(target_os = "windows")]
pub use device_enumerator::DeviceEnumerator;
#[cfg(target_os = "windows")]
pub use platform::WindowsPlatform;
#[cfg(target_os = "windows")]
pub use wasapi_capture::WasapiCaptureDevice;
#[cfg(target_os = "windows")]
pub use wasapi_render::WasapiRenderDevice;
