//! # audio-loopback-core
//!
//! Platform-agnostic live audio loopback core library.
//!
//! Captures microphone blocks, applies a fixed gain, and renders them to an
//! output device on a dedicated thread, halting when the external output
//! route (headphones, headset, Bluetooth, USB) disappears. Platform backends
//! (Windows WASAPI) implement the `AudioPlatform` trait and plug into the
//! generic `LoopbackController`.
//!
//! ## Architecture
//!
//! ```text
//! audio-loopback-core (this crate)
//! ├── traits/         ← AudioPlatform, CaptureDevice, RenderDevice, RouteChangeSink
//! ├── models/         ← AudioConfig, ResolvedFormat, RouteStatus, LoopState, LoopbackError
//! ├── processing/     ← GainProcessor, AudioFormatResolver, RingBuffer
//! ├── route_monitor   ← RouteMonitor
//! ├── session/        ← CaptureRenderLoop, LoopbackController
//! └── mock            ← MockPlatform (scripted in-memory devices)
//! ```

pub mod mock;
pub mod models;
pub mod processing;
pub mod route_monitor;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::{AudioConfig, AudioSourceKind};
pub use models::error::{LoopbackError, LoopbackResult};
pub use models::format::{ChannelLayout, ResolvedFormat, SampleEncoding};
pub use models::route::{
    OutputDevice, OutputDeviceKind, RouteChangeEvent, RouteChangeReason, RouteStatus, ROUTE_CHANGE_EVENT,
};
pub use models::state::{LoopDiagnostics, LoopState};
pub use processing::format_resolver::{AudioFormatResolver, ResolutionPolicy};
pub use processing::gain::GainProcessor;
pub use processing::ring_buffer::{BlockingRingBuffer, RingBuffer};
pub use route_monitor::RouteMonitor;
pub use session::block_loop::{CaptureRenderLoop, LoopExit, WARMUP_BLOCKS};
pub use session::controller::LoopbackController;
pub use traits::capture_device::CaptureDevice;
pub use traits::platform::AudioPlatform;
pub use traits::render_device::RenderDevice;
pub use traits::route_sink::RouteChangeSink;
