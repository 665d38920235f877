use crate::models::config::AudioSourceKind;
use crate::models::error::LoopbackResult;
use crate::models::format::{ChannelLayout, ResolvedFormat, SampleEncoding};
use crate::models::route::OutputDevice;

use super::capture_device::CaptureDevice;
use super::render_device::RenderDevice;

/// Interface to a platform audio stack.
///
/// Implemented by:
/// - `WindowsPlatform` (WASAPI)
/// - [`MockPlatform`](crate::mock::MockPlatform) for tests and headless hosts
pub trait AudioPlatform: Send + Sync {
    /// Smallest capture block, in bytes, the platform can sustain for this format.
    ///
    /// Fails with `InvalidConfig` if the platform rejects the format.
    fn min_capture_buffer_bytes(
        &self,
        sample_rate_hz: u32,
        layout: ChannelLayout,
        encoding: SampleEncoding,
    ) -> LoopbackResult<usize>;

    /// Open a capture stream whose internal buffer holds
    /// `format.capture_allocation_bytes()`.
    ///
    /// Fails with `DeviceUnavailable` when the device cannot be granted,
    /// whether from a denied permission or an exclusive-access conflict.
    fn open_capture(
        &self,
        format: &ResolvedFormat,
        source: AudioSourceKind,
    ) -> LoopbackResult<Box<dyn CaptureDevice>>;

    /// Open a render stream buffered to `format.render_buffer_bytes`.
    fn open_render(&self, format: &ResolvedFormat) -> LoopbackResult<Box<dyn RenderDevice>>;

    /// Enumerate active output devices.
    ///
    /// `None` when the platform cannot enumerate outputs at all.
    fn output_devices(&self) -> Option<Vec<OutputDevice>>;
}
