use crate::models::error::LoopbackResult;

/// A platform output stream paired with a [`CaptureDevice`].
///
/// [`CaptureDevice`]: super::capture_device::CaptureDevice
pub trait RenderDevice: Send {
    /// Begin playback.
    fn start(&mut self) -> LoopbackResult<()>;

    /// Blocking write of a processed block. Returns the bytes accepted.
    fn write(&mut self, data: &[u8]) -> LoopbackResult<usize>;

    /// Stop playback and release the endpoint.
    fn stop(&mut self) -> LoopbackResult<()>;

    /// Set stream volume, 0.0–1.0. Devices without volume control ignore it.
    fn set_volume(&mut self, _volume: f32) -> LoopbackResult<()> {
        Ok(())
    }
}
