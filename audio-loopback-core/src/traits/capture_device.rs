use crate::models::error::LoopbackResult;

/// A platform microphone stream opened for one session.
///
/// Created by [`AudioPlatform::open_capture`], started by the controller and
/// then moved onto the block loop thread, which is the only caller of
/// [`read`](CaptureDevice::read) and the one that stops it.
///
/// [`AudioPlatform::open_capture`]: super::platform::AudioPlatform::open_capture
pub trait CaptureDevice: Send {
    /// Begin delivering audio.
    fn start(&mut self) -> LoopbackResult<()>;

    /// Blocking read of up to `buf.len()` bytes of PCM.
    ///
    /// `Ok(0)` means no data this iteration. An `Err` is a transient I/O
    /// failure and ends the session.
    fn read(&mut self, buf: &mut [u8]) -> LoopbackResult<usize>;

    /// Stop delivering audio and release the endpoint.
    fn stop(&mut self) -> LoopbackResult<()>;
}
