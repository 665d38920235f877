//! [`AudioPlatform`] over WASAPI.

use std::cell::RefCell;
use std::ops::RangeInclusive;

use windows::Win32::Media::Audio::*;

use audio_loopback_core::models::config::AudioSourceKind;
use audio_loopback_core::models::error::{LoopbackError, LoopbackResult};
use audio_loopback_core::models::format::{ChannelLayout, ResolvedFormat, SampleEncoding};
use audio_loopback_core::models::route::OutputDevice;
use audio_loopback_core::traits::capture_device::CaptureDevice;
use audio_loopback_core::traits::platform::AudioPlatform;
use audio_loopback_core::traits::render_device::RenderDevice;

use crate::com::ComScope;
use crate::device_enumerator::DeviceEnumerator;
use crate::error::WasapiError;
use crate::permissions::check_microphone_permission;
use crate::stream::{capture_role, default_period_hns};
use crate::timing::period_to_frames;
use crate::wasapi_capture::WasapiCaptureDevice;
use crate::wasapi_render::WasapiRenderDevice;

/// Rates the shared-mode engine converts to and from.
const SUPPORTED_RATES: RangeInclusive<u32> = 4_000..=192_000;

thread_local! {
    /// Enumerator kept alive on each thread that polls outputs, dropped before
    /// its COM apartment when the thread exits.
    static OUTPUT_ENUMERATOR: RefCell<Option<(DeviceEnumerator, ComScope)>> = const { RefCell::new(None) };
}

/// Run `f` with this thread's cached enumerator, creating it on first use.
///
/// A failed call discards the cache so the next poll starts fresh.
fn with_output_enumerator<T>(
    f: impl FnOnce(&DeviceEnumerator) -> Result<T, WasapiError>,
) -> Result<T, WasapiError> {
    OUTPUT_ENUMERATOR.with(|cell| {
        let mut cached = cell.borrow_mut();
        if cached.is_none() {
            let com = ComScope::enter()?;
            *cached = Some((DeviceEnumerator::new()?, com));
        }
        let result = match cached.as_ref() {
            Some((enumerator, _)) => f(enumerator),
            None => Err(WasapiError::NoEndpoint),
        };
        if result.is_err() {
            *cached = None;
        }
        result
    })
}

/// WASAPI-backed platform using the default endpoints unless IDs are set.
#[derive(Debug, Clone, Default)]
pub struct WindowsPlatform {
    capture_device_id: Option<String>,
    render_device_id: Option<String>,
}

impl WindowsPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture from a specific endpoint instead of the default for the source.
    pub fn with_capture_device(mut self, id: impl Into<String>) -> Self {
        self.capture_device_id = Some(id.into());
        self
    }

    /// Render to a specific endpoint instead of the default console output.
    pub fn with_render_device(mut self, id: impl Into<String>) -> Self {
        self.render_device_id = Some(id.into());
        self
    }

    fn probe(&self, flow: EDataFlow, role: ERole, id: Option<&str>) -> Result<i64, WasapiError> {
        let _com = ComScope::enter()?;
        let enumerator = DeviceEnumerator::new()?;
        let device = enumerator.endpoint(flow, role, id)?;
        default_period_hns(&device)
    }
}

impl AudioPlatform for WindowsPlatform {
    fn min_capture_buffer_bytes(
        &self,
        sample_rate_hz: u32,
        layout: ChannelLayout,
        encoding: SampleEncoding,
    ) -> LoopbackResult<usize> {
        if !SUPPORTED_RATES.contains(&sample_rate_hz) {
            return Err(LoopbackError::InvalidConfig(format!(
                "sample rate {} Hz is not supported",
                sample_rate_hz
            )));
        }

        let period = self.probe(eCapture, eConsole, self.capture_device_id.as_deref())?;

        let frame_bytes = layout.channel_count() as usize * encoding.bytes_per_sample();
        Ok(period_to_frames(period, sample_rate_hz) * frame_bytes)
    }

    fn open_capture(
        &self,
        format: &ResolvedFormat,
        source: AudioSourceKind,
    ) -> LoopbackResult<Box<dyn CaptureDevice>> {
        match check_microphone_permission() {
            Ok(true) => {}
            Ok(false) => return Err(WasapiError::AccessDenied.into()),
            Err(e) => return Err(e.into()),
        }

        self.probe(eCapture, capture_role(source), self.capture_device_id.as_deref())?;
        log::debug!("opening capture for {:?} at {} Hz", source, format.sample_rate_hz);

        Ok(Box::new(WasapiCaptureDevice::new(
            self.capture_device_id.clone(),
            *format,
            source,
        )))
    }

    fn open_render(&self, format: &ResolvedFormat) -> LoopbackResult<Box<dyn RenderDevice>> {
        self.probe(eRender, eConsole, self.render_device_id.as_deref())?;
        Ok(Box::new(WasapiRenderDevice::new(self.render_device_id.clone(), *format)))
    }

    fn output_devices(&self) -> Option<Vec<OutputDevice>> {
        match with_output_enumerator(DeviceEnumerator::list_output_devices) {
            Ok(devices) => Some(devices),
            Err(e) => {
                log::warn!("output enumeration failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_is_populated() -> bool {
        OUTPUT_ENUMERATOR.with(|cell| cell.borrow().is_some())
    }

    #[test]
    fn output_polling_reuses_thread_enumerator() {
        std::thread::spawn(|| {
            assert!(!cache_is_populated());
            let platform = WindowsPlatform::new();

            let first = platform.output_devices();
            assert_eq!(cache_is_populated(), first.is_some());

            let second = platform.output_devices();
            assert_eq!(cache_is_populated(), second.is_some());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn failed_call_clears_cache() {
        std::thread::spawn(|| {
            let result: Result<(), WasapiError> = with_output_enumerator(|_| Err(WasapiError::Closed));
            assert!(result.is_err());
            assert!(!cache_is_populated());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn unsupported_rate_is_rejected_before_probing() {
        let err = WindowsPlatform::new()
            .min_capture_buffer_bytes(1_000, ChannelLayout::Mono, SampleEncoding::Pcm16)
            .unwrap_err();
        assert!(matches!(err, LoopbackError::InvalidConfig(_)));
    }
}
