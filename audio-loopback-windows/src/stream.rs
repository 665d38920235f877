//! Shared-mode `IAudioClient` setup for PCM streams.

use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::CLSCTX_ALL;

use audio_loopback_core::models::config::AudioSourceKind;
use audio_loopback_core::models::format::{ChannelLayout, ResolvedFormat};

use crate::error::WasapiError;
use crate::timing::bytes_to_hns;

/// WAVE_FORMAT_PCM - Standard PCM audio format
const WAVE_FORMAT_PCM: u16 = 1;

/// Build the PCM wave format the loop exchanges with the device.
pub(crate) fn pcm_wave_format(format: &ResolvedFormat, layout: ChannelLayout) -> WAVEFORMATEX {
    let channels = layout.channel_count();
    let bits = format.encoding.bits_per_sample();
    let block_align = channels * bits / 8;
    WAVEFORMATEX {
        wFormatTag: WAVE_FORMAT_PCM,
        nChannels: channels,
        nSamplesPerSec: format.sample_rate_hz,
        nAvgBytesPerSec: format.sample_rate_hz * block_align as u32,
        nBlockAlign: block_align,
        wBitsPerSample: bits,
        cbSize: 0,
    }
}

/// Endpoint role for a capture source.
pub(crate) fn capture_role(source: AudioSourceKind) -> ERole {
    match source {
        AudioSourceKind::VoiceCall
        | AudioSourceKind::VoiceUplink
        | AudioSourceKind::VoiceDownlink
        | AudioSourceKind::VoiceCommunication => eCommunications,
        _ => eConsole,
    }
}

/// Buffer duration, in 100ns units, that holds `bytes` of `wave`.
pub(crate) fn buffer_duration_hns(bytes: usize, wave: &WAVEFORMATEX) -> i64 {
    bytes_to_hns(bytes, wave.nAvgBytesPerSec)
}

/// Activate and initialize a shared-mode client, letting the audio engine
/// convert between `wave` and the device mix format.
pub(crate) fn open_shared_client(
    device: &IMMDevice,
    wave: &WAVEFORMATEX,
    buffer_bytes: usize,
) -> Result<IAudioClient, WasapiError> {
    unsafe {
        let client: IAudioClient = device
            .Activate(CLSCTX_ALL, None)
            .map_err(|e| WasapiError::call("IMMDevice::Activate", e))?;

        client
            .Initialize(
                AUDCLNT_SHAREMODE_SHARED,
                AUDCLNT_STREAMFLAGS_NOPERSIST
                    | AUDCLNT_STREAMFLAGS_AUTOCONVERTPCM
                    | AUDCLNT_STREAMFLAGS_SRC_DEFAULT_QUALITY,
                buffer_duration_hns(buffer_bytes, wave),
                0,
                wave,
                None,
            )
            .map_err(|e| WasapiError::call("IAudioClient::Initialize", e))?;

        Ok(client)
    }
}

/// Default engine period of an endpoint, in 100ns units.
pub(crate) fn default_period_hns(device: &IMMDevice) -> Result<i64, WasapiError> {
    unsafe {
        let client: IAudioClient = device
            .Activate(CLSCTX_ALL, None)
            .map_err(|e| WasapiError::call("IMMDevice::Activate", e))?;
        let mut default_period = 0i64;
        client
            .GetDevicePeriod(Some(&mut default_period), None)
            .map_err(|e| WasapiError::call("IAudioClient::GetDevicePeriod", e))?;
        Ok(default_period)
    }
}
