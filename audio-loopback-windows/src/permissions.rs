//! Windows microphone privacy permission check.
//!
//! On Windows 10 1803+, microphone access is controlled by the privacy
//! settings at Settings > Privacy > Microphone. Desktop apps are generally
//! allowed unless the user has disabled the global toggle.

use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use crate::com::ComScope;
use crate::error::WasapiError;

const E_ACCESSDENIED: i32 = 0x80070005u32 as i32;
const AUDCLNT_E_DEVICE_IN_USE: i32 = 0x8889000Au32 as i32;

/// Check if microphone access is available.
///
/// Attempts to activate the default capture device. `Ok(false)` means the
/// privacy settings deny access; an exclusive-mode conflict is
/// `WasapiError::DeviceInUse`.
pub fn check_microphone_permission() -> Result<bool, WasapiError> {
    let _com = ComScope::enter()?;
    unsafe { check_mic_access_inner() }
}

unsafe fn check_mic_access_inner() -> Result<bool, WasapiError> {
    let enumerator: IMMDeviceEnumerator = CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
        .map_err(|e| WasapiError::call("CoCreateInstance(MMDeviceEnumerator)", e))?;

    let device = match enumerator.GetDefaultAudioEndpoint(eCapture, eConsole) {
        Ok(d) => d,
        Err(_) => return Err(WasapiError::NoEndpoint),
    };

    let result: windows::core::Result<IAudioClient> = device.Activate(CLSCTX_ALL, None);

    match result {
        Ok(_) => Ok(true),
        Err(e) => {
            let code = e.code().0;
            if code == E_ACCESSDENIED {
                Ok(false)
            } else if code == AUDCLNT_E_DEVICE_IN_USE {
                Err(WasapiError::DeviceInUse)
            } else {
                log::warn!("Unexpected error checking mic permission: {}", e);
                Ok(true)
            }
        }
    }
}
