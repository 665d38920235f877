//! COM apartment handling shared by every WASAPI call site.

use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_MULTITHREADED};

use crate::error::WasapiError;

/// RAII guard for a multithreaded COM apartment on the current thread.
///
/// Uninitializes on drop only if this guard's `CoInitializeEx` succeeded.
/// `RPC_E_CHANGED_MODE` (the host already picked STA) is accepted and left
/// alone.
pub(crate) struct ComScope {
    owned: bool,
}

impl ComScope {
    pub(crate) fn enter() -> Result<Self, WasapiError> {
        const RPC_E_CHANGED_MODE: i32 = 0x80010106u32 as i32;

        let hr = unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) };
        if hr.is_ok() {
            Ok(Self { owned: true })
        } else if hr.0 == RPC_E_CHANGED_MODE {
            Ok(Self { owned: false })
        } else {
            Err(WasapiError::call("CoInitializeEx", hr.message()))
        }
    }
}

impl Drop for ComScope {
    fn drop(&mut self) {
        if self.owned {
            unsafe {
                CoUninitialize();
            }
        }
    }
}
