//! Windows audio device enumeration via the MMDevice API.
//!
//! Wraps `IMMDeviceEnumerator` to list active render endpoints and classify
//! them as built-in or external outputs.

use windows::core::PROPVARIANT;
use windows::Win32::Devices::FunctionDiscovery::*;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;
use windows::Win32::UI::Shell::PropertiesSystem::{IPropertyStore, PROPERTYKEY};

use audio_loopback_core::models::route::OutputDevice;

use crate::classify::classify_output;
use crate::error::WasapiError;

// PKEY_AudioEndpoint_FormFactor = {1da5d803-d492-4edd-8c23-e0c0ffee7f0e}, 0
const PKEY_AUDIOENDPOINT_FORMFACTOR: PROPERTYKEY = PROPERTYKEY {
    fmtid: windows::core::GUID::from_u128(0x1da5d803_d492_4edd_8c23_e0c0ffee7f0e),
    pid: 0,
};

/// Audio device enumerator using the Windows MMDevice API.
pub struct DeviceEnumerator {
    enumerator: IMMDeviceEnumerator,
}

impl DeviceEnumerator {
    /// Create a new device enumerator.
    ///
    /// Requires COM to be initialized on the calling thread.
    pub fn new() -> Result<Self, WasapiError> {
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                    .map_err(|e| WasapiError::call("CoCreateInstance(MMDeviceEnumerator)", e))?;
            Ok(Self { enumerator })
        }
    }

    /// List active render (output) devices with their route classification.
    pub fn list_output_devices(&self) -> Result<Vec<OutputDevice>, WasapiError> {
        unsafe {
            let collection = self
                .enumerator
                .EnumAudioEndpoints(eRender, DEVICE_STATE_ACTIVE)
                .map_err(|e| WasapiError::call("EnumAudioEndpoints", e))?;

            let count = collection
                .GetCount()
                .map_err(|e| WasapiError::call("GetCount", e))?;

            let mut devices = Vec::new();
            for i in 0..count {
                let device = match collection.Item(i) {
                    Ok(d) => d,
                    Err(_) => continue,
                };

                let id = match device.GetId() {
                    Ok(id) => id.to_string().unwrap_or_default(),
                    Err(_) => continue,
                };

                let Ok(store) = device.OpenPropertyStore(STGM_READ) else {
                    devices.push(OutputDevice::new(id, format!("Device {}", i), classify_output(None, "")));
                    continue;
                };

                let name = read_string(&store, &PKEY_Device_FriendlyName)
                    .unwrap_or_else(|| format!("Device {}", i));
                let enumerator_name = read_string(&store, &PKEY_Device_EnumeratorName).unwrap_or_default();
                let form_factor = read_u32(&store, &PKEY_AUDIOENDPOINT_FORMFACTOR);

                devices.push(OutputDevice::new(
                    id,
                    name,
                    classify_output(form_factor, &enumerator_name),
                ));
            }

            Ok(devices)
        }
    }

    /// Resolve an endpoint by ID, or the default endpoint for `flow`/`role`.
    pub fn endpoint(
        &self,
        flow: EDataFlow,
        role: ERole,
        device_id: Option<&str>,
    ) -> Result<IMMDevice, WasapiError> {
        unsafe {
            match device_id {
                Some(id) => {
                    let wide_id: Vec<u16> = id.encode_utf16().chain(std::iter::once(0)).collect();
                    self.enumerator
                        .GetDevice(windows::core::PCWSTR(wide_id.as_ptr()))
                        .map_err(|_| WasapiError::NoEndpoint)
                }
                None => self
                    .enumerator
                    .GetDefaultAudioEndpoint(flow, role)
                    .map_err(|_| WasapiError::NoEndpoint),
            }
        }
    }
}

fn read_string(store: &IPropertyStore, key: &PROPERTYKEY) -> Option<String> {
    let value: PROPVARIANT = unsafe { store.GetValue(key) }.ok()?;
    let text = value.to_string();
    (!text.is_empty()).then_some(text)
}

fn read_u32(store: &IPropertyStore, key: &PROPERTYKEY) -> Option<u32> {
    let value: PROPVARIANT = unsafe { store.GetValue(key) }.ok()?;
    u32::try_from(&value).ok()
}
