//! Mapping of endpoint properties onto [`OutputDeviceKind`].

use audio_loopback_core::models::route::OutputDeviceKind;

/// `EndpointFormFactor` values reported by `PKEY_AudioEndpoint_FormFactor`.
pub mod form_factor {
    pub const REMOTE_NETWORK_DEVICE: u32 = 0;
    pub const SPEAKERS: u32 = 1;
    pub const LINE_LEVEL: u32 = 2;
    pub const HEADPHONES: u32 = 3;
    pub const MICROPHONE: u32 = 4;
    pub const HEADSET: u32 = 5;
    pub const HANDSET: u32 = 6;
    pub const UNKNOWN_DIGITAL_PASSTHROUGH: u32 = 7;
    pub const SPDIF: u32 = 8;
    pub const DIGITAL_AUDIO_DISPLAY_DEVICE: u32 = 9;
    pub const UNKNOWN: u32 = 10;
}

/// Classify a render endpoint from its form factor and enumerator name
/// (`PKEY_Device_EnumeratorName`, e.g. "BTHENUM", "USB", "HDAUDIO").
///
/// Bluetooth headsets use the hands-free profile (SCO); other Bluetooth
/// outputs are A2DP.
pub fn classify_output(form_factor: Option<u32>, enumerator_name: &str) -> OutputDeviceKind {
    let enumerator = enumerator_name.to_ascii_uppercase();
    let bluetooth = enumerator.contains("BTHENUM") || enumerator.contains("BTHLEENUM");
    let usb = enumerator.contains("USB");

    match (form_factor, bluetooth, usb) {
        (Some(form_factor::HEADSET) | Some(form_factor::HANDSET), true, _) => OutputDeviceKind::BluetoothSco,
        (_, true, _) => OutputDeviceKind::BluetoothA2dp,
        (Some(form_factor::HEADSET), _, true) | (Some(form_factor::HEADPHONES), _, true) => {
            OutputDeviceKind::UsbDevice
        }
        (_, _, true) => OutputDeviceKind::UsbAccessory,
        (Some(form_factor::HEADPHONES), _, _) => OutputDeviceKind::WiredHeadphones,
        (Some(form_factor::HEADSET), _, _) => OutputDeviceKind::WiredHeadset,
        (Some(form_factor::HANDSET), _, _) => OutputDeviceKind::BuiltinEarpiece,
        (Some(form_factor::SPEAKERS), _, _) => OutputDeviceKind::BuiltinSpeaker,
        (Some(form_factor::DIGITAL_AUDIO_DISPLAY_DEVICE), _, _) => OutputDeviceKind::Hdmi,
        (Some(form_factor::LINE_LEVEL) | Some(form_factor::SPDIF), _, _) => OutputDeviceKind::LineOut,
        _ => OutputDeviceKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analog_jacks() {
        assert_eq!(
            classify_output(Some(form_factor::HEADPHONES), "HDAUDIO"),
            OutputDeviceKind::WiredHeadphones
        );
        assert_eq!(
            classify_output(Some(form_factor::HEADSET), "HDAUDIO"),
            OutputDeviceKind::WiredHeadset
        );
        assert_eq!(
            classify_output(Some(form_factor::SPEAKERS), "HDAUDIO"),
            OutputDeviceKind::BuiltinSpeaker
        );
    }

    #[test]
    fn bluetooth_profiles() {
        assert_eq!(
            classify_output(Some(form_factor::HEADPHONES), "BTHENUM"),
            OutputDeviceKind::BluetoothA2dp
        );
        assert_eq!(
            classify_output(Some(form_factor::HEADSET), "BTHENUM"),
            OutputDeviceKind::BluetoothSco
        );
        assert_eq!(classify_output(None, "bthleenum"), OutputDeviceKind::BluetoothA2dp);
    }

    #[test]
    fn usb_outputs() {
        assert_eq!(
            classify_output(Some(form_factor::HEADSET), "USB"),
            OutputDeviceKind::UsbDevice
        );
        assert_eq!(
            classify_output(Some(form_factor::SPEAKERS), "USB"),
            OutputDeviceKind::UsbAccessory
        );
    }

    #[test]
    fn non_external_outputs() {
        assert_eq!(
            classify_output(Some(form_factor::DIGITAL_AUDIO_DISPLAY_DEVICE), "HDAUDIO"),
            OutputDeviceKind::Hdmi
        );
        assert_eq!(classify_output(Some(form_factor::SPDIF), "HDAUDIO"), OutputDeviceKind::LineOut);
        assert_eq!(classify_output(None, ""), OutputDeviceKind::Unknown);
        assert!(!classify_output(Some(form_factor::SPEAKERS), "HDAUDIO").is_external());
    }
}
