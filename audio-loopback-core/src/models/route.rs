use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the host event carrying a [`RouteChangeEvent`].
pub const ROUTE_CHANGE_EVENT: &str = "onAudioRouteChange";

/// Kind of an enumerated audio output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputDeviceKind {
    BuiltinSpeaker,
    BuiltinEarpiece,
    WiredHeadphones,
    WiredHeadset,
    BluetoothA2dp,
    BluetoothSco,
    UsbDevice,
    UsbAccessory,
    Hdmi,
    LineOut,
    Unknown,
}

impl OutputDeviceKind {
    /// Whether this kind counts as an external output route.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::WiredHeadphones
                | Self::WiredHeadset
                | Self::BluetoothA2dp
                | Self::BluetoothSco
                | Self::UsbDevice
                | Self::UsbAccessory
        )
    }
}

/// An output device reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDevice {
    pub id: String,
    pub name: String,
    pub kind: OutputDeviceKind,
}

impl OutputDevice {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: OutputDeviceKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }
}

/// Snapshot of the external output route. Never cached across queries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatus {
    pub attached: bool,
    /// External kinds currently present.
    pub device_kinds: BTreeSet<OutputDeviceKind>,
}

impl RouteStatus {
    /// Classifies an enumeration result.
    pub fn from_devices(devices: &[OutputDevice]) -> Self {
        let device_kinds: BTreeSet<_> = devices
            .iter()
            .map(|d| d.kind)
            .filter(OutputDeviceKind::is_external)
            .collect();
        Self {
            attached: !device_kinds.is_empty(),
            device_kinds,
        }
    }

    /// Status reported when the platform cannot enumerate outputs.
    pub fn detached() -> Self {
        Self::default()
    }
}

/// Why the route changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteChangeReason {
    Unplugged,
}

impl RouteChangeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unplugged => "unplugged",
        }
    }
}

/// Notification delivered to the host when streaming halts on route loss.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteChangeEvent {
    pub reason: RouteChangeReason,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

impl RouteChangeEvent {
    pub fn unplugged(session_id: &str) -> Self {
        Self {
            reason: RouteChangeReason::Unplugged,
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speaker_only_is_detached() {
        let devices = [
            OutputDevice::new("spk", "Speaker", OutputDeviceKind::BuiltinSpeaker),
            OutputDevice::new("ear", "Earpiece", OutputDeviceKind::BuiltinEarpiece),
        ];
        let status = RouteStatus::from_devices(&devices);
        assert!(!status.attached);
        assert!(status.device_kinds.is_empty());
    }

    #[test]
    fn each_external_kind_attaches() {
        for kind in [
            OutputDeviceKind::WiredHeadphones,
            OutputDeviceKind::WiredHeadset,
            OutputDeviceKind::BluetoothA2dp,
            OutputDeviceKind::BluetoothSco,
            OutputDeviceKind::UsbDevice,
            OutputDeviceKind::UsbAccessory,
        ] {
            let devices = [
                OutputDevice::new("spk", "Speaker", OutputDeviceKind::BuiltinSpeaker),
                OutputDevice::new("ext", "External", kind),
            ];
            let status = RouteStatus::from_devices(&devices);
            assert!(status.attached, "{:?} should attach", kind);
            assert_eq!(status.device_kinds.len(), 1);
            assert!(status.device_kinds.contains(&kind));
        }
    }

    #[test]
    fn hdmi_and_line_out_are_not_external() {
        let devices = [
            OutputDevice::new("hdmi", "Display", OutputDeviceKind::Hdmi),
            OutputDevice::new("line", "Line Out", OutputDeviceKind::LineOut),
            OutputDevice::new("x", "Mystery", OutputDeviceKind::Unknown),
        ];
        assert!(!RouteStatus::from_devices(&devices).attached);
    }

    #[test]
    fn event_serializes_for_host() {
        let event = RouteChangeEvent::unplugged("abc");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["reason"], "unplugged");
        assert_eq!(json["sessionId"], "abc");
        assert!(json["timestamp"].is_string());
    }
}
