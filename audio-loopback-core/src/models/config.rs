use serde::Deserialize;

use super::error::{LoopbackError, LoopbackResult};

/// Default capture sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: i32 = 44100;

/// Default linear gain applied to captured audio.
pub const DEFAULT_GAIN_FACTOR: f32 = 15.0;

/// Input source requested from the platform capture stack.
///
/// Numbered the way hosts pass it over the bridge. Unknown numbers fall back
/// to `VoiceRecognition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(from = "i32")]
pub enum AudioSourceKind {
    Default,
    Mic,
    VoiceUplink,
    VoiceDownlink,
    VoiceCall,
    Camcorder,
    #[default]
    VoiceRecognition,
    VoiceCommunication,
    RemoteSubmix,
    Unprocessed,
    VoicePerformance,
}

impl AudioSourceKind {
    /// Maps a host source number, returning `None` when it is unrecognized.
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::Default,
            1 => Self::Mic,
            2 => Self::VoiceUplink,
            3 => Self::VoiceDownlink,
            4 => Self::VoiceCall,
            5 => Self::Camcorder,
            6 => Self::VoiceRecognition,
            7 => Self::VoiceCommunication,
            8 => Self::RemoteSubmix,
            9 => Self::Unprocessed,
            10 => Self::VoicePerformance,
            _ => return None,
        })
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Default => 0,
            Self::Mic => 1,
            Self::VoiceUplink => 2,
            Self::VoiceDownlink => 3,
            Self::VoiceCall => 4,
            Self::Camcorder => 5,
            Self::VoiceRecognition => 6,
            Self::VoiceCommunication => 7,
            Self::RemoteSubmix => 8,
            Self::Unprocessed => 9,
            Self::VoicePerformance => 10,
        }
    }
}

impl From<i32> for AudioSourceKind {
    fn from(code: i32) -> Self {
        Self::from_code(code).unwrap_or_else(|| {
            log::warn!("unknown audio source {}, using voice recognition", code);
            Self::VoiceRecognition
        })
    }
}

/// Options supplied by the host when initializing a session.
///
/// Field names on the wire follow the host option names (`sampleRate`,
/// `channels`, `bitsPerSample`, `audioSource`, `bufferSize`). Values are kept
/// as the host sent them; [`AudioFormatResolver`] decides what they mean.
///
/// [`AudioFormatResolver`]: crate::processing::format_resolver::AudioFormatResolver
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 44100). Must be positive.
    pub sample_rate: i32,

    /// Channel count (default: 1). Valid values: 1, 2.
    pub channels: i32,

    /// Bits per sample (default: 16). Valid values: 8, 16.
    pub bits_per_sample: i32,

    /// Capture input source (default: voice recognition).
    pub audio_source: AudioSourceKind,

    /// Lower bound for the block size in bytes, raised to the platform minimum.
    pub buffer_size: Option<i32>,

    /// Linear gain multiplier (default: 15.0).
    pub gain_factor: f32,

    /// Stop streaming once no external output route is attached (default: true).
    pub monitor_external_output: bool,
}

impl AudioConfig {
    /// Parses the host option payload.
    pub fn from_json(json: &str) -> LoopbackResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| LoopbackError::InvalidConfig(format!("malformed options: {}", e)))
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 1,
            bits_per_sample: 16,
            audio_source: AudioSourceKind::default(),
            buffer_size: None,
            gain_factor: DEFAULT_GAIN_FACTOR,
            monitor_external_output: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_uses_defaults() {
        let config = AudioConfig::from_json("{}").unwrap();
        assert_eq!(config, AudioConfig::default());
        assert_eq!(config.audio_source, AudioSourceKind::VoiceRecognition);
    }

    #[test]
    fn host_option_names_are_recognized() {
        let config = AudioConfig::from_json(
            r#"{"sampleRate":16000,"channels":2,"bitsPerSample":8,"audioSource":1,"bufferSize":4096}"#,
        )
        .unwrap();

        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.channels, 2);
        assert_eq!(config.bits_per_sample, 8);
        assert_eq!(config.audio_source, AudioSourceKind::Mic);
        assert_eq!(config.buffer_size, Some(4096));
        assert!(config.monitor_external_output);
    }

    #[test]
    fn unknown_audio_source_falls_back() {
        let config = AudioConfig::from_json(r#"{"audioSource":99}"#).unwrap();
        assert_eq!(config.audio_source, AudioSourceKind::VoiceRecognition);
    }

    #[test]
    fn unrelated_host_keys_are_ignored() {
        let config = AudioConfig::from_json(r#"{"wavFile":"a.wav","sampleRate":8000}"#).unwrap();
        assert_eq!(config.sample_rate, 8000);
    }

    #[test]
    fn malformed_payload_is_invalid_config() {
        let err = AudioConfig::from_json(r#"{"sampleRate":"fast"}"#).unwrap_err();
        assert!(matches!(err, LoopbackError::InvalidConfig(_)));
    }

    #[test]
    fn source_codes_round_trip() {
        for code in 0..=10 {
            let kind = AudioSourceKind::from_code(code).unwrap();
            assert_eq!(kind.code(), code);
        }
        assert_eq!(AudioSourceKind::from_code(11), None);
    }
}
