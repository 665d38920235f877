use thiserror::Error;

use audio_loopback_core::models::error::LoopbackError;

/// Failures raised by the WASAPI layer before they are mapped for the core.
#[derive(Debug, Error)]
pub enum WasapiError {
    #[error("{call} failed: {message}")]
    Call { call: &'static str, message: String },

    #[error("no audio endpoint available")]
    NoEndpoint,

    #[error("microphone access denied")]
    AccessDenied,

    #[error("capture device in use by an exclusive-mode client")]
    DeviceInUse,

    #[error("stream closed")]
    Closed,
}

impl WasapiError {
    /// Wraps a Windows API error with the name of the failing call.
    pub fn call(call: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Call {
            call,
            message: err.to_string(),
        }
    }
}

impl From<WasapiError> for LoopbackError {
    fn from(err: WasapiError) -> Self {
        match err {
            WasapiError::NoEndpoint | WasapiError::AccessDenied | WasapiError::DeviceInUse => {
                LoopbackError::DeviceUnavailable(err.to_string())
            }
            WasapiError::Closed => LoopbackError::TransientIo(err.to_string()),
            WasapiError::Call { .. } => LoopbackError::DeviceUnavailable(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_core_taxonomy() {
        assert_eq!(
            LoopbackError::from(WasapiError::AccessDenied),
            LoopbackError::DeviceUnavailable("microphone access denied".into())
        );
        assert_eq!(
            LoopbackError::from(WasapiError::DeviceInUse),
            LoopbackError::DeviceUnavailable("capture device in use by an exclusive-mode client".into())
        );
        assert!(matches!(
            LoopbackError::from(WasapiError::NoEndpoint),
            LoopbackError::DeviceUnavailable(_)
        ));
        assert!(matches!(
            LoopbackError::from(WasapiError::Closed),
            LoopbackError::TransientIo(_)
        ));
        let err = WasapiError::call("IAudioClient::Initialize", "0x88890008");
        assert_eq!(err.to_string(), "IAudioClient::Initialize failed: 0x88890008");
    }
}
