use crate::models::config::AudioConfig;
use crate::models::error::{LoopbackError, LoopbackResult};
use crate::models::format::{ChannelLayout, ResolvedFormat, SampleEncoding};
use crate::traits::platform::AudioPlatform;

/// How unsupported option values are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPolicy {
    /// Unrecognized values fall back to defaults with a warning.
    #[default]
    Permissive,
    /// Unrecognized values fail with `InvalidConfig`.
    Strict,
}

/// Derives concrete capture/render parameters from an [`AudioConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioFormatResolver {
    policy: ResolutionPolicy,
}

impl AudioFormatResolver {
    pub fn new(policy: ResolutionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    /// Resolves with the default permissive policy.
    pub fn resolve<P: AudioPlatform + ?Sized>(
        config: &AudioConfig,
        platform: &P,
    ) -> LoopbackResult<ResolvedFormat> {
        Self::new(ResolutionPolicy::Permissive).resolve_with(config, platform)
    }

    /// Resolves rejecting anything the permissive policy would paper over.
    pub fn resolve_strict<P: AudioPlatform + ?Sized>(
        config: &AudioConfig,
        platform: &P,
    ) -> LoopbackResult<ResolvedFormat> {
        Self::new(ResolutionPolicy::Strict).resolve_with(config, platform)
    }

    pub fn resolve_with<P: AudioPlatform + ?Sized>(
        &self,
        config: &AudioConfig,
        platform: &P,
    ) -> LoopbackResult<ResolvedFormat> {
        if config.sample_rate <= 0 {
            return Err(LoopbackError::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                config.sample_rate
            )));
        }
        let sample_rate_hz = config.sample_rate as u32;

        let layout = match config.channels {
            1 => ChannelLayout::Mono,
            2 => ChannelLayout::Stereo,
            other => self.fallback(
                format!("unsupported channel count: {}", other),
                ChannelLayout::Mono,
            )?,
        };

        let encoding = match config.bits_per_sample {
            8 => SampleEncoding::Pcm8,
            16 => SampleEncoding::Pcm16,
            other => self.fallback(
                format!("unsupported bits per sample: {}", other),
                SampleEncoding::Pcm16,
            )?,
        };

        if !(config.gain_factor.is_finite() && config.gain_factor > 0.0) {
            self.fallback(format!("unsupported gain factor: {}", config.gain_factor), ())?;
        }

        let minimum = platform.min_capture_buffer_bytes(sample_rate_hz, layout, encoding)?;

        let requested = match config.buffer_size {
            Some(size) if size > 0 => size as usize,
            Some(size) => self.fallback(format!("buffer size must be positive, got {}", size), 0)?,
            None => 0,
        };

        let frame = encoding.bytes_per_sample() * layout.channel_count() as usize;
        // A zero-byte block would turn every read into an empty read.
        let block = align_up(minimum.max(requested).max(frame), frame);

        log::debug!(
            "resolved format: {} Hz, {:?}, {:?}, block {} bytes (platform minimum {})",
            sample_rate_hz,
            layout,
            encoding,
            block,
            minimum
        );

        Ok(ResolvedFormat {
            sample_rate_hz,
            input_layout: layout,
            output_layout: layout,
            encoding,
            capture_buffer_bytes: block,
            render_buffer_bytes: block,
        })
    }

    fn fallback<T>(&self, message: String, default: T) -> LoopbackResult<T> {
        match self.policy {
            ResolutionPolicy::Permissive => {
                log::warn!("{}, using default", message);
                Ok(default)
            }
            ResolutionPolicy::Strict => Err(LoopbackError::InvalidConfig(message)),
        }
    }
}

/// Rounds `bytes` up to a whole number of frames.
fn align_up(bytes: usize, frame: usize) -> usize {
    if frame <= 1 {
        return bytes;
    }
    bytes.div_ceil(frame) * frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPlatform;

    fn config(rate: i32, channels: i32, bits: i32) -> AudioConfig {
        AudioConfig {
            sample_rate: rate,
            channels,
            bits_per_sample: bits,
            ..AudioConfig::default()
        }
    }

    #[test]
    fn mono_16k_uses_platform_minimum() {
        let platform = MockPlatform::new().with_min_buffer_bytes(1280);

        let format = AudioFormatResolver::resolve(&config(16000, 1, 16), &platform).unwrap();

        assert_eq!(format.sample_rate_hz, 16000);
        assert_eq!(format.input_layout, ChannelLayout::Mono);
        assert_eq!(format.output_layout, ChannelLayout::Mono);
        assert_eq!(format.encoding, SampleEncoding::Pcm16);
        assert_eq!(format.capture_buffer_bytes, 1280);
        assert_eq!(format.render_buffer_bytes, 1280);
        assert_eq!(format.capture_allocation_bytes(), 3840);
    }

    #[test]
    fn larger_requested_buffer_wins() {
        let platform = MockPlatform::new().with_min_buffer_bytes(1280);
        let mut cfg = config(44100, 2, 16);
        cfg.buffer_size = Some(8192);

        let format = AudioFormatResolver::resolve(&cfg, &platform).unwrap();

        assert_eq!(format.input_layout, ChannelLayout::Stereo);
        assert_eq!(format.capture_buffer_bytes, 8192);
        assert_eq!(format.capture_allocation_bytes(), 8192 * 3);
    }

    #[test]
    fn smaller_requested_buffer_is_raised_to_minimum() {
        let platform = MockPlatform::new().with_min_buffer_bytes(4096);
        let mut cfg = config(44100, 1, 16);
        cfg.buffer_size = Some(512);

        let format = AudioFormatResolver::resolve(&cfg, &platform).unwrap();
        assert_eq!(format.capture_buffer_bytes, 4096);
    }

    #[test]
    fn block_is_frame_aligned() {
        let platform = MockPlatform::new().with_min_buffer_bytes(100);
        let mut cfg = config(48000, 2, 16);
        cfg.buffer_size = Some(4097);

        let format = AudioFormatResolver::resolve(&cfg, &platform).unwrap();
        assert_eq!(format.capture_buffer_bytes, 4100);
    }

    #[test]
    fn zero_platform_minimum_floors_at_one_frame() {
        let platform = MockPlatform::new().with_min_buffer_bytes(0);

        let mono = AudioFormatResolver::resolve(&config(16000, 1, 16), &platform).unwrap();
        assert_eq!(mono.capture_buffer_bytes, 2);
        assert_eq!(mono.render_buffer_bytes, 2);

        let stereo = AudioFormatResolver::resolve(&config(16000, 2, 16), &platform).unwrap();
        assert_eq!(stereo.capture_buffer_bytes, 4);
    }

    #[test]
    fn non_positive_sample_rate_is_rejected() {
        let platform = MockPlatform::new();
        for rate in [0, -44100] {
            let err = AudioFormatResolver::resolve(&config(rate, 1, 16), &platform).unwrap_err();
            assert!(matches!(err, LoopbackError::InvalidConfig(_)));
        }
    }

    #[test]
    fn permissive_falls_back_to_defaults() {
        let platform = MockPlatform::new();
        let mut cfg = config(22050, 6, 24);
        cfg.buffer_size = Some(-1);
        cfg.gain_factor = -2.0;

        let format = AudioFormatResolver::resolve(&cfg, &platform).unwrap();

        assert_eq!(format.input_layout, ChannelLayout::Mono);
        assert_eq!(format.encoding, SampleEncoding::Pcm16);
        assert_eq!(format.capture_buffer_bytes, platform.min_buffer_bytes());
    }

    #[test]
    fn eight_bit_stereo() {
        let platform = MockPlatform::new().with_min_buffer_bytes(1000);
        let format = AudioFormatResolver::resolve(&config(8000, 2, 8), &platform).unwrap();
        assert_eq!(format.encoding, SampleEncoding::Pcm8);
        assert_eq!(format.input_layout, ChannelLayout::Stereo);
        assert_eq!(format.frame_bytes(), 2);
    }

    #[test]
    fn strict_rejects_unsupported_values() {
        let platform = MockPlatform::new();

        let err = AudioFormatResolver::resolve_strict(&config(16000, 3, 16), &platform).unwrap_err();
        assert!(matches!(err, LoopbackError::InvalidConfig(_)));

        let err = AudioFormatResolver::resolve_strict(&config(16000, 1, 12), &platform).unwrap_err();
        assert!(matches!(err, LoopbackError::InvalidConfig(_)));

        let mut cfg = config(16000, 1, 16);
        cfg.buffer_size = Some(0);
        let err = AudioFormatResolver::resolve_strict(&cfg, &platform).unwrap_err();
        assert!(matches!(err, LoopbackError::InvalidConfig(_)));

        let mut cfg = config(16000, 1, 16);
        cfg.gain_factor = f32::INFINITY;
        let err = AudioFormatResolver::resolve_strict(&cfg, &platform).unwrap_err();
        assert!(matches!(err, LoopbackError::InvalidConfig(_)));

        assert!(AudioFormatResolver::resolve_strict(&config(16000, 2, 8), &platform).is_ok());
    }

    #[test]
    fn platform_rejection_propagates() {
        let platform = MockPlatform::new().reject_sample_rate(12345);
        let err = AudioFormatResolver::resolve(&config(12345, 1, 16), &platform).unwrap_err();
        assert!(matches!(err, LoopbackError::InvalidConfig(_)));
    }
}
