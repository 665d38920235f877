/// Channel layout of a capture or render stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn channel_count(&self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

/// PCM sample encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleEncoding {
    /// Unsigned 8-bit PCM, silence at 128.
    Pcm8,
    /// Signed 16-bit little-endian PCM.
    Pcm16,
}

impl SampleEncoding {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Self::Pcm8 => 1,
            Self::Pcm16 => 2,
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bytes_per_sample() as u16 * 8
    }
}

/// Factor between the block size and the capture device allocation.
pub const CAPTURE_ALLOCATION_FACTOR: usize = 3;

/// Concrete stream parameters derived from an [`AudioConfig`].
///
/// Produced once per `init`; a new `init` resolves a fresh value.
///
/// [`AudioConfig`]: super::config::AudioConfig
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFormat {
    pub sample_rate_hz: u32,
    pub input_layout: ChannelLayout,
    pub output_layout: ChannelLayout,
    pub encoding: SampleEncoding,
    /// Bytes requested per capture read.
    pub capture_buffer_bytes: usize,
    /// Bytes handed to the render device per write.
    pub render_buffer_bytes: usize,
}

impl ResolvedFormat {
    /// Bytes per interleaved frame on the capture side.
    pub fn frame_bytes(&self) -> usize {
        self.encoding.bytes_per_sample() * self.input_layout.channel_count() as usize
    }

    /// Size the capture device is allocated with, absorbing read/write jitter.
    pub fn capture_allocation_bytes(&self) -> usize {
        self.capture_buffer_bytes * CAPTURE_ALLOCATION_FACTOR
    }

    /// Duration of audio held in one block, in milliseconds.
    pub fn block_duration_ms(&self) -> f64 {
        let bytes_per_sec = self.sample_rate_hz as f64 * self.frame_bytes() as f64;
        if bytes_per_sec == 0.0 {
            return 0.0;
        }
        self.capture_buffer_bytes as f64 * 1000.0 / bytes_per_sec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn format(rate: u32, layout: ChannelLayout, encoding: SampleEncoding, bytes: usize) -> ResolvedFormat {
        ResolvedFormat {
            sample_rate_hz: rate,
            input_layout: layout,
            output_layout: layout,
            encoding,
            capture_buffer_bytes: bytes,
            render_buffer_bytes: bytes,
        }
    }

    #[test]
    fn frame_bytes_by_layout_and_encoding() {
        assert_eq!(format(16000, ChannelLayout::Mono, SampleEncoding::Pcm16, 0).frame_bytes(), 2);
        assert_eq!(format(16000, ChannelLayout::Stereo, SampleEncoding::Pcm16, 0).frame_bytes(), 4);
        assert_eq!(format(16000, ChannelLayout::Stereo, SampleEncoding::Pcm8, 0).frame_bytes(), 2);
    }

    #[test]
    fn capture_allocation_is_triple_block() {
        let f = format(44100, ChannelLayout::Mono, SampleEncoding::Pcm16, 3528);
        assert_eq!(f.capture_allocation_bytes(), 3528 * 3);
    }

    #[test]
    fn block_duration() {
        // 16 kHz mono 16-bit = 32000 bytes/s; 3200 bytes = 100ms
        let f = format(16000, ChannelLayout::Mono, SampleEncoding::Pcm16, 3200);
        assert_relative_eq!(f.block_duration_ms(), 100.0);

        let stereo = format(48000, ChannelLayout::Stereo, SampleEncoding::Pcm16, 1920);
        assert_relative_eq!(stereo.block_duration_ms(), 10.0);
    }
}
