use crate::models::config::DEFAULT_GAIN_FACTOR;
use crate::models::format::SampleEncoding;

/// Fixed linear gain stage for captured PCM blocks.
///
/// Operates in place on the caller's buffer and never allocates; it runs once
/// per captured block on the real-time path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainProcessor {
    gain: f32,
}

impl GainProcessor {
    /// Creates a processor. Non-finite or non-positive gains use the default.
    pub fn new(gain: f32) -> Self {
        if gain.is_finite() && gain > 0.0 {
            Self { gain }
        } else {
            Self {
                gain: DEFAULT_GAIN_FACTOR,
            }
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Applies gain to interleaved little-endian signed 16-bit samples.
    ///
    /// A trailing unpaired byte is left untouched.
    pub fn apply_pcm16(&self, block: &mut [u8]) {
        for pair in block.chunks_exact_mut(2) {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            let scaled = self.scale(sample as f32, i16::MIN as f32, i16::MAX as f32) as i16;
            pair.copy_from_slice(&scaled.to_le_bytes());
        }
    }

    /// Applies gain to unsigned 8-bit samples centered at 128.
    pub fn apply_pcm8(&self, block: &mut [u8]) {
        for byte in block.iter_mut() {
            let centered = *byte as f32 - 128.0;
            let scaled = self.scale(centered, -128.0, 127.0);
            *byte = (scaled as i16 + 128) as u8;
        }
    }

    /// Dispatches on the stream encoding.
    pub fn apply(&self, encoding: SampleEncoding, block: &mut [u8]) {
        match encoding {
            SampleEncoding::Pcm16 => self.apply_pcm16(block),
            SampleEncoding::Pcm8 => self.apply_pcm8(block),
        }
    }

    #[inline]
    fn scale(&self, sample: f32, min: f32, max: f32) -> f32 {
        (sample * self.gain).round().clamp(min, max)
    }
}

impl Default for GainProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_GAIN_FACTOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn decode(bytes: &[u8]) -> Vec<i16> {
        bytes
            .chunks_exact(2)
            .map(|p| i16::from_le_bytes([p[0], p[1]]))
            .collect()
    }

    fn expected(s: i16, g: f32) -> i16 {
        (s as f32 * g).round().clamp(-32768.0, 32767.0) as i16
    }

    #[test]
    fn scales_and_saturates() {
        let gain = GainProcessor::new(10.0);
        let input = [0i16, 1, -1, 100, -100, 3276, 3277, -3276, -3277, i16::MAX, i16::MIN];
        let mut block = encode(&input);

        gain.apply_pcm16(&mut block);

        assert_eq!(
            decode(&block),
            vec![0, 10, -10, 1000, -1000, 32760, i16::MAX, -32760, i16::MIN, i16::MAX, i16::MIN]
        );
    }

    #[test]
    fn matches_rounded_clamp_across_range() {
        for g in [1.5f32, 10.0, 12.5, 15.0] {
            let gain = GainProcessor::new(g);
            let input: Vec<i16> = (i16::MIN..=i16::MAX).step_by(97).collect();
            let mut block = encode(&input);

            gain.apply_pcm16(&mut block);

            let want: Vec<i16> = input.iter().map(|&s| expected(s, g)).collect();
            assert_eq!(decode(&block), want, "gain {}", g);
        }
    }

    #[test]
    fn empty_block_is_noop() {
        let mut block: Vec<u8> = Vec::new();
        GainProcessor::default().apply_pcm16(&mut block);
        assert!(block.is_empty());
    }

    #[test]
    fn odd_trailing_byte_untouched() {
        let mut block = encode(&[100, -200]);
        block.push(0x7f);

        GainProcessor::new(2.0).apply_pcm16(&mut block);

        assert_eq!(block.len(), 5);
        assert_eq!(decode(&block[..4]), vec![200, -400]);
        assert_eq!(block[4], 0x7f);
    }

    #[test]
    fn single_byte_block_untouched() {
        let mut block = vec![0xAB];
        GainProcessor::new(15.0).apply_pcm16(&mut block);
        assert_eq!(block, vec![0xAB]);
    }

    #[test]
    fn pcm8_centered_gain() {
        let mut block = vec![128u8, 129, 127, 140, 100, 255, 0];

        GainProcessor::new(10.0).apply_pcm8(&mut block);

        assert_eq!(block, vec![128, 138, 118, 248, 0, 255, 0]);
    }

    #[test]
    fn invalid_gain_uses_default() {
        assert_eq!(GainProcessor::new(0.0).gain(), DEFAULT_GAIN_FACTOR);
        assert_eq!(GainProcessor::new(-3.0).gain(), DEFAULT_GAIN_FACTOR);
        assert_eq!(GainProcessor::new(f32::NAN).gain(), DEFAULT_GAIN_FACTOR);
        assert_eq!(GainProcessor::new(12.0).gain(), 12.0);
    }

    #[test]
    fn apply_dispatches_on_encoding() {
        let gain = GainProcessor::new(2.0);

        let mut wide = encode(&[300]);
        gain.apply(SampleEncoding::Pcm16, &mut wide);
        assert_eq!(decode(&wide), vec![600]);

        let mut narrow = vec![130u8];
        gain.apply(SampleEncoding::Pcm8, &mut narrow);
        assert_eq!(narrow, vec![132]);
    }
}
