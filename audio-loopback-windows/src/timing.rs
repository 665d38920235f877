//! Conversions between byte/frame counts and WASAPI `REFERENCE_TIME`
//! (100-nanosecond units).

/// 100-nanosecond units per second.
pub const HNS_PER_SEC: u64 = 10_000_000;

/// Duration in 100ns units that holds `bytes` at `bytes_per_sec`, rounded up.
pub fn bytes_to_hns(bytes: usize, bytes_per_sec: u32) -> i64 {
    let per_sec = u64::from(bytes_per_sec.max(1));
    let hns = (bytes as u64).saturating_mul(HNS_PER_SEC).div_ceil(per_sec);
    i64::try_from(hns).unwrap_or(i64::MAX)
}

/// Frames in a `period_hns` engine period at `sample_rate_hz`, rounded up.
///
/// Never less than one frame.
pub fn period_to_frames(period_hns: i64, sample_rate_hz: u32) -> usize {
    let period = u64::try_from(period_hns).unwrap_or(0);
    let frames = period
        .saturating_mul(u64::from(sample_rate_hz))
        .div_ceil(HNS_PER_SEC);
    usize::try_from(frames).unwrap_or(usize::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_up_to_next_unit() {
        // 16 kHz mono 16-bit
        assert_eq!(bytes_to_hns(32_000, 32_000), HNS_PER_SEC as i64);
        assert_eq!(bytes_to_hns(3840, 32_000), 1_200_000);
        assert_eq!(bytes_to_hns(1, 32_000), 313);
        assert_eq!(bytes_to_hns(0, 32_000), 0);
    }

    #[test]
    fn zero_rate_does_not_divide_by_zero() {
        assert_eq!(bytes_to_hns(10, 0), 10 * HNS_PER_SEC as i64);
    }

    #[test]
    fn default_period_to_frames() {
        // 10 ms engine period
        assert_eq!(period_to_frames(100_000, 48_000), 480);
        assert_eq!(period_to_frames(100_000, 44_100), 441);
        assert_eq!(period_to_frames(100_000, 22_050), 221);
    }

    #[test]
    fn degenerate_period_is_one_frame() {
        assert_eq!(period_to_frames(0, 48_000), 1);
        assert_eq!(period_to_frames(-5, 48_000), 1);
    }
}
