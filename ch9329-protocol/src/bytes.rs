//! Numeric helpers for payload fields

/// Largest relative displacement the chip accepts in one report.
pub const REL_MAX: i32 = 127;
/// Smallest relative displacement. -128 is not used.
pub const REL_MIN: i32 = -127;

/// Clamp a signed displacement into one signed byte, range [-127, 127].
pub fn clamp_signed_byte(v: i32) -> i8 {
    v.clamp(REL_MIN, REL_MAX) as i8
}

/// Like [`clamp_signed_byte`], also reporting whether the value saturated.
pub fn clamp_signed_byte_checked(v: i32) -> (i8, bool) {
    let clamped = clamp_signed_byte(v);
    (clamped, i32::from(clamped) != v)
}

/// Split a 16-bit value into `(low, high)`, low byte first on the wire.
pub fn split_low_high(v: u16) -> (u8, u8) {
    ((v & 0xFF) as u8, ((v >> 8) & 0xFF) as u8)
}

/// Sum of all bytes, truncated to 8 bits.
pub fn wrapping_sum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_signed_byte() {
        assert_eq!(clamp_signed_byte(200), 127);
        assert_eq!(clamp_signed_byte(-200), -127);
        assert_eq!(clamp_signed_byte(50), 50);
        assert_eq!(clamp_signed_byte(-128), -127);
        assert_eq!(clamp_signed_byte(127), 127);
        assert_eq!(clamp_signed_byte(0), 0);
    }

    #[test]
    fn test_clamp_signed_byte_checked() {
        assert_eq!(clamp_signed_byte_checked(300), (127, true));
        assert_eq!(clamp_signed_byte_checked(-127), (-127, false));
        assert_eq!(clamp_signed_byte_checked(-128), (-127, true));
        assert_eq!(clamp_signed_byte_checked(12), (12, false));
    }

    #[test]
    fn test_split_low_high() {
        assert_eq!(split_low_high(0x1234), (0x34, 0x12));
        assert_eq!(split_low_high(0x00FF), (0xFF, 0x00));
        assert_eq!(split_low_high(4095), (0xFF, 0x0F));
        assert_eq!(split_low_high(0), (0, 0));
    }

    #[test]
    fn test_wrapping_sum() {
        assert_eq!(wrapping_sum(&[]), 0);
        assert_eq!(wrapping_sum(&[0x57, 0xAB]), 0x02);
        assert_eq!(wrapping_sum(&[0xFF, 0xFF, 0x02]), 0x00);
    }
}
