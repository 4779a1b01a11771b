//! Float encoding policy (part of component C3).
//!
//! `0xF2` is bfloat16 (the upper 16 bits of an IEEE-754 `f32`), not IEEE
//! binary16 — resolved from a same-family reference decoder, since the
//! format's own published notes leave the two in conflict. Applies an
//! `is_i64`/`is_u64`-style exact-fit check to float widths instead of
//! integer widths.
use half::bf16;

/// Widens a bfloat16 bit pattern to `f64`, matching the reference decoder's
/// `u32::from(bits) << 16` truncated-float scheme.
pub fn bf16_bits_to_f64(bits: u16) -> f64 {
    bf16::from_bits(bits).to_f64()
}

/// Narrows an `f64` to its nearest bfloat16 bit pattern.
pub fn f64_to_bf16_bits(v: f64) -> u16 {
    bf16::from_f64(v).to_bits()
}

/// Whether `v` round-trips bit-for-bit through bfloat16.
pub fn is_exact_bf16(v: f64) -> bool {
    bf16_bits_to_f64(f64_to_bf16_bits(v)).to_bits() == v.to_bits()
}

/// The narrowest wire width able to carry `v` without losing precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FloatWidth {
    BFloat16,
    F32,
    F64,
}

impl FloatWidth {
    /// Bytes of payload following the type-code byte.
    pub fn payload_len(self) -> usize {
        match self {
            FloatWidth::BFloat16 => 2,
            FloatWidth::F32 => 4,
            FloatWidth::F64 => 8,
        }
    }
}

/// Chooses the narrowest of {bfloat16, f32, f64} that represents `v`
/// exactly (bitwise, after a round trip). Does not consider the integer
/// small-form; callers check that separately since it is not a "float"
/// width per se.
pub fn narrowest_width(v: f64) -> FloatWidth {
    if is_exact_bf16(v) {
        FloatWidth::BFloat16
    } else if is_exact_f32(v) {
        FloatWidth::F32
    } else {
        FloatWidth::F64
    }
}

/// Whether `v` round-trips bit-for-bit through `f32`.
pub fn is_exact_f32(v: f64) -> bool {
    let narrowed = v as f32;
    (narrowed as f64).to_bits() == v.to_bits()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_exact_in_bf16_only_when_small() {
        assert!(is_exact_bf16(1.0));
        assert!(is_exact_bf16(2.0));
        assert!(!is_exact_bf16(1.0 / 3.0));
    }

    #[test]
    fn pi_needs_f64() {
        assert_eq!(narrowest_width(std::f64::consts::PI), FloatWidth::F64);
    }

    #[test]
    fn one_is_bf16() {
        assert_eq!(narrowest_width(1.0), FloatWidth::BFloat16);
    }

    #[test]
    fn f32_exact_value_does_not_need_f64() {
        let v = 1.0f32 as f64 + 0.5f32 as f64; // 1.5, exact in bf16 too
        assert_eq!(narrowest_width(v), FloatWidth::BFloat16);
        let v = (1.0f32 / 3.0f32) as f64; // exact in f32, not bf16
        assert_eq!(narrowest_width(v), FloatWidth::F32);
    }

    #[test]
    fn bf16_round_trip() {
        let bits = f64_to_bf16_bits(3.5);
        assert_eq!(bf16_bits_to_f64(bits), 3.5);
    }

    #[test]
    fn negative_zero_is_distinguished() {
        assert_ne!((-0.0f64).to_bits(), (0.0f64).to_bits());
        assert!(is_exact_bf16(-0.0));
    }
}
