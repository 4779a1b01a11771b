//! Type-code registry (component C1): the fixed byte markers that open
//! every value, and the classification predicates the rest of the codec
//! is built on.

/// Smallest small-int type code; value = code − 100.
pub const SMALL_INT_MIN: u8 = 0x00;
/// Largest small-int type code.
pub const SMALL_INT_MAX: u8 = 0xC8;
/// Bias subtracted from a small-int code to get its value.
pub const SMALL_INT_BIAS: i64 = 100;

/// First reserved code in the low reserved band.
pub const RESERVED_LOW_MIN: u8 = 0xC9;
pub const RESERVED_LOW_MAX: u8 = 0xCF;

/// Unsigned N-byte little-endian integer, N = code − 0xCF.
pub const UINT_N_MIN: u8 = 0xD0;
pub const UINT_N_MAX: u8 = 0xD7;

/// Signed N-byte little-endian two's-complement integer, N = code − 0xD7.
pub const INT_N_MIN: u8 = 0xD8;
pub const INT_N_MAX: u8 = 0xDF;

/// Short string; length = code − 0xE0 (0..15).
pub const SHORT_STRING_MIN: u8 = 0xE0;
pub const SHORT_STRING_MAX: u8 = 0xEF;

pub const LONG_STRING: u8 = 0xF0;
pub const BIG_NUMBER: u8 = 0xF1;
pub const FLOAT16: u8 = 0xF2;
pub const FLOAT32: u8 = 0xF3;
pub const FLOAT64: u8 = 0xF4;
pub const NULL: u8 = 0xF5;
pub const FALSE: u8 = 0xF6;
pub const TRUE: u8 = 0xF7;
pub const ARRAY: u8 = 0xF8;
pub const OBJECT: u8 = 0xF9;

pub const RESERVED_HIGH_MIN: u8 = 0xFA;
pub const RESERVED_HIGH_MAX: u8 = 0xFF;

/// The logical type a position-map entry or a `Value` holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeTag {
    Null,
    Bool,
    Int,
    UInt,
    Float,
    BigNum,
    String,
    Array,
    Object,
}

impl TypeTag {
    /// A short, stable name for this tag, used in `typeMismatch` messages.
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::Bool => "bool",
            TypeTag::Int => "int",
            TypeTag::UInt => "uint",
            TypeTag::Float => "float",
            TypeTag::BigNum => "bignum",
            TypeTag::String => "string",
            TypeTag::Array => "array",
            TypeTag::Object => "object",
        }
    }
}

#[inline]
pub fn is_small_int(code: u8) -> bool {
    code <= SMALL_INT_MAX
}

#[inline]
pub fn is_short_string(code: u8) -> bool {
    (SHORT_STRING_MIN..=SHORT_STRING_MAX).contains(&code)
}

#[inline]
pub fn is_long_form(code: u8) -> bool {
    code >= LONG_STRING
}

#[inline]
pub fn is_reserved(code: u8) -> bool {
    (RESERVED_LOW_MIN..=RESERVED_LOW_MAX).contains(&code)
        || (RESERVED_HIGH_MIN..=RESERVED_HIGH_MAX).contains(&code)
}

#[inline]
pub fn is_uint_n(code: u8) -> bool {
    (UINT_N_MIN..=UINT_N_MAX).contains(&code)
}

#[inline]
pub fn is_int_n(code: u8) -> bool {
    (INT_N_MIN..=INT_N_MAX).contains(&code)
}

/// Byte width `N` for an unsigned N-byte integer type code. Panics if
/// `code` is not in the `uint_n` range; callers must check first.
#[inline]
pub fn uint_n_width(code: u8) -> usize {
    (code - 0xCF) as usize
}

/// Byte width `N` for a signed N-byte integer type code.
#[inline]
pub fn int_n_width(code: u8) -> usize {
    (code - 0xD7) as usize
}

/// Length in bytes carried by a short-string type code.
#[inline]
pub fn short_string_len(code: u8) -> usize {
    (code - SHORT_STRING_MIN) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_do_not_overlap_and_cover_0_255() {
        for code in 0u16..=255 {
            let code = code as u8;
            let buckets = [
                is_small_int(code),
                (RESERVED_LOW_MIN..=RESERVED_LOW_MAX).contains(&code),
                is_uint_n(code),
                is_int_n(code),
                is_short_string(code),
                code == LONG_STRING,
                code == BIG_NUMBER,
                code == FLOAT16 || code == FLOAT32 || code == FLOAT64,
                code == NULL || code == FALSE || code == TRUE,
                code == ARRAY || code == OBJECT,
                (RESERVED_HIGH_MIN..=RESERVED_HIGH_MAX).contains(&code),
            ];
            assert_eq!(buckets.iter().filter(|b| **b).count(), 1, "code 0x{:02X}", code);
        }
    }

    #[test]
    fn small_int_bias() {
        assert_eq!(SMALL_INT_MIN as i64 - SMALL_INT_BIAS, -100);
        assert_eq!(0x64i64 - SMALL_INT_BIAS, 0);
        assert_eq!(SMALL_INT_MAX as i64 - SMALL_INT_BIAS, 100);
    }

    #[test]
    fn int_uint_widths() {
        assert_eq!(uint_n_width(0xD0), 1);
        assert_eq!(uint_n_width(0xD7), 8);
        assert_eq!(int_n_width(0xD8), 1);
        assert_eq!(int_n_width(0xDF), 8);
    }

    #[test]
    fn short_string_lengths() {
        assert_eq!(short_string_len(0xE0), 0);
        assert_eq!(short_string_len(0xEF), 15);
    }
}
