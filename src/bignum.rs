//! Big-number codec (part of component C3): the `0xF1` arbitrary-precision
//! decimal form, `(-1)^sign * significand * 10^exponent`.
//!
//! The wire header packs three fields into one byte (`SSSSS EE N`, from
//! high bit to low): sign, exponent byte count, significand byte count.
//! The sign is a literal wire bit rather than inferred from a value's
//! range, unlike a typical tagged pos/neg integer split.
use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::policy::FloatPolicy;

/// Implementation cap: significand bytes must fit in a `u64`.
const MAX_SIGNIFICAND_BYTES: u8 = 8;
/// Implementation cap: exponent byte count, per the header's 2-bit field.
const MAX_EXPONENT_BYTES: u8 = 3;
/// Implementation cap on the decoded exponent value itself, independent of
/// how many bytes the header's `EE` field claims to carry.
pub(crate) const MIN_EXPONENT: i32 = -128;
pub(crate) const MAX_EXPONENT: i32 = 127;

/// A decoded (or to-be-encoded) big number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BigNum {
    pub negative: bool,
    pub exponent: i32,
    pub significand: u64,
}

impl BigNum {
    pub fn new(negative: bool, exponent: i32, significand: u64) -> Self {
        BigNum {
            negative,
            exponent,
            significand,
        }
    }

    /// Best-effort conversion to `f64`. Used only when a caller explicitly
    /// asks for a lossy numeric view; the exact decimal value is only
    /// fully preserved via the wire bytes themselves.
    pub fn to_f64(self) -> f64 {
        let magnitude = self.significand as f64 * 10f64.powi(self.exponent);
        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }
}

fn bytes_needed_unsigned(mut v: u64) -> u8 {
    if v == 0 {
        return 0;
    }
    let mut n = 0u8;
    while v > 0 {
        n += 1;
        v >>= 8;
    }
    n
}

/// Smallest N such that `v` fits in an N-byte two's-complement integer.
/// Callers are expected to have already checked `v` against
/// `MIN_EXPONENT..=MAX_EXPONENT`, so in practice this never returns more
/// than 1.
fn bytes_needed_signed(v: i32) -> u8 {
    if v == 0 {
        return 0;
    }
    for n in 1..=4u8 {
        let min = -(1i64 << (n * 8 - 1));
        let max = (1i64 << (n * 8 - 1)) - 1;
        if (v as i64) >= min && (v as i64) <= max {
            return n;
        }
    }
    4
}

/// Encodes `num` in its minimal header+field form. Fails with
/// `bigNumberOutOfRange` if the exponent falls outside `[-128, 127]`, the
/// only range the 2-bit `EE` header field can address without corrupting
/// the significand-length bits above it.
pub fn encode(num: BigNum, buf: &mut Vec<u8>) -> Result<()> {
    if num.exponent < MIN_EXPONENT || num.exponent > MAX_EXPONENT {
        return Err(Error::BigNumberOutOfRange { offset: buf.len() });
    }
    let sig_len = bytes_needed_unsigned(num.significand);
    let exp_len = bytes_needed_signed(num.exponent);
    let header = (sig_len << 3) | (exp_len << 1) | (num.negative as u8);
    buf.push(header);
    if exp_len > 0 {
        let mut bytes = [0u8; 4];
        LittleEndian::write_i32(&mut bytes, num.exponent);
        buf.extend_from_slice(&bytes[..exp_len as usize]);
    }
    if sig_len > 0 {
        let mut bytes = [0u8; 8];
        LittleEndian::write_u64(&mut bytes, num.significand);
        buf.extend_from_slice(&bytes[..sig_len as usize]);
    }
    Ok(())
}

/// Decodes a big number starting at `input[offset]` (pointing at the
/// header byte). Returns the value and total bytes consumed.
pub fn decode(input: &[u8], offset: usize, float_policy: FloatPolicy) -> Result<(BigNum, usize)> {
    let header = *input.get(offset).ok_or(Error::Truncated { offset })?;
    let negative = header & 0x01 != 0;
    let exp_len = (header >> 1) & 0x03;
    let sig_len = header >> 3;

    if sig_len == 0 && exp_len != 0 {
        // Reserved NaN/Infinity sentinel form.
        return match float_policy {
            FloatPolicy::Allow | FloatPolicy::AsString { .. } => {
                // No numeric value can represent this; callers that allow
                // non-conforming floats still cannot recover a value from
                // a form that carries none, so treat as zero-significand,
                // exponent-less special case consumed by its header alone.
                let mut pos = offset + 1;
                pos += exp_len as usize;
                Ok((BigNum::new(negative, 0, 0), pos - offset))
            }
            FloatPolicy::Reject => Err(Error::InvalidData { offset }),
        };
    }

    if sig_len > MAX_SIGNIFICAND_BYTES || exp_len > MAX_EXPONENT_BYTES {
        return Err(Error::BigNumberOutOfRange { offset });
    }

    let mut pos = offset + 1;
    let exponent = if exp_len == 0 {
        0
    } else {
        let end = pos + exp_len as usize;
        if input.len() < end {
            return Err(Error::Truncated { offset });
        }
        let mut bytes = [0u8; 4];
        bytes[..exp_len as usize].copy_from_slice(&input[pos..end]);
        // sign-extend from the top used byte
        let sign_bit = bytes[exp_len as usize - 1] & 0x80 != 0;
        if sign_bit {
            for b in bytes.iter_mut().skip(exp_len as usize) {
                *b = 0xFF;
            }
        }
        pos = end;
        LittleEndian::read_i32(&bytes)
    };

    if exponent < MIN_EXPONENT || exponent > MAX_EXPONENT {
        match float_policy {
            FloatPolicy::Reject => return Err(Error::BigNumberOutOfRange { offset }),
            FloatPolicy::Allow | FloatPolicy::AsString { .. } => {
                // Carried through as an exact BigNum rather than rounded to
                // an imprecise float; still loses nothing the caller asked
                // to keep, since the significand and exponent both survive.
            }
        }
    }

    let significand = if sig_len == 0 {
        0
    } else {
        let end = pos + sig_len as usize;
        if input.len() < end {
            return Err(Error::Truncated { offset });
        }
        let mut bytes = [0u8; 8];
        bytes[..sig_len as usize].copy_from_slice(&input[pos..end]);
        pos = end;
        LittleEndian::read_u64(&bytes)
    };

    Ok((BigNum::new(negative, exponent, significand), pos - offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_example_12345() {
        let mut buf = Vec::new();
        encode(BigNum::new(false, 0, 12345), &mut buf).unwrap();
        assert_eq!(buf, vec![0x10, 0x39, 0x30]);
        let (num, consumed) = decode(&buf, 0, FloatPolicy::Reject).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(num.significand, 12345);
        assert_eq!(num.exponent, 0);
        assert!(!num.negative);
    }

    #[test]
    fn spec_example_negative_12345() {
        let mut buf = Vec::new();
        encode(BigNum::new(true, 0, 12345), &mut buf).unwrap();
        assert_eq!(buf, vec![0x11, 0x39, 0x30]);
    }

    #[test]
    fn spec_example_123_45() {
        let mut buf = Vec::new();
        encode(BigNum::new(false, -2, 12345), &mut buf).unwrap();
        assert_eq!(buf, vec![0x12, 0xFE, 0x39, 0x30]);
        let (num, _) = decode(&buf, 0, FloatPolicy::Reject).unwrap();
        assert_eq!(num.exponent, -2);
        assert_eq!(num.significand, 12345);
        assert_eq!(num.to_f64(), 123.45);
    }

    #[test]
    fn zero_significand_zero_exponent_is_just_header() {
        let mut buf = Vec::new();
        encode(BigNum::new(false, 0, 0), &mut buf).unwrap();
        assert_eq!(buf, vec![0x00]);
    }

    #[test]
    fn reserved_sentinel_rejected_by_default() {
        // sig_len=0, exp_len=1 -> header = (0<<3)|(1<<1)|0 = 0x02, then one exponent byte.
        let buf = vec![0x02, 0x05];
        assert_eq!(
            decode(&buf, 0, FloatPolicy::Reject).unwrap_err(),
            Error::InvalidData { offset: 0 }
        );
        assert!(decode(&buf, 0, FloatPolicy::Allow).is_ok());
    }

    #[test]
    fn round_trip_boundary_values() {
        for &(neg, exp, sig) in &[
            (false, 0i32, 0u64),
            (true, 127, 1),
            (false, -128, u64::MAX),
            (true, 0, 255),
            (false, 100, 256),
        ] {
            let mut buf = Vec::new();
            encode(BigNum::new(neg, exp, sig), &mut buf).unwrap();
            let (num, consumed) = decode(&buf, 0, FloatPolicy::Reject).unwrap();
            assert_eq!(consumed, buf.len());
            assert_eq!(num, BigNum::new(neg, exp, sig));
        }
    }

    #[test]
    fn encode_rejects_exponent_outside_implementation_range() {
        let mut buf = Vec::new();
        assert_eq!(
            encode(BigNum::new(false, 128, 1), &mut buf).unwrap_err(),
            Error::BigNumberOutOfRange { offset: 0 }
        );
        assert_eq!(
            encode(BigNum::new(false, -129, 1), &mut buf).unwrap_err(),
            Error::BigNumberOutOfRange { offset: 0 }
        );
    }

    #[test]
    fn decode_rejects_exponent_outside_implementation_range_by_default() {
        // header: sig_len=1, exp_len=2, positive -> (1<<3)|(2<<1)|0 = 0x0C
        // exponent bytes 0x00,0x01 (little-endian 16-bit value 256), significand byte 0x01.
        let buf = vec![0x0C, 0x00, 0x01, 0x01];
        assert_eq!(
            decode(&buf, 0, FloatPolicy::Reject).unwrap_err(),
            Error::BigNumberOutOfRange { offset: 0 }
        );
        let (num, consumed) = decode(&buf, 0, FloatPolicy::Allow).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(num.exponent, 256);
        assert_eq!(num.significand, 1);
    }
}
