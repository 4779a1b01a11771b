//! Buffer encoder (component C5): a growable byte buffer with a
//! container-depth stack, emitting framed values. Shaped like a classic
//! depth tracker (a stack of remaining counts pushed on every container and
//! popped as counts hit zero), except that since BONJSON has no fixed
//! element count up front, each frame tracks a back-patch offset instead of
//! a known remaining count.
//!
//! Wire convention: an array's chunk length field counts *elements*; an
//! object's chunk length field counts *pairs* (one key plus its value
//! together).
use byteorder::{ByteOrder, LittleEndian};

use crate::bignum::BigNum;
use crate::error::{Error, Result};
use crate::float::{self, FloatWidth};
use crate::length::{self, LengthField};
use crate::policy::{EncodeFlags, FloatPolicy};
use crate::type_code;
use crate::utf8;

/// Once a running chunk has accumulated this many counted units (elements
/// or pairs), the encoder flushes it with `continuation=true` and opens a
/// fresh chunk, rather than letting a single back-patch grow unbounded.
const MAX_CHUNK_COUNT: u64 = u32::MAX as u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ContainerKind {
    Array,
    Object,
}

struct Frame {
    kind: ContainerKind,
    /// Offset of the speculative one-byte length-field placeholder for the
    /// chunk currently being filled.
    length_offset: usize,
    /// Elements (array) or pairs (object) written into the current chunk.
    chunk_count: u64,
    /// Elements (array) or pairs (object) written across all chunks so far.
    total_count: u64,
    /// For objects: `false` while awaiting a key, `true` after a key has
    /// been written and a value is awaited to complete the pair.
    awaiting_value: bool,
}

/// The buffer encoder (component C5). Owns a growable byte buffer and a
/// bounded container stack; `finish()` consumes it and returns the
/// completed document.
pub struct Encoder {
    buf: Vec<u8>,
    stack: Vec<Frame>,
    flags: EncodeFlags,
    failed: bool,
}

impl Encoder {
    pub fn new(flags: EncodeFlags) -> Self {
        Encoder {
            buf: Vec::new(),
            stack: Vec::new(),
            flags,
            failed: false,
        }
    }

    fn check_size(&self) -> Result<()> {
        if self.buf.len() > self.flags.limits.max_document_size {
            return Err(Error::DocumentTooLarge { offset: self.buf.len() });
        }
        Ok(())
    }

    fn fail<T>(&mut self, err: Error) -> Result<T> {
        self.failed = true;
        Err(err)
    }

    fn ensure_not_failed(&self) -> Result<()> {
        if self.failed {
            return Err(Error::InvalidData { offset: self.buf.len() });
        }
        Ok(())
    }

    /// Called once per array element, or once per completed object
    /// key/value pair. Flushes and reopens the current chunk if it has
    /// grown past the point a single back-patch should track.
    fn note_counted_unit(&mut self) -> Result<()> {
        if let Some(frame) = self.stack.last_mut() {
            frame.chunk_count += 1;
            frame.total_count += 1;
            if frame.total_count > self.flags.limits.max_container_size as u64 {
                return self.fail(Error::ContainerTooLarge { offset: self.buf.len() });
            }
            if frame.chunk_count >= MAX_CHUNK_COUNT {
                let offset = frame.length_offset;
                let count = frame.chunk_count;
                length::patch_placeholder(&mut self.buf, offset, LengthField::new(count, true));
                let new_offset = length::reserve_placeholder(&mut self.buf);
                let frame = self.stack.last_mut().unwrap();
                frame.length_offset = new_offset;
                frame.chunk_count = 0;
            }
        }
        self.check_size()
    }

    /// Registers that one value (scalar, string, or just-closed container)
    /// was written into the innermost open container, if any. For an
    /// object frame this is a key on the first call after a pair boundary
    /// and a value (completing the pair) on the second.
    fn register_write(&mut self) -> Result<()> {
        let Some(frame) = self.stack.last_mut() else { return Ok(()) };
        if frame.kind == ContainerKind::Object {
            if !frame.awaiting_value {
                frame.awaiting_value = true;
                return self.check_size();
            }
            frame.awaiting_value = false;
        }
        self.note_counted_unit()
    }

    /// Fails if the innermost open container is an object currently
    /// awaiting a key: only [`Encoder::write_string`] may fill that slot.
    /// Every scalar writer besides `write_string` calls this before
    /// touching the buffer.
    fn check_scalar_key_position(&mut self) -> Result<()> {
        if let Some(frame) = self.stack.last() {
            if frame.kind == ContainerKind::Object && !frame.awaiting_value {
                return self.fail(Error::InvalidObjectKey { offset: self.buf.len() });
            }
        }
        Ok(())
    }

    fn open_container(&mut self, kind: ContainerKind, marker: u8) -> Result<()> {
        self.ensure_not_failed()?;
        self.check_scalar_key_position()?;
        if self.stack.len() >= self.flags.limits.max_depth {
            return self.fail(Error::ContainerTooDeep { offset: self.buf.len() });
        }
        self.buf.push(marker);
        let length_offset = length::reserve_placeholder(&mut self.buf);
        self.stack.push(Frame {
            kind,
            length_offset,
            chunk_count: 0,
            total_count: 0,
            awaiting_value: false,
        });
        self.check_size()
    }

    pub fn begin_array(&mut self) -> Result<()> {
        self.open_container(ContainerKind::Array, type_code::ARRAY)
    }

    pub fn begin_object(&mut self) -> Result<()> {
        self.open_container(ContainerKind::Object, type_code::OBJECT)
    }

    /// Closes the innermost open container, back-patching its final chunk's
    /// length field with `continuation = false`.
    pub fn end(&mut self) -> Result<()> {
        self.ensure_not_failed()?;
        let frame = self
            .stack
            .pop()
            .ok_or(Error::InvalidData { offset: self.buf.len() })?;
        if frame.kind == ContainerKind::Object && frame.awaiting_value {
            return self.fail(Error::InvalidData { offset: self.buf.len() });
        }
        length::patch_placeholder(
            &mut self.buf,
            frame.length_offset,
            LengthField::new(frame.chunk_count, false),
        );
        self.register_write()
    }

    fn write_scalar(&mut self, f: impl FnOnce(&mut Vec<u8>)) -> Result<()> {
        self.ensure_not_failed()?;
        f(&mut self.buf);
        self.check_size()?;
        self.register_write()
    }

    pub fn write_null(&mut self) -> Result<()> {
        self.ensure_not_failed()?;
        self.check_scalar_key_position()?;
        self.write_scalar(|buf| buf.push(type_code::NULL))
    }

    pub fn write_bool(&mut self, b: bool) -> Result<()> {
        self.ensure_not_failed()?;
        self.check_scalar_key_position()?;
        self.write_scalar(|buf| buf.push(if b { type_code::TRUE } else { type_code::FALSE }))
    }

    pub fn write_i64(&mut self, v: i64) -> Result<()> {
        self.ensure_not_failed()?;
        self.check_scalar_key_position()?;
        self.write_scalar(|buf| encode_int(buf, v as i128))
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.ensure_not_failed()?;
        self.check_scalar_key_position()?;
        self.write_scalar(|buf| encode_int(buf, v as i128))
    }

    pub fn write_f64(&mut self, v: f64) -> Result<()> {
        self.ensure_not_failed()?;
        self.check_scalar_key_position()?;
        if v.is_nan() || v.is_infinite() {
            return match self.flags.float {
                FloatPolicy::Reject => self.fail(Error::NonConformingFloat { offset: self.buf.len() }),
                FloatPolicy::Allow => self.write_scalar(|buf| {
                    buf.push(type_code::FLOAT64);
                    let mut bytes = [0u8; 8];
                    LittleEndian::write_f64(&mut bytes, v);
                    buf.extend_from_slice(&bytes);
                }),
                FloatPolicy::AsString { pos_inf, neg_inf, nan } => {
                    let s = if v.is_nan() {
                        nan
                    } else if v > 0.0 {
                        pos_inf
                    } else {
                        neg_inf
                    };
                    self.write_string(s)
                }
            };
        }
        if let Some(exact) = exact_integer_value(v) {
            let int_len = integer_encoded_len(exact as i128);
            let float_len = 1 + float::narrowest_width(v).payload_len();
            if int_len <= float_len {
                return self.write_i64(exact);
            }
        }
        self.write_scalar(|buf| match float::narrowest_width(v) {
            FloatWidth::BFloat16 => {
                buf.push(type_code::FLOAT16);
                buf.extend_from_slice(&float::f64_to_bf16_bits(v).to_le_bytes());
            }
            FloatWidth::F32 => {
                buf.push(type_code::FLOAT32);
                let mut bytes = [0u8; 4];
                LittleEndian::write_f32(&mut bytes, v as f32);
                buf.extend_from_slice(&bytes);
            }
            FloatWidth::F64 => {
                buf.push(type_code::FLOAT64);
                let mut bytes = [0u8; 8];
                LittleEndian::write_f64(&mut bytes, v);
                buf.extend_from_slice(&bytes);
            }
        })
    }

    pub fn write_bignum(&mut self, num: BigNum) -> Result<()> {
        self.ensure_not_failed()?;
        self.check_scalar_key_position()?;
        if num.exponent < crate::bignum::MIN_EXPONENT || num.exponent > crate::bignum::MAX_EXPONENT {
            return self.fail(Error::BigNumberOutOfRange { offset: self.buf.len() });
        }
        self.write_scalar(|buf| {
            buf.push(type_code::BIG_NUMBER);
            crate::bignum::encode(num, buf).expect("exponent range checked above");
        })
    }

    pub fn write_string(&mut self, s: &str) -> Result<()> {
        self.ensure_not_failed()?;
        if let Err(e) = utf8::check_nul(s, self.buf.len(), self.flags.nul) {
            self.failed = true;
            return Err(e);
        }
        let bytes = s.as_bytes();
        if bytes.len() > self.flags.limits.max_string_length {
            return self.fail(Error::StringTooLong { offset: self.buf.len() });
        }
        self.write_scalar(|buf| {
            if bytes.len() <= 15 {
                buf.push(type_code::SHORT_STRING_MIN + bytes.len() as u8);
                buf.extend_from_slice(bytes);
            } else {
                buf.push(type_code::LONG_STRING);
                length::encode(LengthField::new(bytes.len() as u64, false), buf);
                buf.extend_from_slice(bytes);
            }
        })
    }

    /// Finishes encoding, returning the completed buffer. Fails if any
    /// container was left open or a prior write already failed.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.ensure_not_failed()?;
        if !self.stack.is_empty() {
            return Err(Error::InvalidData { offset: self.buf.len() });
        }
        self.check_size()?;
        Ok(std::mem::take(&mut self.buf))
    }
}

/// Encodes an integer in its minimal representation: small-int if it fits
/// `-100..=100`, else the narrowest signed N-byte form, else the narrowest
/// unsigned N-byte form for nonnegative values too large to sign-encode.
fn encode_int(buf: &mut Vec<u8>, v: i128) {
    if (-100..=100).contains(&v) {
        buf.push((v + 100) as u8);
        return;
    }
    for n in 1u8..=8 {
        let min = -(1i128 << (n * 8 - 1));
        let max = (1i128 << (n * 8 - 1)) - 1;
        if v >= min && v <= max {
            buf.push(type_code::INT_N_MIN + (n - 1));
            let mut bytes = [0u8; 8];
            LittleEndian::write_i64(&mut bytes, v as i64);
            buf.extend_from_slice(&bytes[..n as usize]);
            return;
        }
    }
    if v >= 0 {
        for n in 1u8..=8 {
            let max = if n == 8 { u64::MAX as u128 } else { (1u128 << (n * 8)) - 1 };
            if (v as u128) <= max {
                buf.push(type_code::UINT_N_MIN + (n - 1));
                let mut bytes = [0u8; 8];
                LittleEndian::write_u64(&mut bytes, v as u64);
                buf.extend_from_slice(&bytes[..n as usize]);
                return;
            }
        }
    }
    // Unreachable for any i64/u64 input: 8-byte signed or unsigned always
    // covers the full range of both source types.
    buf.push(type_code::UINT_N_MIN + 7);
    let mut bytes = [0u8; 8];
    LittleEndian::write_u64(&mut bytes, v as u64);
    buf.extend_from_slice(&bytes);
}

/// If `v` is exactly representable as an `i64`, returns it, so the float
/// writer can compare the integer wire form's width against the narrowest
/// float width and prefer whichever is smaller.
fn exact_integer_value(v: f64) -> Option<i64> {
    if v.fract() != 0.0 || !(i64::MIN as f64..=i64::MAX as f64).contains(&v) {
        return None;
    }
    if v == 0.0 && v.is_sign_negative() {
        // -0.0 would round-trip through `as i64` to positive zero, losing
        // the sign bit this encoder otherwise preserves.
        return None;
    }
    let i = v as i64;
    if i as f64 == v {
        Some(i)
    } else {
        None
    }
}

/// Total wire length (type-code byte plus payload) `encode_int` would
/// produce for `v`, mirroring its own width-selection rules.
fn integer_encoded_len(v: i128) -> usize {
    if (-100..=100).contains(&v) {
        return 1;
    }
    for n in 1u8..=8 {
        let min = -(1i128 << (n * 8 - 1));
        let max = (1i128 << (n * 8 - 1)) - 1;
        if v >= min && v <= max {
            return 1 + n as usize;
        }
    }
    if v >= 0 {
        for n in 1u8..=8 {
            let max = if n == 8 { u64::MAX as u128 } else { (1u128 << (n * 8)) - 1 };
            if (v as u128) <= max {
                return 1 + n as usize;
            }
        }
    }
    9
}
