//! Position-map scanner (component C6): a single forward pass over an
//! input buffer that produces a dense, pre-order entry table with
//! precomputed sibling hops. Shaped like a flat, non-recursive decoder
//! holding a depth tracker and an `errored` latch, except that rather than
//! yielding one value at a time to a deserializer, this scanner appends
//! every value it sees into one entry array and returns the whole thing at
//! once.
//!
//! Wire convention: an array's chunk length field counts *elements*; an
//! object's chunk length field counts *pairs* (one key plus its value
//! together).
use byteorder::{ByteOrder, LittleEndian};

use crate::bignum::{self, BigNum};
use crate::error::{Error, Result};
use crate::length;
use crate::policy::{DecodeFlags, DuplicateKeyPolicy, TrailingBytesPolicy, Utf8Policy};
use crate::type_code::{self, TypeTag};
use crate::utf8;

/// One payload shape per [`TypeTag`]. Scalars are decoded in-place; string
/// and container payloads point elsewhere (the owned input, the
/// reassembly buffer, or the following run of entries).
#[derive(Clone, Debug)]
pub enum Payload {
    None,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    BigNum(BigNum),
    /// A validated, already-UTF-8 string. `in_extra` selects which of the
    /// map's two owned byte buffers `offset..offset+length` slices into:
    /// the original input (the common case) or the reassembly buffer used
    /// for chunked long strings and policy-transformed (replace/delete)
    /// strings.
    String { offset: usize, length: usize, in_extra: bool, chunked: bool },
    /// `count` children (array: elements; object: pairs) follow this
    /// entry; `subtree_size` is the number of entries this header spans,
    /// itself included.
    Container { count: usize, subtree_size: usize },
}

/// A single position-map entry.
#[derive(Clone, Debug)]
pub struct Entry {
    pub tag: TypeTag,
    pub payload: Payload,
    /// Index of the entry immediately following this one's subtree.
    pub next_sibling: usize,
    /// Set on the losing key/value pair of a duplicate key under
    /// `keepFirst`/`keepLast`. The entry stays in place (so indices remain
    /// stable) but the accessor skips it.
    pub inert: bool,
}

/// Output of a successful scan: the entry table plus any bytes assembled
/// out-of-line (chunked or UTF-8-transformed strings).
#[derive(Debug)]
pub struct Scanned {
    pub entries: Vec<Entry>,
    pub extra: Vec<u8>,
}

struct Frame {
    header_index: usize,
    is_object: bool,
    /// Elements (array) or pairs (object) remaining in the chunk currently
    /// being read.
    remaining_in_chunk: u64,
    chunk_continuation: bool,
    /// Elements (array) or pairs (object) seen across all chunks so far.
    child_count: usize,
    /// Set once a key has been read and its value is still pending.
    pending_key: Option<(usize, String)>,
    /// `(key text, key entry index)` for every key seen in this object so
    /// far, used for duplicate detection/resolution.
    seen_keys: Vec<(String, usize)>,
}

/// Scans `input` and returns the resulting entry table. Intended to be
/// called once by [`crate::map::Map::scan`], which owns the combined
/// input+extra buffer the returned offsets point into.
pub fn scan(input: &[u8], flags: DecodeFlags) -> Result<Scanned> {
    if input.len() > flags.limits.max_document_size {
        return Err(Error::DocumentTooLarge { offset: input.len() });
    }

    let mut entries: Vec<Entry> = Vec::new();
    let mut extra: Vec<u8> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut pos = 0usize;

    loop {
        // Close any chunks (and containers) that are now complete.
        loop {
            let Some(frame) = stack.last_mut() else { break };
            if frame.remaining_in_chunk > 0 {
                break;
            }
            if frame.chunk_continuation {
                let (field, consumed) = length::decode(input, pos, flags.length)?;
                pos += consumed;
                frame.remaining_in_chunk = field.count;
                frame.chunk_continuation = field.continuation;
                continue;
            }
            let frame = stack.pop().unwrap();
            let header_index = frame.header_index;
            let subtree_size = entries.len() - header_index;
            entries[header_index].payload = Payload::Container {
                count: frame.child_count,
                subtree_size,
            };
            complete_unit(
                stack.last_mut(),
                &mut entries,
                header_index,
                flags.duplicate_key,
                flags.limits.max_container_size,
            )?;
        }

        if stack.is_empty() && !entries.is_empty() {
            break;
        }

        let expecting_key = matches!(stack.last(), Some(f) if f.is_object && f.pending_key.is_none());

        if pos >= input.len() {
            return Err(if stack.is_empty() {
                Error::Truncated { offset: pos }
            } else {
                Error::UnclosedContainer { offset: pos }
            });
        }

        let start = pos;
        let code = input[pos];
        pos += 1;

        if code == type_code::ARRAY || code == type_code::OBJECT {
            if expecting_key {
                return Err(Error::InvalidObjectKey { offset: start });
            }
            if stack.len() >= flags.limits.max_depth {
                return Err(Error::ContainerTooDeep { offset: start });
            }
            let header_index = entries.len();
            let is_object = code == type_code::OBJECT;
            entries.push(Entry {
                tag: if is_object { TypeTag::Object } else { TypeTag::Array },
                payload: Payload::Container { count: 0, subtree_size: 0 },
                next_sibling: 0,
                inert: false,
            });
            let (field, consumed) = length::decode(input, pos, flags.length)?;
            pos += consumed;
            stack.push(Frame {
                header_index,
                is_object,
                remaining_in_chunk: field.count,
                chunk_continuation: field.continuation,
                child_count: 0,
                pending_key: None,
                seen_keys: Vec::new(),
            });
            continue;
        }

        let (tag, payload) = decode_scalar(code, input, &mut pos, start, &mut extra, flags)?;

        if expecting_key && tag != TypeTag::String {
            return Err(Error::InvalidObjectKey { offset: start });
        }

        let entry_index = entries.len();
        entries.push(Entry { tag, payload: payload.clone(), next_sibling: 0, inert: false });

        if expecting_key {
            let key_str = match &payload {
                Payload::String { offset, length, in_extra, .. } => {
                    let buf: &[u8] = if *in_extra { &extra } else { input };
                    std::str::from_utf8(&buf[*offset..*offset + *length]).unwrap().to_owned()
                }
                _ => unreachable!(),
            };
            let frame = stack.last_mut().unwrap();
            match flags.duplicate_key {
                DuplicateKeyPolicy::Reject => {
                    let already_seen = frame.seen_keys.iter().any(|(k, _)| k == &key_str);
                    if !already_seen && frame.seen_keys.len() >= crate::policy::MAX_KEYS_UNDER_REJECT {
                        return Err(Error::TooManyKeys { offset: start });
                    }
                    if already_seen {
                        return Err(Error::DuplicateObjectKey { offset: start, key: key_str });
                    }
                }
                DuplicateKeyPolicy::KeepFirst | DuplicateKeyPolicy::KeepLast => {}
            }
            frame.seen_keys.push((key_str, entry_index));
            frame.pending_key = Some((entry_index, frame.seen_keys.last().unwrap().0.clone()));
        } else {
            complete_unit(
                stack.last_mut(),
                &mut entries,
                entry_index,
                flags.duplicate_key,
                flags.limits.max_container_size,
            )?;
        }
    }

    if pos < input.len() && flags.trailing_bytes == TrailingBytesPolicy::Reject {
        return Err(Error::TrailingBytes { offset: pos });
    }

    compute_next_siblings(&mut entries);

    Ok(Scanned { entries, extra })
}

/// Registers that `value_index` completes one counted unit for `frame`
/// (its parent in the stack, if any): an array element, or — if the
/// parent is awaiting a value for a pending key — an object pair. Resolves
/// duplicate-key precedence once both halves of a pair are known.
fn complete_unit(
    frame: Option<&mut Frame>,
    entries: &mut [Entry],
    value_index: usize,
    policy: DuplicateKeyPolicy,
    max_container_size: usize,
) -> Result<()> {
    let Some(frame) = frame else { return Ok(()) };
    if frame.is_object {
        let (key_index, key_str) = frame
            .pending_key
            .take()
            .ok_or(Error::InvalidObjectKey { offset: value_index })?;
        if matches!(policy, DuplicateKeyPolicy::KeepFirst | DuplicateKeyPolicy::KeepLast) {
            resolve_duplicate(frame, entries, &key_str, key_index, value_index, policy);
        }
    }
    frame.remaining_in_chunk = frame
        .remaining_in_chunk
        .checked_sub(1)
        .ok_or(Error::InvalidData { offset: value_index })?;
    frame.child_count += 1;
    if frame.child_count > max_container_size {
        return Err(Error::ContainerTooLarge { offset: value_index });
    }
    Ok(())
}

/// Marks the losing key/value pair of a duplicate key inert, leaving the
/// winner (by `keepFirst`/`keepLast`) untouched.
fn resolve_duplicate(
    frame: &Frame,
    entries: &mut [Entry],
    key_str: &str,
    key_index: usize,
    value_index: usize,
    policy: DuplicateKeyPolicy,
) {
    let prior = frame
        .seen_keys
        .iter()
        .filter(|(k, idx)| k == key_str && *idx != key_index)
        .map(|(_, idx)| *idx)
        .next();
    let Some(prior_key_index) = prior else { return };
    let prior_value_index = prior_key_index + 1;
    match policy {
        DuplicateKeyPolicy::KeepFirst => {
            entries[key_index].inert = true;
            entries[value_index].inert = true;
        }
        DuplicateKeyPolicy::KeepLast => {
            entries[prior_key_index].inert = true;
            entries[prior_value_index].inert = true;
        }
        DuplicateKeyPolicy::Reject => {}
    }
}

fn check_float_policy(v: f64, offset: usize, flags: DecodeFlags) -> Result<()> {
    use crate::policy::FloatPolicy;
    if (v.is_nan() || v.is_infinite()) && flags.float == FloatPolicy::Reject {
        return Err(Error::NonConformingFloat { offset });
    }
    Ok(())
}

/// Decodes one scalar (non-container) value starting at `input[start]`
/// (`code` already read, `*pos` pointing just past it).
fn decode_scalar(
    code: u8,
    input: &[u8],
    pos: &mut usize,
    start: usize,
    extra: &mut Vec<u8>,
    flags: DecodeFlags,
) -> Result<(TypeTag, Payload)> {
    if type_code::is_small_int(code) {
        return Ok((TypeTag::Int, Payload::Int(code as i64 - type_code::SMALL_INT_BIAS)));
    }
    if type_code::is_reserved(code) {
        return Err(Error::InvalidType { offset: start, code });
    }
    if type_code::is_uint_n(code) {
        let n = type_code::uint_n_width(code);
        let end = *pos + n;
        if input.len() < end {
            return Err(Error::Truncated { offset: start });
        }
        let mut bytes = [0u8; 8];
        bytes[..n].copy_from_slice(&input[*pos..end]);
        *pos = end;
        return Ok((TypeTag::UInt, Payload::UInt(LittleEndian::read_u64(&bytes))));
    }
    if type_code::is_int_n(code) {
        let n = type_code::int_n_width(code);
        let end = *pos + n;
        if input.len() < end {
            return Err(Error::Truncated { offset: start });
        }
        let mut bytes = [0u8; 8];
        bytes[..n].copy_from_slice(&input[*pos..end]);
        if bytes[n - 1] & 0x80 != 0 {
            for b in bytes.iter_mut().skip(n) {
                *b = 0xFF;
            }
        }
        *pos = end;
        return Ok((TypeTag::Int, Payload::Int(LittleEndian::read_i64(&bytes))));
    }
    if type_code::is_short_string(code) {
        let len = type_code::short_string_len(code);
        let content_start = *pos;
        let end = *pos + len;
        if input.len() < end {
            return Err(Error::Truncated { offset: start });
        }
        let raw = &input[content_start..end];
        *pos = end;
        return finish_string(raw, content_start, false, extra, flags);
    }
    match code {
        type_code::LONG_STRING => {
            let mut assembled = Vec::new();
            let mut chunk_n = 0usize;
            loop {
                let (field, consumed) = length::decode(input, *pos, flags.length)?;
                *pos += consumed;
                let chunk_len = field.count as usize;
                let end = *pos + chunk_len;
                if input.len() < end {
                    return Err(Error::Truncated { offset: *pos });
                }
                assembled.extend_from_slice(&input[*pos..end]);
                *pos = end;
                chunk_n += 1;
                if chunk_n > flags.limits.max_chunks {
                    return Err(Error::MaxChunksExceeded { offset: *pos });
                }
                if !field.continuation {
                    break;
                }
            }
            if assembled.len() > flags.limits.max_string_length {
                return Err(Error::StringTooLong { offset: start });
            }
            finish_string(&assembled, start, true, extra, flags)
        }
        type_code::BIG_NUMBER => {
            let (num, consumed) = bignum::decode(input, *pos, flags.float)?;
            *pos += consumed;
            Ok((TypeTag::BigNum, Payload::BigNum(num)))
        }
        type_code::FLOAT16 => {
            let end = *pos + 2;
            if input.len() < end {
                return Err(Error::Truncated { offset: start });
            }
            let bits = LittleEndian::read_u16(&input[*pos..end]);
            *pos = end;
            let v = crate::float::bf16_bits_to_f64(bits);
            check_float_policy(v, start, flags)?;
            Ok((TypeTag::Float, Payload::Float(v)))
        }
        type_code::FLOAT32 => {
            let end = *pos + 4;
            if input.len() < end {
                return Err(Error::Truncated { offset: start });
            }
            let v = LittleEndian::read_f32(&input[*pos..end]);
            *pos = end;
            check_float_policy(v as f64, start, flags)?;
            Ok((TypeTag::Float, Payload::Float(v as f64)))
        }
        type_code::FLOAT64 => {
            let end = *pos + 8;
            if input.len() < end {
                return Err(Error::Truncated { offset: start });
            }
            let v = LittleEndian::read_f64(&input[*pos..end]);
            *pos = end;
            check_float_policy(v, start, flags)?;
            Ok((TypeTag::Float, Payload::Float(v)))
        }
        type_code::NULL => Ok((TypeTag::Null, Payload::None)),
        type_code::FALSE => Ok((TypeTag::Bool, Payload::Bool(false))),
        type_code::TRUE => Ok((TypeTag::Bool, Payload::Bool(true))),
        _ => Err(Error::InvalidType { offset: start, code }),
    }
}

/// Validates `raw` against the UTF-8 policy, checks the NUL policy, and
/// decides whether the (possibly transformed) bytes can point straight
/// into the original input or must be copied into the reassembly buffer.
fn finish_string(
    raw: &[u8],
    offset: usize,
    chunked: bool,
    extra: &mut Vec<u8>,
    flags: DecodeFlags,
) -> Result<(TypeTag, Payload)> {
    let validated = utf8::validate(raw, offset, flags.utf8)?;
    utf8::check_nul(&validated, offset, flags.nul)?;

    let unchanged = !chunked && (flags.utf8 == Utf8Policy::Reject || validated.as_bytes() == raw);

    if unchanged {
        Ok((
            TypeTag::String,
            Payload::String { offset, length: raw.len(), in_extra: false, chunked: false },
        ))
    } else {
        let extra_offset = extra.len();
        extra.extend_from_slice(validated.as_bytes());
        Ok((
            TypeTag::String,
            Payload::String { offset: extra_offset, length: validated.len(), in_extra: true, chunked },
        ))
    }
}

/// Fills `next_sibling` for every entry with a second pass over the
/// already-built table, using each container's known `subtree_size`.
fn compute_next_siblings(entries: &mut [Entry]) {
    let len = entries.len();
    let mut i = 0usize;
    while i < len {
        let span = match entries[i].payload {
            Payload::Container { subtree_size, .. } => subtree_size,
            _ => 1,
        };
        entries[i].next_sibling = i + span;
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;
    use crate::policy::{DecodeFlags, EncodeFlags};

    fn scan_ok(bytes: &[u8]) -> Scanned {
        scan(bytes, DecodeFlags::default()).unwrap()
    }

    #[test]
    fn scans_flat_array() {
        let scanned = scan_ok(&[0xF8, 0x0C, 0x65, 0x66, 0x67]);
        assert_eq!(scanned.entries.len(), 4);
        assert!(matches!(scanned.entries[0].payload, Payload::Container { count: 3, .. }));
        assert_eq!(scanned.entries[0].next_sibling, 4);
    }

    #[test]
    fn scans_empty_object() {
        let scanned = scan_ok(&[0xF9, 0x00]);
        assert_eq!(scanned.entries.len(), 1);
        assert!(matches!(scanned.entries[0].payload, Payload::Container { count: 0, .. }));
    }

    #[test]
    fn duplicate_key_rejected_by_default() {
        let bytes = [0xF9, 0x08, 0xE1, b'a', 0x65, 0xE1, b'a', 0x66];
        let err = scan(&bytes, DecodeFlags::default()).unwrap_err();
        assert!(matches!(err, Error::DuplicateObjectKey { .. }));
    }

    #[test]
    fn duplicate_key_keep_first() {
        let bytes = [0xF9, 0x08, 0xE1, b'a', 0x65, 0xE1, b'a', 0x66];
        let mut flags = DecodeFlags::default();
        flags.duplicate_key = DuplicateKeyPolicy::KeepFirst;
        let scanned = scan(&bytes, flags).unwrap();
        // entries: [obj header, key"a", val 1, key"a", val 2]
        assert!(!scanned.entries[1].inert);
        assert!(!scanned.entries[2].inert);
        assert!(scanned.entries[3].inert);
        assert!(scanned.entries[4].inert);
    }

    #[test]
    fn duplicate_key_keep_last() {
        let bytes = [0xF9, 0x08, 0xE1, b'a', 0x65, 0xE1, b'a', 0x66];
        let mut flags = DecodeFlags::default();
        flags.duplicate_key = DuplicateKeyPolicy::KeepLast;
        let scanned = scan(&bytes, flags).unwrap();
        assert!(scanned.entries[1].inert);
        assert!(scanned.entries[2].inert);
        assert!(!scanned.entries[3].inert);
        assert!(!scanned.entries[4].inert);
    }

    #[test]
    fn invalid_utf8_policies() {
        let bytes = [0xE3, b'a', 0x80, b'b'];
        assert!(matches!(
            scan(&bytes, DecodeFlags::default()).unwrap_err(),
            Error::InvalidUtf8 { .. }
        ));

        let mut flags = DecodeFlags::default();
        flags.utf8 = Utf8Policy::Replace;
        let scanned = scan(&bytes, flags).unwrap();
        match &scanned.entries[0].payload {
            Payload::String { offset, length, in_extra, .. } => {
                assert!(in_extra);
                assert_eq!(&scanned.extra[*offset..*offset + *length], "a\u{FFFD}b".as_bytes());
            }
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn trailing_bytes_rejected_by_default() {
        let bytes = [0xF5, 0xF5];
        assert!(matches!(
            scan(&bytes, DecodeFlags::default()).unwrap_err(),
            Error::TrailingBytes { .. }
        ));
        let mut flags = DecodeFlags::default();
        flags.trailing_bytes = TrailingBytesPolicy::Allow;
        assert!(scan(&bytes, flags).is_ok());
    }

    #[test]
    fn container_too_deep() {
        let mut flags = EncodeFlags::default();
        flags.limits.max_depth = 3;
        let mut e = Encoder::new(flags);
        for _ in 0..3 {
            e.begin_array().unwrap();
        }
        for _ in 0..3 {
            e.end().unwrap();
        }
        let bytes = e.finish().unwrap();
        let mut dflags = DecodeFlags::default();
        dflags.limits.max_depth = 2;
        assert!(matches!(
            scan(&bytes, dflags).unwrap_err(),
            Error::ContainerTooDeep { .. }
        ));
    }

    #[test]
    fn container_too_large() {
        let mut eflags = EncodeFlags::default();
        eflags.limits.max_container_size = 100;
        let mut e = Encoder::new(eflags);
        e.begin_array().unwrap();
        for i in 0..5 {
            e.write_i64(i).unwrap();
        }
        e.end().unwrap();
        let bytes = e.finish().unwrap();

        let mut dflags = DecodeFlags::default();
        dflags.limits.max_container_size = 3;
        assert!(matches!(
            scan(&bytes, dflags).unwrap_err(),
            Error::ContainerTooLarge { .. }
        ));
        assert!(scan(&bytes, DecodeFlags::default()).is_ok());
    }

    #[test]
    fn unclosed_container_is_truncated_or_unclosed() {
        let bytes = [0xF8, 0x0C, 0x65, 0x66];
        assert!(matches!(
            scan(&bytes, DecodeFlags::default()).unwrap_err(),
            Error::UnclosedContainer { .. } | Error::Truncated { .. }
        ));
    }

    #[test]
    fn non_string_key_rejected() {
        // Object whose "key" is the integer 1 instead of a string.
        let bytes = [0xF9, 0x02, 0x65, 0x65];
        assert!(matches!(
            scan(&bytes, DecodeFlags::default()).unwrap_err(),
            Error::InvalidObjectKey { .. }
        ));
    }
}
