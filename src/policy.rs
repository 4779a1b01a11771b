//! Security-guard policies and resource limits (component C8).
//!
//! These are the only configuration knobs the codec exposes; transforms
//! like date/base64/key-case handling live entirely in the host layer that
//! calls this crate.

/// How the decoder (and, for key/NUL checks, the encoder) handles invalid
/// UTF-8 byte sequences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Utf8Policy {
    /// Fail with `invalidUTF8` on the first violation.
    #[default]
    Reject,
    /// Replace each maximal invalid subsequence with U+FFFD.
    Replace,
    /// Remove invalid bytes entirely.
    Delete,
}

/// Whether a literal NUL (U+0000) inside a string is accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NulPolicy {
    /// Fail with `nulCharacterInString`.
    #[default]
    Reject,
    /// Accept the NUL byte as a normal code point.
    Allow,
}

/// How duplicate object keys are resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DuplicateKeyPolicy {
    /// Fail with `duplicateObjectKey`.
    #[default]
    Reject,
    /// Keep the first occurrence's value, ignore later ones.
    KeepFirst,
    /// Keep the last occurrence's value, ignore earlier ones.
    KeepLast,
}

/// How NaN/±Infinity floats are handled, on either encode or decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FloatPolicy {
    /// Fail with `nonConformingFloat`.
    #[default]
    Reject,
    /// Pass the value through unchanged.
    Allow,
    /// Substitute a string value, using the given spellings.
    AsString {
        pos_inf: &'static str,
        neg_inf: &'static str,
        nan: &'static str,
    },
}

/// Whether bytes remaining after the root value are tolerated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TrailingBytesPolicy {
    /// Fail with `trailingBytes`.
    #[default]
    Reject,
    /// Ignore anything after the root value.
    Allow,
}

/// Whether an over-long (non-minimal) length field is tolerated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LengthPolicy {
    /// Fail with `nonCanonicalLength`.
    #[default]
    Reject,
    /// Accept any well-formed, if non-minimal, length field.
    Allow,
}

/// Resource limits enforced by the scanner and encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub max_depth: usize,
    pub max_string_length: usize,
    pub max_container_size: usize,
    pub max_document_size: usize,
    pub max_chunks: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_depth: 512,
            max_string_length: 10_000_000,
            max_container_size: 1_000_000,
            max_document_size: 2_000_000_000,
            max_chunks: 100,
        }
    }
}

/// Per-object duplicate-key detection is bounded to this many distinct
/// keys under [`DuplicateKeyPolicy::Reject`]; larger objects fail with
/// `tooManyKeys`.
pub const MAX_KEYS_UNDER_REJECT: usize = 256;

/// An object with more than this many pairs gets a lazily-built key→index
/// hash cache in the accessor; smaller objects use linear bytewise scan.
pub const KEY_CACHE_THRESHOLD: usize = 12;

/// Decode-time configuration: every policy and limit consulted by the
/// scanner and accessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeFlags {
    pub utf8: Utf8Policy,
    pub nul: NulPolicy,
    pub duplicate_key: DuplicateKeyPolicy,
    pub float: FloatPolicy,
    pub trailing_bytes: TrailingBytesPolicy,
    pub length: LengthPolicy,
    pub limits: Limits,
}

impl Default for DecodeFlags {
    fn default() -> Self {
        DecodeFlags {
            utf8: Utf8Policy::default(),
            nul: NulPolicy::default(),
            duplicate_key: DuplicateKeyPolicy::default(),
            float: FloatPolicy::default(),
            trailing_bytes: TrailingBytesPolicy::default(),
            length: LengthPolicy::default(),
            limits: Limits::default(),
        }
    }
}

/// Encode-time configuration: the subset of policies/limits that apply to
/// writing (NUL and float policy, plus the shared resource limits).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodeFlags {
    pub nul: NulPolicy,
    pub float: FloatPolicy,
    pub limits: Limits,
}

impl Default for EncodeFlags {
    fn default() -> Self {
        EncodeFlags {
            nul: NulPolicy::default(),
            float: FloatPolicy::default(),
            limits: Limits::default(),
        }
    }
}
