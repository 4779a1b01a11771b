//! Error types returned by the encoder and scanner.
use std::fmt;

/// A BONJSON result, normally returning a [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A single segment of a logical path, used to locate a `typeMismatch`
/// failure surfaced by the position-map accessor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// Index into an array.
    Index(usize),
    /// Key into an object.
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "[{}]", i),
            PathSegment::Key(k) => write!(f, ".{}", k),
        }
    }
}

/// A BONJSON error. Encompasses every failure that can happen while encoding
/// a value or scanning/accessing a decoded document.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Input ended mid-value or mid-length-field.
    Truncated { offset: usize },
    /// A reserved type code was encountered.
    InvalidType { offset: usize, code: u8 },
    /// A UTF-8 violation was found under the `reject` policy.
    InvalidUtf8 { offset: usize },
    /// A NUL byte was present in a string under the `reject` NUL policy.
    NulCharacterInString { offset: usize },
    /// A duplicate object key was found under the `reject` duplicate-key policy.
    DuplicateObjectKey { offset: usize, key: String },
    /// An object exceeded 256 keys with duplicate detection enabled.
    TooManyKeys { offset: usize },
    /// A non-string value appeared where an object key was expected.
    InvalidObjectKey { offset: usize },
    /// The accessor was asked for a type the entry does not hold.
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
        path: Vec<PathSegment>,
    },
    /// A NaN or infinite float was encountered under the `reject` float policy.
    NonConformingFloat { offset: usize },
    /// A big number's significand or exponent exceeded implementation limits.
    BigNumberOutOfRange { offset: usize },
    /// Extra bytes remained after the root value under the `reject` trailing-bytes policy.
    TrailingBytes { offset: usize },
    /// A length field was not minimally encoded.
    NonCanonicalLength { offset: usize },
    /// A chunk had `count=0` and `continuation=1`.
    EmptyChunkContinuation { offset: usize },
    /// Container nesting exceeded `maxDepth`.
    ContainerTooDeep { offset: usize },
    /// A container held more elements than `maxContainerSize`.
    ContainerTooLarge { offset: usize },
    /// A string exceeded `maxStringLength` bytes.
    StringTooLong { offset: usize },
    /// The document exceeded `maxDocumentSize` bytes.
    DocumentTooLarge { offset: usize },
    /// A long-form string had more than `maxChunks` chunks.
    MaxChunksExceeded { offset: usize },
    /// The scanner ran out of input while inside an open container.
    UnclosedContainer { offset: usize },
    /// Any other malformed input not covered by a more specific kind.
    InvalidData { offset: usize },
}

impl Error {
    /// The byte offset associated with this error, for decode errors.
    pub fn offset(&self) -> Option<usize> {
        match *self {
            Error::Truncated { offset }
            | Error::InvalidType { offset, .. }
            | Error::InvalidUtf8 { offset }
            | Error::NulCharacterInString { offset }
            | Error::DuplicateObjectKey { offset, .. }
            | Error::TooManyKeys { offset }
            | Error::InvalidObjectKey { offset }
            | Error::NonConformingFloat { offset }
            | Error::BigNumberOutOfRange { offset }
            | Error::TrailingBytes { offset }
            | Error::NonCanonicalLength { offset }
            | Error::EmptyChunkContinuation { offset }
            | Error::ContainerTooDeep { offset }
            | Error::ContainerTooLarge { offset }
            | Error::StringTooLong { offset }
            | Error::DocumentTooLarge { offset }
            | Error::MaxChunksExceeded { offset }
            | Error::UnclosedContainer { offset }
            | Error::InvalidData { offset } => Some(offset),
            Error::TypeMismatch { .. } => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Truncated { offset } => write!(f, "input truncated at offset {}", offset),
            Error::InvalidType { offset, code } => {
                write!(f, "reserved type code 0x{:02X} at offset {}", code, offset)
            }
            Error::InvalidUtf8 { offset } => write!(f, "invalid UTF-8 at offset {}", offset),
            Error::NulCharacterInString { offset } => {
                write!(f, "NUL character in string at offset {}", offset)
            }
            Error::DuplicateObjectKey { offset, key } => {
                write!(f, "duplicate object key {:?} at offset {}", key, offset)
            }
            Error::TooManyKeys { offset } => {
                write!(f, "object exceeds maximum key count at offset {}", offset)
            }
            Error::InvalidObjectKey { offset } => {
                write!(f, "non-string object key at offset {}", offset)
            }
            Error::TypeMismatch {
                expected,
                actual,
                path,
            } => {
                write!(f, "expected {}, found {}", expected, actual)?;
                for seg in path {
                    write!(f, "{}", seg)?;
                }
                Ok(())
            }
            Error::NonConformingFloat { offset } => {
                write!(f, "non-conforming float (NaN/Infinity) at offset {}", offset)
            }
            Error::BigNumberOutOfRange { offset } => write!(
                f,
                "big number out of implementation range at offset {}",
                offset
            ),
            Error::TrailingBytes { offset } => {
                write!(f, "trailing bytes after root value at offset {}", offset)
            }
            Error::NonCanonicalLength { offset } => {
                write!(f, "non-canonical length field at offset {}", offset)
            }
            Error::EmptyChunkContinuation { offset } => write!(
                f,
                "empty chunk with continuation bit set at offset {}",
                offset
            ),
            Error::ContainerTooDeep { offset } => {
                write!(f, "container nesting too deep at offset {}", offset)
            }
            Error::ContainerTooLarge { offset } => {
                write!(f, "container exceeds maximum size at offset {}", offset)
            }
            Error::StringTooLong { offset } => {
                write!(f, "string exceeds maximum length at offset {}", offset)
            }
            Error::DocumentTooLarge { offset } => {
                write!(f, "document exceeds maximum size at offset {}", offset)
            }
            Error::MaxChunksExceeded { offset } => write!(
                f,
                "long-form string exceeds maximum chunk count at offset {}",
                offset
            ),
            Error::UnclosedContainer { offset } => {
                write!(f, "input ended inside an open container at offset {}", offset)
            }
            Error::InvalidData { offset } => write!(f, "malformed input at offset {}", offset),
        }
    }
}

impl std::error::Error for Error {}
