//! UTF-8 validator (component C4): validates a fully-assembled string
//! against the rejection rules (malformed continuations, overlong forms,
//! surrogates, code points beyond U+10FFFF — exactly what Rust's own
//! `str` invariant already enforces) and applies one of the three
//! decode-time policies.
use crate::error::{Error, Result};
use crate::policy::Utf8Policy;

/// Validates `bytes` at the given `base_offset` (used only for error
/// reporting) according to `policy`, returning an owned `String`.
pub fn validate(bytes: &[u8], base_offset: usize, policy: Utf8Policy) -> Result<String> {
    match policy {
        Utf8Policy::Reject => match std::str::from_utf8(bytes) {
            Ok(s) => Ok(s.to_owned()),
            Err(e) => Err(Error::InvalidUtf8 {
                offset: base_offset + e.valid_up_to(),
            }),
        },
        Utf8Policy::Replace => Ok(String::from_utf8_lossy(bytes).into_owned()),
        Utf8Policy::Delete => Ok(delete_invalid(bytes)),
    }
}

/// Removes invalid byte subsequences entirely, keeping every byte that
/// participates in a valid encoded scalar value.
fn delete_invalid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                break;
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                out.push_str(std::str::from_utf8(&rest[..valid_up_to]).unwrap());
                let invalid_len = e.error_len().unwrap_or(rest.len() - valid_up_to);
                rest = &rest[valid_up_to + invalid_len.max(1)..];
                if rest.is_empty() {
                    break;
                }
            }
        }
    }
    out
}

/// Checks whether an already-validated `str` contains a literal NUL byte,
/// applying the (orthogonal) NUL policy.
pub fn check_nul(s: &str, offset: usize, policy: crate::policy::NulPolicy) -> Result<()> {
    if policy == crate::policy::NulPolicy::Reject && s.as_bytes().contains(&0) {
        return Err(Error::NulCharacterInString { offset });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_example_reject() {
        let bytes = [b'a', 0x80, b'b'];
        let err = validate(&bytes, 0, Utf8Policy::Reject).unwrap_err();
        assert_eq!(err, Error::InvalidUtf8 { offset: 1 });
    }

    #[test]
    fn spec_example_replace() {
        let bytes = [b'a', 0x80, b'b'];
        let s = validate(&bytes, 0, Utf8Policy::Replace).unwrap();
        assert_eq!(s, "a\u{FFFD}b");
    }

    #[test]
    fn spec_example_delete() {
        let bytes = [b'a', 0x80, b'b'];
        let s = validate(&bytes, 0, Utf8Policy::Delete).unwrap();
        assert_eq!(s, "ab");
    }

    #[test]
    fn valid_utf8_passes_all_policies() {
        let bytes = "héllo".as_bytes();
        for policy in [Utf8Policy::Reject, Utf8Policy::Replace, Utf8Policy::Delete] {
            assert_eq!(validate(bytes, 0, policy).unwrap(), "héllo");
        }
    }

    #[test]
    fn overlong_encoding_rejected() {
        let bytes = [0xC0, 0x80]; // overlong NUL
        assert!(validate(&bytes, 0, Utf8Policy::Reject).is_err());
    }

    #[test]
    fn surrogate_half_rejected() {
        let bytes = [0xED, 0xA0, 0x80]; // encodes U+D800
        assert!(validate(&bytes, 0, Utf8Policy::Reject).is_err());
    }

    #[test]
    fn nul_policy_reject_and_allow() {
        assert!(check_nul("a\0b", 0, crate::policy::NulPolicy::Reject).is_err());
        assert!(check_nul("a\0b", 0, crate::policy::NulPolicy::Allow).is_ok());
    }

    #[test]
    fn delete_trailing_invalid_bytes() {
        let bytes = [b'a', b'b', 0xFF];
        assert_eq!(validate(&bytes, 0, Utf8Policy::Delete).unwrap(), "ab");
    }
}
