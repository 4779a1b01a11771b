//! BONJSON: a byte-exact binary encoding of JSON-compatible values.
//!
//! This crate provides three layers, pick whichever fits:
//!
//! - [`Encoder`] / [`encode_value`] to produce BONJSON bytes.
//! - [`Map`] for random-access reads over a scanned document without
//!   materializing a tree.
//! - [`Value`] / [`decode_value`] when an owned, fully-built tree is
//!   more convenient than lazy access.
//!
//! Decoding behavior (duplicate keys, invalid UTF-8, oversized documents,
//! non-canonical length fields, and so on) is controlled by [`DecodeFlags`];
//! encoding behavior by [`EncodeFlags`].
#![allow(dead_code)]

mod bignum;
mod encoder;
mod error;
mod float;
mod length;
mod map;
mod policy;
mod scanner;
mod type_code;
mod utf8;
mod value;

pub use bignum::BigNum;
pub use encoder::Encoder;
pub use error::{Error, PathSegment, Result};
pub use map::{EntryIndex, Map};
pub use policy::{
    DecodeFlags, DuplicateKeyPolicy, EncodeFlags, FloatPolicy, Limits, LengthPolicy, NulPolicy,
    TrailingBytesPolicy, Utf8Policy,
};
pub use type_code::TypeTag;
pub use value::{decode_value, encode_value, Value};
