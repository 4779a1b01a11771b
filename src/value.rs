//! The `Value` tagged union, plus `encode_value`/`decode_value` convenience
//! wrappers over the `Encoder`/`Map` handles.
//!
//! Objects are an ordered `Vec<(String, Value)>`, not a sorted map — BONJSON
//! objects preserve insertion order and are not canonically sorted.
use crate::bignum::BigNum;
use crate::encoder::Encoder;
use crate::error::Result;
use crate::map::{EntryIndex, Map};
use crate::policy::{DecodeFlags, EncodeFlags};
use crate::type_code::TypeTag;

/// An in-memory BONJSON value tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    BigNum(BigNum),
    String(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::UInt(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::UInt(v) => Some(v),
            Value::Int(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float(v) => Some(v),
            Value::Int(v) => Some(v as f64),
            Value::UInt(v) => Some(v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Object(v) => Some(v),
            _ => None,
        }
    }

    /// Looks up a key in an object by insertion-order linear scan. Returns
    /// `None` both for non-objects and for a missing key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object()?.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}
impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

/// Encodes `value` to a byte buffer using the given flags.
pub fn encode_value(value: &Value, flags: EncodeFlags) -> Result<Vec<u8>> {
    let mut enc = Encoder::new(flags);
    write_value(&mut enc, value)?;
    enc.finish()
}

fn write_value(enc: &mut Encoder, value: &Value) -> Result<()> {
    match value {
        Value::Null => enc.write_null(),
        Value::Bool(b) => enc.write_bool(*b),
        Value::Int(v) => enc.write_i64(*v),
        Value::UInt(v) => enc.write_u64(*v),
        Value::Float(v) => enc.write_f64(*v),
        Value::BigNum(b) => enc.write_bignum(*b),
        Value::String(s) => enc.write_string(s),
        Value::Array(items) => {
            enc.begin_array()?;
            for item in items {
                write_value(enc, item)?;
            }
            enc.end()
        }
        Value::Object(pairs) => {
            enc.begin_object()?;
            for (key, item) in pairs {
                enc.write_string(key)?;
                write_value(enc, item)?;
            }
            enc.end()
        }
    }
}

/// Scans `bytes` and materializes the whole tree as an owned `Value`.
pub fn decode_value(bytes: &[u8], flags: DecodeFlags) -> Result<Value> {
    let map = Map::scan(bytes, flags)?;
    build_value(&map, map.root())
}

fn build_value(map: &Map, index: EntryIndex) -> Result<Value> {
    Ok(match map.type_at(index) {
        TypeTag::Null => Value::Null,
        TypeTag::Bool => Value::Bool(map.bool_at(index)?),
        TypeTag::Int => Value::Int(map.int_at(index)?),
        TypeTag::UInt => Value::UInt(map.uint_at(index)?),
        TypeTag::Float => Value::Float(map.float_at(index)?),
        TypeTag::BigNum => Value::BigNum(map.bignum_at(index)?),
        TypeTag::String => Value::String(map.string_at(index)?.into_owned()),
        TypeTag::Array => {
            let count = map.child_count_of(index);
            let mut items = Vec::with_capacity(count);
            for k in 0..count {
                items.push(build_value(map, map.child_at(index, k)?)?);
            }
            Value::Array(items)
        }
        TypeTag::Object => {
            let count = map.child_count_of(index);
            let mut pairs = Vec::with_capacity(count);
            for k in 0..count {
                let key_idx = map.child_at(index, 2 * k)?;
                let val_idx = map.child_at(index, 2 * k + 1)?;
                let key = map.string_at(key_idx)?.into_owned();
                pairs.push((key, build_value(map, val_idx)?));
            }
            Value::Object(pairs)
        }
    })
}
