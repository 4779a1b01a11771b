//! Position-map accessor (component C7): random-access reads over a
//! scanned document. Follows the common pattern of parsing a header once
//! over owned bytes and handing back typed views into it; the per-object
//! lazy key→index cache satisfies the write-once interior-mutation
//! requirement directly.
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::bignum::BigNum;
use crate::error::{Error, Result};
use crate::policy::{DecodeFlags, KEY_CACHE_THRESHOLD};
use crate::scanner::{self, Payload};
use crate::type_code::TypeTag;

/// Index of an entry in a [`Map`]'s entry table.
pub type EntryIndex = usize;

/// A scanned, randomly-accessible BONJSON document. Owns a copy of the
/// input bytes plus a second buffer holding reassembled (chunked or
/// UTF-8-transformed) string content; every [`EntryIndex`] it hands out
/// stays valid for the map's lifetime.
pub struct Map {
    input: Vec<u8>,
    extra: Vec<u8>,
    entries: Vec<scanner::Entry>,
    key_cache: RefCell<HashMap<EntryIndex, Rc<HashMap<String, EntryIndex>>>>,
}

impl Map {
    /// Scans `bytes` under `flags` and returns a ready-to-query map.
    pub fn scan(bytes: &[u8], flags: DecodeFlags) -> Result<Map> {
        let scanned = scanner::scan(bytes, flags)?;
        Ok(Map {
            input: bytes.to_vec(),
            extra: scanned.extra,
            entries: scanned.entries,
            key_cache: RefCell::new(HashMap::new()),
        })
    }

    /// The root entry's index; always `0` for a non-empty map.
    pub fn root(&self) -> EntryIndex {
        0
    }

    /// Total number of entries in the document.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn entry(&self, i: EntryIndex) -> &scanner::Entry {
        &self.entries[i]
    }

    fn mismatch(&self, i: EntryIndex, expected: &'static str) -> Error {
        Error::TypeMismatch {
            expected,
            actual: self.entry(i).tag.name(),
            path: Vec::new(),
        }
    }

    pub fn type_at(&self, i: EntryIndex) -> TypeTag {
        self.entry(i).tag
    }

    /// Index of the entry immediately following `i`'s subtree.
    pub fn next_sibling(&self, i: EntryIndex) -> EntryIndex {
        self.entry(i).next_sibling
    }

    pub fn bool_at(&self, i: EntryIndex) -> Result<bool> {
        match self.entry(i).payload {
            Payload::Bool(b) => Ok(b),
            _ => Err(self.mismatch(i, "bool")),
        }
    }

    pub fn int_at(&self, i: EntryIndex) -> Result<i64> {
        match self.entry(i).payload {
            Payload::Int(v) => Ok(v),
            _ => Err(self.mismatch(i, "int")),
        }
    }

    pub fn uint_at(&self, i: EntryIndex) -> Result<u64> {
        match self.entry(i).payload {
            Payload::UInt(v) => Ok(v),
            _ => Err(self.mismatch(i, "uint")),
        }
    }

    pub fn float_at(&self, i: EntryIndex) -> Result<f64> {
        match self.entry(i).payload {
            Payload::Float(v) => Ok(v),
            _ => Err(self.mismatch(i, "float")),
        }
    }

    pub fn bignum_at(&self, i: EntryIndex) -> Result<BigNum> {
        match self.entry(i).payload {
            Payload::BigNum(b) => Ok(b),
            _ => Err(self.mismatch(i, "bignum")),
        }
    }

    /// Returns a string view. Always borrowed: chunked and
    /// policy-transformed strings were already assembled into the map's
    /// `extra` buffer at scan time, so there is never a copy on access.
    pub fn string_at(&self, i: EntryIndex) -> Result<std::borrow::Cow<'_, str>> {
        match self.entry(i).payload {
            Payload::String { offset, length, in_extra, .. } => {
                let buf: &[u8] = if in_extra { &self.extra } else { &self.input };
                let bytes = &buf[offset..offset + length];
                Ok(std::borrow::Cow::Borrowed(
                    std::str::from_utf8(bytes).expect("validated during scan"),
                ))
            }
            _ => Err(self.mismatch(i, "string")),
        }
    }

    /// Whether `stringAt(i)` required chunk reassembly at scan time.
    pub fn string_is_chunked(&self, i: EntryIndex) -> Result<bool> {
        match self.entry(i).payload {
            Payload::String { chunked, .. } => Ok(chunked),
            _ => Err(self.mismatch(i, "string")),
        }
    }

    /// Logical child count: array element count, or object pair count
    /// with any `keepFirst`/`keepLast` losers excluded.
    pub fn child_count_of(&self, i: EntryIndex) -> usize {
        match self.entry(i).tag {
            TypeTag::Array => match self.entry(i).payload {
                Payload::Container { count, .. } => count,
                _ => 0,
            },
            TypeTag::Object => self.object_pairs(i).len(),
            _ => 0,
        }
    }

    /// Index of the `k`-th logical child. For arrays, `k` is an element
    /// index; for objects, `k` indexes the flattened `[key0, value0,
    /// key1, value1, ...]` sequence of surviving (non-inert) pairs.
    pub fn child_at(&self, i: EntryIndex, k: usize) -> Result<EntryIndex> {
        match self.entry(i).tag {
            TypeTag::Array => {
                let mut idx = i + 1;
                for _ in 0..k {
                    idx = self.entry(idx).next_sibling;
                }
                Ok(idx)
            }
            TypeTag::Object => {
                let pairs = self.object_pairs(i);
                let (key_idx, val_idx) = *pairs
                    .get(k / 2)
                    .ok_or_else(|| Error::TypeMismatch { expected: "child in range", actual: "out of range", path: Vec::new() })?;
                Ok(if k % 2 == 0 { key_idx } else { val_idx })
            }
            _ => Err(self.mismatch(i, "container")),
        }
    }

    /// Walks the physical `[key, value]` chain under an object header,
    /// skipping any pair marked inert by duplicate-key resolution.
    fn object_pairs(&self, i: EntryIndex) -> Vec<(EntryIndex, EntryIndex)> {
        let Payload::Container { count: physical_pairs, .. } = self.entry(i).payload else {
            return Vec::new();
        };
        let mut pairs = Vec::with_capacity(physical_pairs);
        let mut idx = i + 1;
        for _ in 0..physical_pairs {
            let key_idx = idx;
            let val_idx = self.entry(key_idx).next_sibling;
            if !self.entry(key_idx).inert {
                pairs.push((key_idx, val_idx));
            }
            idx = self.entry(val_idx).next_sibling;
        }
        pairs
    }

    /// Looks up `key` in the object at `object_index`. Small objects
    /// (at most [`KEY_CACHE_THRESHOLD`] pairs) use a linear bytewise scan;
    /// larger ones build (once, lazily) a key→index hash map cached
    /// inside the map for the rest of its lifetime.
    pub fn find_key(&self, object_index: EntryIndex, key: &str) -> Result<Option<EntryIndex>> {
        if self.entry(object_index).tag != TypeTag::Object {
            return Err(self.mismatch(object_index, "object"));
        }
        let pairs = self.object_pairs(object_index);
        if pairs.len() <= KEY_CACHE_THRESHOLD {
            for (key_idx, val_idx) in pairs {
                if self.string_at(key_idx)?.as_ref() == key {
                    return Ok(Some(val_idx));
                }
            }
            return Ok(None);
        }

        if let Some(cached) = self.key_cache.borrow().get(&object_index) {
            return Ok(cached.get(key).copied());
        }
        let mut map = HashMap::with_capacity(pairs.len());
        for (key_idx, val_idx) in &pairs {
            map.insert(self.string_at(*key_idx)?.into_owned(), *val_idx);
        }
        let map = Rc::new(map);
        self.key_cache.borrow_mut().insert(object_index, map.clone());
        Ok(map.get(key).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;
    use crate::policy::{DecodeFlags, DuplicateKeyPolicy, EncodeFlags};

    fn build(f: impl FnOnce(&mut Encoder)) -> Vec<u8> {
        let mut e = Encoder::new(EncodeFlags::default());
        f(&mut e);
        e.finish().unwrap()
    }

    #[test]
    fn array_sequential_child_access() {
        let bytes = build(|e| {
            e.begin_array().unwrap();
            for i in 0..10 {
                e.write_i64(i).unwrap();
            }
            e.end().unwrap();
        });
        let map = Map::scan(&bytes, DecodeFlags::default()).unwrap();
        let root = map.root();
        assert_eq!(map.child_count_of(root), 10);
        for i in 0..10 {
            let child = map.child_at(root, i).unwrap();
            assert_eq!(map.int_at(child).unwrap(), i as i64);
        }
    }

    #[test]
    fn object_find_key_small() {
        let bytes = build(|e| {
            e.begin_object().unwrap();
            e.write_string("a").unwrap();
            e.write_i64(1).unwrap();
            e.write_string("b").unwrap();
            e.write_i64(2).unwrap();
            e.end().unwrap();
        });
        let map = Map::scan(&bytes, DecodeFlags::default()).unwrap();
        let root = map.root();
        let a = map.find_key(root, "a").unwrap().unwrap();
        assert_eq!(map.int_at(a).unwrap(), 1);
        let b = map.find_key(root, "b").unwrap().unwrap();
        assert_eq!(map.int_at(b).unwrap(), 2);
        assert!(map.find_key(root, "z").unwrap().is_none());
    }

    #[test]
    fn object_find_key_large_uses_cache() {
        let bytes = build(|e| {
            e.begin_object().unwrap();
            for i in 0..50 {
                e.write_string(&format!("k{i}")).unwrap();
                e.write_i64(i).unwrap();
            }
            e.end().unwrap();
        });
        let map = Map::scan(&bytes, DecodeFlags::default()).unwrap();
        let root = map.root();
        for i in 0..50 {
            let v = map.find_key(root, &format!("k{i}")).unwrap().unwrap();
            assert_eq!(map.int_at(v).unwrap(), i as i64);
        }
        assert_eq!(map.key_cache.borrow().len(), 1);
    }

    #[test]
    fn type_mismatch_error() {
        let bytes = build(|e| {
            e.write_i64(5).unwrap();
        });
        let map = Map::scan(&bytes, DecodeFlags::default()).unwrap();
        assert!(matches!(
            map.bool_at(map.root()),
            Err(Error::TypeMismatch { expected: "bool", actual: "int", .. })
        ));
    }

    #[test]
    fn duplicate_key_keep_last_excluded_from_logical_children() {
        let bytes = build(|e| {
            e.begin_object().unwrap();
            e.write_string("a").unwrap();
            e.write_i64(1).unwrap();
            e.write_string("a").unwrap();
            e.write_i64(2).unwrap();
            e.end().unwrap();
        });
        let mut flags = DecodeFlags::default();
        flags.duplicate_key = DuplicateKeyPolicy::KeepLast;
        let map = Map::scan(&bytes, flags).unwrap();
        let root = map.root();
        assert_eq!(map.child_count_of(root), 1);
        let v = map.find_key(root, "a").unwrap().unwrap();
        assert_eq!(map.int_at(v).unwrap(), 2);
    }

    #[test]
    fn preorder_indexing_invariant() {
        let bytes = build(|e| {
            e.begin_array().unwrap();
            e.begin_object().unwrap();
            e.write_string("x").unwrap();
            e.write_i64(1).unwrap();
            e.end().unwrap();
            e.write_i64(2).unwrap();
            e.end().unwrap();
        });
        let map = Map::scan(&bytes, DecodeFlags::default()).unwrap();
        assert_eq!(map.next_sibling(map.root()), map.len());
        let root = map.root();
        let mut prev_end = root + 1;
        for k in 0..map.child_count_of(root) {
            let child = map.child_at(root, k).unwrap();
            assert_eq!(child, prev_end);
            prev_end = map.next_sibling(child);
        }
        assert_eq!(prev_end, map.next_sibling(root));
    }
}
