//! Binary snapshot codec (spec §4.I, §6).
//!
//! Little-endian, length-prefixed. `i32` for ids, `i64` for long ids,
//! `u32` for counts; strings are `u32` length + UTF-8 bytes, or `-1`
//! (encoded as `u32::MAX`) for null; sequences are `u32` count then
//! elements. Cycle tracking is a context-local table, opt-in per field via
//! `write_cyclable`/`read_cyclable` rather than always-on, matching spec
//! §4.I's "opt-in per field" requirement.

use crate::error::SnapshotError;
use fxhash::FxHashMap;
use std::io::Write as _;

const NULL_STRING_LEN: u32 = u32::MAX;

/// Appends primitives, strings, and sequences to an in-memory byte buffer
/// in the wire format spec §6 defines.
#[derive(Default)]
pub struct SnapshotWriter {
    buf: Vec<u8>,
    /// Maps a cycle-tracked value's identity (host-assigned) to the byte
    /// offset at which its canonical encoding began, so repeat references
    /// can be written as a back-reference instead of re-encoded.
    seen: FxHashMap<u64, u32>,
}

impl SnapshotWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }

    pub fn write_string(&mut self, value: Option<&str>) {
        match value {
            None => self.write_u32(NULL_STRING_LEN),
            Some(s) => {
                self.write_u32(s.len() as u32);
                // Vec<u8>::write_all is infallible.
                let _ = self.buf.write_all(s.as_bytes());
            }
        }
    }

    /// Write a length-prefixed sequence, encoding each element with `f`.
    pub fn write_sequence<T>(&mut self, items: &[T], mut f: impl FnMut(&mut Self, &T)) {
        self.write_u32(items.len() as u32);
        for item in items {
            f(self, item);
        }
    }

    /// Write a cycle-tracked reference: `identity` is a host-assigned
    /// stable id for the value (e.g. its handle bits). On first encounter,
    /// writes a `0` discriminant followed by the body from `f`; on a
    /// repeat, writes a `1` discriminant followed by the offset of the
    /// original encoding (spec §4.I: "opt-in per field").
    pub fn write_cyclable(&mut self, identity: u64, mut f: impl FnMut(&mut Self)) {
        if let Some(&offset) = self.seen.get(&identity) {
            self.buf.push(1);
            self.write_u32(offset);
            return;
        }
        self.buf.push(0);
        let offset = self.buf.len() as u32;
        self.seen.insert(identity, offset);
        f(self);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Reads primitives, strings, and sequences back out of a byte buffer
/// written by [`SnapshotWriter`].
pub struct SnapshotReader<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Maps an original encoding's byte offset to the already-decoded
    /// value's clone identity, for resolving cycle back-references.
    seen: FxHashMap<u32, u64>,
}

impl<'a> SnapshotReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        SnapshotReader {
            buf,
            pos: 0,
            seen: FxHashMap::default(),
        }
    }

    fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], SnapshotError> {
        if self.pos + len > self.buf.len() {
            return Err(SnapshotError::Truncated(what));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_i32(&mut self) -> Result<i32, SnapshotError> {
        let bytes = self.take(4, "i32")?;
        Ok(i32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_i64(&mut self) -> Result<i64, SnapshotError> {
        let bytes = self.take(8, "i64")?;
        Ok(i64::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_u32(&mut self) -> Result<u32, SnapshotError> {
        let bytes = self.take(4, "u32")?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_bool(&mut self) -> Result<bool, SnapshotError> {
        let bytes = self.take(1, "bool")?;
        Ok(bytes[0] != 0)
    }

    pub fn read_string(&mut self) -> Result<Option<String>, SnapshotError> {
        let len = self.read_u32()?;
        if len == NULL_STRING_LEN {
            return Ok(None);
        }
        let bytes = self.take(len as usize, "string contents")?;
        Ok(Some(String::from_utf8(bytes.to_vec())?))
    }

    /// Read a length-prefixed sequence, decoding each element with `f`.
    pub fn read_sequence<T>(
        &mut self,
        mut f: impl FnMut(&mut Self) -> Result<T, SnapshotError>,
    ) -> Result<Vec<T>, SnapshotError> {
        let count = self.read_u32()? as usize;
        let mut out = Vec::with_capacity(count.min(1 << 16));
        for _ in 0..count {
            out.push(f(self)?);
        }
        Ok(out)
    }

    /// Read a cycle-tracked value written by `write_cyclable`. `identity`
    /// is the clone identity to register this decoded value under, for
    /// any later back-reference to resolve against.
    pub fn read_cyclable<T>(
        &mut self,
        identity: u64,
        f: impl FnOnce(&mut Self) -> Result<T, SnapshotError>,
    ) -> Result<CyclableRead<T>, SnapshotError> {
        let discriminant = self.take(1, "cyclable discriminant")?[0];
        if discriminant == 1 {
            let offset = self.read_u32()?;
            let original = *self
                .seen
                .get(&offset)
                .ok_or(SnapshotError::Truncated("cyclable back-reference"))?;
            return Ok(CyclableRead::BackReference(original));
        }
        let offset = self.pos as u32;
        self.seen.insert(offset, identity);
        Ok(CyclableRead::Value(f(self)?))
    }
}

/// Result of reading a cycle-tracked field: either the freshly decoded
/// value, or a reference to a clone identity already decoded earlier in
/// the buffer.
pub enum CyclableRead<T> {
    Value(T),
    BackReference(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_roundtrip() {
        let mut w = SnapshotWriter::new();
        w.write_i32(-42);
        w.write_i64(-1_000_000_000_000);
        w.write_u32(7);
        w.write_bool(true);
        let bytes = w.into_bytes();

        let mut r = SnapshotReader::new(&bytes);
        assert_eq!(r.read_i32().unwrap(), -42);
        assert_eq!(r.read_i64().unwrap(), -1_000_000_000_000);
        assert_eq!(r.read_u32().unwrap(), 7);
        assert_eq!(r.read_bool().unwrap(), true);
    }

    #[test]
    fn strings_roundtrip_including_null() {
        let mut w = SnapshotWriter::new();
        w.write_string(Some("goblin"));
        w.write_string(None);
        let bytes = w.into_bytes();

        let mut r = SnapshotReader::new(&bytes);
        assert_eq!(r.read_string().unwrap(), Some("goblin".to_string()));
        assert_eq!(r.read_string().unwrap(), None);
    }

    #[test]
    fn sequence_roundtrips() {
        let mut w = SnapshotWriter::new();
        w.write_sequence(&[1i32, 2, 3], |w, v| w.write_i32(*v));
        let bytes = w.into_bytes();

        let mut r = SnapshotReader::new(&bytes);
        let values = r.read_sequence(|r| r.read_i32()).unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn truncated_buffer_reports_truncated_error() {
        let bytes = vec![1u8, 2];
        let mut r = SnapshotReader::new(&bytes);
        assert!(matches!(r.read_i32(), Err(SnapshotError::Truncated("i32"))));
    }

    #[test]
    fn cyclable_back_reference_resolves_to_original_identity() {
        let mut w = SnapshotWriter::new();
        w.write_cyclable(100, |w| w.write_i32(1));
        w.write_cyclable(100, |w| w.write_i32(1));
        let bytes = w.into_bytes();

        let mut r = SnapshotReader::new(&bytes);
        let first = r.read_cyclable(100, |r| r.read_i32()).unwrap();
        assert!(matches!(first, CyclableRead::Value(1)));
        let second = r.read_cyclable(200, |r| r.read_i32());
        assert!(matches!(second, Ok(CyclableRead::BackReference(100))));
    }
}
