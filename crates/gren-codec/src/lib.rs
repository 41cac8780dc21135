//! Deterministic binary codec for long-lived build artifacts
//!
//! Everything the build core persists between runs (`details.dat`,
//! `interfaces.dat`, `objects.dat`, per-package `artifacts.dat`) goes through
//! this codec. The format is deliberately simple: little-endian fixed-width
//! integers, u32 length prefixes for strings and sequences, a single
//! discriminant byte for sum types, and maps written as sorted key/value
//! sequences. Identical logical values always produce identical bytes, and
//! `decode(encode(x)) == x`.
//!
//! There is no cross-version compatibility story. Readers treat any unknown
//! tag or truncated stream as corruption and callers fall back to a rebuild.

pub mod file;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Codec errors: all of them mean "these bytes are not trustworthy".
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unexpected end of input at byte {at}")]
    UnexpectedEnd { at: usize },

    #[error("unknown tag byte {tag} while decoding {what}")]
    UnknownTag { tag: u8, what: &'static str },

    #[error("invalid UTF-8 in encoded string at byte {at}")]
    InvalidUtf8 { at: usize },

    #[error("{trailing} trailing bytes after a complete value")]
    TrailingBytes { trailing: usize },

    #[error("length prefix {len} exceeds remaining input ({remaining} bytes)")]
    BadLength { len: usize, remaining: usize },
}

/// A value that can be written to the deterministic byte format.
pub trait Encode {
    fn encode(&self, buf: &mut Vec<u8>);

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }
}

/// A value that can be reconstructed from the byte format.
pub trait Decode: Sized {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError>;

    /// Decode a complete value, rejecting trailing garbage.
    fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(bytes);
        let value = Self::decode(&mut reader)?;
        reader.expect_end()?;
        Ok(value)
    }
}

/// Cursor over an encoded byte slice.
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.bytes.len() - self.pos;
        if n > remaining {
            return Err(CodecError::UnexpectedEnd { at: self.pos });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, CodecError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> Result<u32, CodecError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self) -> Result<u64, CodecError> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Read a u32 length prefix, checking it against the remaining input so
    /// corrupt prefixes fail fast instead of attempting huge allocations.
    pub fn length(&mut self) -> Result<usize, CodecError> {
        let len = self.u32()? as usize;
        let remaining = self.bytes.len() - self.pos;
        if len > remaining {
            return Err(CodecError::BadLength { len, remaining });
        }
        Ok(len)
    }

    pub fn expect_end(&self) -> Result<(), CodecError> {
        let trailing = self.bytes.len() - self.pos;
        if trailing != 0 {
            return Err(CodecError::TrailingBytes { trailing });
        }
        Ok(())
    }
}

pub fn write_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

pub fn write_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

pub fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

pub fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_length(buf: &mut Vec<u8>, len: usize) {
    write_u32(buf, len as u32);
}

impl Encode for u8 {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_u8(buf, *self);
    }
}

impl Decode for u8 {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        reader.u8()
    }
}

impl Encode for u16 {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_u16(buf, *self);
    }
}

impl Decode for u16 {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        reader.u16()
    }
}

impl Encode for u32 {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_u32(buf, *self);
    }
}

impl Decode for u32 {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        reader.u32()
    }
}

impl Encode for u64 {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_u64(buf, *self);
    }
}

impl Decode for u64 {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        reader.u64()
    }
}

impl Encode for bool {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_u8(buf, *self as u8);
    }
}

impl Decode for bool {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        match reader.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(CodecError::UnknownTag { tag, what: "bool" }),
        }
    }
}

impl Encode for String {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_length(buf, self.len());
        buf.extend_from_slice(self.as_bytes());
    }
}

impl Decode for String {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let len = reader.length()?;
        let at = reader.position();
        let bytes = reader.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8 { at })
    }
}

impl Encode for PathBuf {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.to_string_lossy().into_owned().encode(buf);
    }
}

impl Decode for PathBuf {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(PathBuf::from(String::decode(reader)?))
    }
}

impl Encode for SystemTime {
    fn encode(&self, buf: &mut Vec<u8>) {
        // Pre-epoch timestamps collapse to the epoch itself; the staleness
        // check only needs equality with what we recorded.
        let since = self
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        write_u64(buf, since.as_secs());
        write_u32(buf, since.subsec_nanos());
    }
}

impl Decode for SystemTime {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let secs = reader.u64()?;
        let nanos = reader.u32()?;
        Ok(UNIX_EPOCH + Duration::new(secs, nanos))
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            None => write_u8(buf, 0),
            Some(v) => {
                write_u8(buf, 1);
                v.encode(buf);
            }
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        match reader.u8()? {
            0 => Ok(None),
            1 => Ok(Some(T::decode(reader)?)),
            tag => Err(CodecError::UnknownTag {
                tag,
                what: "Option",
            }),
        }
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_length(buf, self.len());
        for item in self {
            item.encode(buf);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let len = reader.length()?;
        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            items.push(T::decode(reader)?);
        }
        Ok(items)
    }
}

impl<K: Encode + Ord, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_length(buf, self.len());
        for (key, value) in self {
            key.encode(buf);
            value.encode(buf);
        }
    }
}

impl<K: Decode + Ord, V: Decode> Decode for BTreeMap<K, V> {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let len = reader.length()?;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let key = K::decode(reader)?;
            let value = V::decode(reader)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<T: Encode + Ord> Encode for BTreeSet<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_length(buf, self.len());
        for item in self {
            item.encode(buf);
        }
    }
}

impl<T: Decode + Ord> Decode for BTreeSet<T> {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let len = reader.length()?;
        let mut set = BTreeSet::new();
        for _ in 0..len {
            set.insert(T::decode(reader)?);
        }
        Ok(set)
    }
}

impl<A: Encode, B: Encode> Encode for (A, B) {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.0.encode(buf);
        self.1.encode(buf);
    }
}

impl<A: Decode, B: Decode> Decode for (A, B) {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok((A::decode(reader)?, B::decode(reader)?))
    }
}
