//! Value Model Module
//!
//! Wraps client-supplied payloads into their canonical stored form. Raw byte
//! sequences become chunked [`BinaryObject`]s with a stable identity for
//! sizing and hashing; anything else is stored as an opaque reference.

use std::any::Any;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::config::{Config, DEFAULT_CHUNK_SIZE};
use crate::entry::BitSet;
use crate::error::{CacheError, Result};
use crate::framing::{Compact, CompactReader, CompactWriter};

/// An opaque, immutable payload reference the core does not interpret.
pub type OpaqueValue = Arc<dyn Any + Send + Sync>;

// == Binary Object ==
/// Canonical binary-object form of a raw byte payload.
///
/// Large payloads are split into fixed-size chunks so no single allocation
/// exceeds the chunk threshold. The logical byte sequence is the object's
/// identity: two objects with the same bytes are equal and hash alike,
/// regardless of how they are chunked.
#[derive(Debug, Clone)]
pub struct BinaryObject {
    /// Payload split into chunks of at most `chunk_size` bytes
    chunks: Vec<Vec<u8>>,
    /// Logical payload length in bytes
    len: usize,
}

impl BinaryObject {
    /// Creates a binary object from raw bytes using the default chunk size.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self::with_chunk_size(data, DEFAULT_CHUNK_SIZE)
    }

    /// Creates a binary object from raw bytes using the configured chunk
    /// size.
    pub fn from_config(data: &[u8], config: &Config) -> Self {
        Self::with_chunk_size(data, config.chunk_size)
    }

    /// Creates a binary object from raw bytes with an explicit chunk size.
    pub fn with_chunk_size(data: &[u8], chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let chunks = data.chunks(chunk_size).map(|c| c.to_vec()).collect();
        Self {
            chunks,
            len: data.len(),
        }
    }

    /// Logical payload length in bytes.
    pub fn size(&self) -> usize {
        self.len
    }

    /// Number of chunks the payload is split into.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Iterates over the payload chunks in order.
    pub fn chunks(&self) -> impl Iterator<Item = &[u8]> {
        self.chunks.iter().map(|c| c.as_slice())
    }

    /// Reassembles the payload into a single contiguous buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }
}

impl PartialEq for BinaryObject {
    fn eq(&self, other: &Self) -> bool {
        // Identity is the logical byte sequence, not the chunking
        self.len == other.len
            && self
                .chunks()
                .flatten()
                .eq(other.chunks().flatten())
    }
}

impl Eq for BinaryObject {}

impl Hash for BinaryObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for chunk in &self.chunks {
            state.write(chunk);
        }
        state.write_usize(self.len);
    }
}

impl Compact for BinaryObject {
    fn serialize(&self, writer: &mut CompactWriter) -> Result<()> {
        writer.write_u32(crate::framing::encode_len(self.len)?);
        for chunk in &self.chunks {
            writer.write_raw(chunk);
        }
        Ok(())
    }

    fn deserialize(reader: &mut CompactReader) -> Result<Self> {
        let len = reader.read_u32()? as usize;
        let data = reader.read_raw(len)?;
        Ok(Self::from_bytes(data))
    }
}

// == Entry Value ==
/// The stored form of a client payload.
///
/// Mutated in place with no internal synchronization: the caller is
/// contractually required to hold the entry's lock before replacing a value.
#[derive(Clone)]
pub enum EntryValue {
    /// Canonical binary-object form of a raw byte payload
    Binary(BinaryObject),
    /// Opaque reference the core does not interpret
    Opaque(OpaqueValue),
}

impl EntryValue {
    /// Wraps a raw byte payload into its canonical binary-object form.
    ///
    /// Establishes the value's identity for downstream size accounting.
    pub fn wrap(payload: &[u8]) -> Self {
        EntryValue::Binary(BinaryObject::from_bytes(payload))
    }

    /// Stores an already-constructed payload as an opaque reference.
    pub fn opaque(payload: OpaqueValue) -> Self {
        EntryValue::Opaque(payload)
    }

    /// Logical size in bytes, if the value has one.
    pub fn size(&self) -> Option<usize> {
        match self {
            EntryValue::Binary(b) => Some(b.size()),
            EntryValue::Opaque(_) => None,
        }
    }

    /// Returns the binary form, if this value is canonical bytes.
    pub fn as_binary(&self) -> Option<&BinaryObject> {
        match self {
            EntryValue::Binary(b) => Some(b),
            EntryValue::Opaque(_) => None,
        }
    }
}

impl std::fmt::Debug for EntryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryValue::Binary(b) => f.debug_tuple("Binary").field(&b.size()).finish(),
            EntryValue::Opaque(_) => f.write_str("Opaque"),
        }
    }
}

impl PartialEq for EntryValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EntryValue::Binary(a), EntryValue::Binary(b)) => a == b,
            (EntryValue::Opaque(a), EntryValue::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Frame tag for a binary entry value.
const VALUE_TAG_BINARY: u8 = 0;

impl Compact for EntryValue {
    fn serialize(&self, writer: &mut CompactWriter) -> Result<()> {
        match self {
            EntryValue::Binary(b) => {
                writer.write_u8(VALUE_TAG_BINARY);
                b.serialize(writer)
            }
            EntryValue::Opaque(_) => Err(CacheError::SerializationFormat(
                "opaque value cannot be framed".to_string(),
            )),
        }
    }

    fn deserialize(reader: &mut CompactReader) -> Result<Self> {
        match reader.read_u8()? {
            VALUE_TAG_BINARY => Ok(EntryValue::Binary(BinaryObject::deserialize(reader)?)),
            other => Err(CacheError::SerializationFormat(format!(
                "unknown value tag {}",
                other
            ))),
        }
    }
}

// == Compressed Value Entry ==
/// A (value, flag-set) pair carrying the compression/format hints needed to
/// decode the value without a round trip.
///
/// Construction is pure data assembly. The flag-set is a non-optional field,
/// so compression metadata is always present when a compression bit is set.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedValueEntry {
    /// The (possibly compressed) payload
    pub value: EntryValue,
    /// Compression/format/type hints
    pub flags: BitSet,
}

impl CompressedValueEntry {
    /// Assembles a compressed-value pair.
    pub fn new(value: EntryValue, flags: BitSet) -> Self {
        Self { value, flags }
    }
}

impl Compact for CompressedValueEntry {
    fn serialize(&self, writer: &mut CompactWriter) -> Result<()> {
        self.flags.serialize(writer)?;
        self.value.serialize(writer)
    }

    fn deserialize(reader: &mut CompactReader) -> Result<Self> {
        let flags = BitSet::deserialize(reader)?;
        let value = EntryValue::deserialize(reader)?;
        Ok(Self { value, flags })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::flags::FLAG_COMPRESSED;

    #[test]
    fn test_binary_object_small_payload_single_chunk() {
        let obj = BinaryObject::from_bytes(b"hello");
        assert_eq!(obj.size(), 5);
        assert_eq!(obj.chunk_count(), 1);
        assert_eq!(obj.to_vec(), b"hello");
    }

    #[test]
    fn test_binary_object_large_payload_is_chunked() {
        let data = vec![7u8; 10_000];
        let obj = BinaryObject::with_chunk_size(&data, 4096);
        assert_eq!(obj.size(), 10_000);
        assert_eq!(obj.chunk_count(), 3);
        assert_eq!(obj.to_vec(), data);
    }

    #[test]
    fn test_binary_object_chunk_size_comes_from_config() {
        let config = Config {
            chunk_size: 256,
            ..Config::default()
        };
        let data = vec![1u8; 1000];
        let obj = BinaryObject::from_config(&data, &config);
        assert_eq!(obj.chunk_count(), 4);
        assert_eq!(obj.to_vec(), data);
    }

    #[test]
    fn test_binary_object_identity_independent_of_chunking() {
        let data: Vec<u8> = (0..=255).cycle().take(1000).collect();
        let a = BinaryObject::with_chunk_size(&data, 100);
        let b = BinaryObject::with_chunk_size(&data, 333);
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrap_raw_bytes_becomes_binary() {
        let value = EntryValue::wrap(b"payload");
        assert!(value.as_binary().is_some());
        assert_eq!(value.size(), Some(7));
    }

    #[test]
    fn test_opaque_value_has_no_size() {
        let value = EntryValue::opaque(Arc::new(String::from("object")));
        assert!(value.as_binary().is_none());
        assert_eq!(value.size(), None);
    }

    #[test]
    fn test_opaque_value_cannot_be_framed() {
        let value = EntryValue::opaque(Arc::new(42u32));
        let mut writer = CompactWriter::new();
        assert!(value.serialize(&mut writer).is_err());
    }

    #[test]
    fn test_compressed_value_entry_roundtrip() {
        let mut flags = BitSet::new();
        flags.set_bit(FLAG_COMPRESSED);
        let entry = CompressedValueEntry::new(EntryValue::wrap(b"compressed bytes"), flags);

        let mut writer = CompactWriter::new();
        entry.serialize(&mut writer).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = CompactReader::new(&bytes);
        let decoded = CompressedValueEntry::deserialize(&mut reader).unwrap();
        assert_eq!(decoded, entry);
    }
}
