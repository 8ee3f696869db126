//! Flag-Set Module
//!
//! Compact bit flags carrying the compression/format/type hints an entry or
//! compressed value needs so a consumer can decode it without a round trip.

use crate::error::Result;
use crate::framing::{Compact, CompactReader, CompactWriter};

// == Flag Constants ==
/// The payload is stored compressed.
pub const FLAG_COMPRESSED: u8 = 0x01;
/// The payload is a canonical binary object (raw bytes, not an opaque reference).
pub const FLAG_BINARY_DATA: u8 = 0x02;
/// The payload was serialized by the client (server treats it as opaque bytes).
pub const FLAG_CLIENT_SERIALIZED: u8 = 0x04;
/// The payload is JSON-encoded.
pub const FLAG_JSON_DATA: u8 = 0x08;

// == Bit Set ==
/// A one-byte flag-set attached to entries, compressed values and snapshots.
///
/// Cheap to copy; crosses the wire as a single byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BitSet {
    data: u8,
}

impl BitSet {
    /// Creates an empty flag-set.
    pub fn new() -> Self {
        Self { data: 0 }
    }

    /// Creates a flag-set from a raw byte.
    pub fn from_byte(data: u8) -> Self {
        Self { data }
    }

    /// Returns the raw byte.
    pub fn data(&self) -> u8 {
        self.data
    }

    /// Sets the given bit(s).
    pub fn set_bit(&mut self, bit: u8) {
        self.data |= bit;
    }

    /// Clears the given bit(s).
    pub fn unset_bit(&mut self, bit: u8) {
        self.data &= !bit;
    }

    /// Returns true if every one of the given bits is set.
    pub fn is_bit_set(&self, bit: u8) -> bool {
        self.data & bit == bit
    }

    /// Returns true if any of the given bits is set.
    pub fn is_any_bit_set(&self, bit: u8) -> bool {
        self.data & bit != 0
    }
}

impl Compact for BitSet {
    fn serialize(&self, writer: &mut CompactWriter) -> Result<()> {
        writer.write_u8(self.data);
        Ok(())
    }

    fn deserialize(reader: &mut CompactReader) -> Result<Self> {
        Ok(Self::from_byte(reader.read_u8()?))
    }
}
