//! Compact Writer/Reader
//!
//! Hand-rolled little-endian codec over an in-memory buffer. Integers are
//! fixed-width, byte sequences and strings are u32-length-prefixed. Every
//! read is bounds-checked; running out of bytes rejects the frame.

use crate::error::{CacheError, Result};

/// Converts a payload length into the u32 length prefix, rejecting payloads
/// the prefix cannot represent. A wrapped prefix would disagree with the
/// bytes that follow and corrupt the frame.
pub(crate) fn encode_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        CacheError::SerializationFormat(format!(
            "payload of {} bytes exceeds the u32 length prefix",
            len
        ))
    })
}

// == Compact Trait ==
/// Two-sided fixed-order serialization contract.
///
/// `serialize` and `deserialize` must touch the same fields in the same
/// order. When a type embeds another, the base type's fields are always
/// written and read first.
pub trait Compact: Sized {
    /// Writes this value's fields, in the type's fixed order.
    fn serialize(&self, writer: &mut CompactWriter) -> Result<()>;

    /// Reads a fresh value, consuming exactly the fields `serialize` wrote.
    fn deserialize(reader: &mut CompactReader) -> Result<Self>;
}

// == Compact Writer ==
/// Append-only frame body builder.
#[derive(Debug, Default)]
pub struct CompactWriter {
    buf: Vec<u8>,
}

impl CompactWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the writer, returning the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes a u32-length-prefixed byte sequence. Fails if the length does
    /// not fit the prefix; nothing is written on failure.
    pub fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
        let len = encode_len(v.len())?;
        self.write_u32(len);
        self.buf.extend_from_slice(v);
        Ok(())
    }

    /// Writes a u32-length-prefixed UTF-8 string.
    pub fn write_string(&mut self, v: &str) -> Result<()> {
        self.write_bytes(v.as_bytes())
    }

    /// Writes raw bytes with no length prefix. The matching read must know
    /// the length from an earlier field.
    pub fn write_raw(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }
}

// == Compact Reader ==
/// Bounds-checked cursor over a frame body.
#[derive(Debug)]
pub struct CompactReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> CompactReader<'a> {
    /// Creates a reader over the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(CacheError::SerializationFormat(format!(
                "unexpected end of frame: needed {} bytes, {} remain",
                n,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(arr))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let bytes = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(arr))
    }

    /// Reads a u32-length-prefixed byte sequence.
    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    /// Reads a u32-length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CacheError::SerializationFormat(format!("invalid UTF-8 string: {}", e)))
    }

    /// Reads exactly `len` raw bytes.
    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }
}
