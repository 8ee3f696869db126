//! Protocol Version Tag
//!
//! A fixed 5-byte tag prefixes every versioned frame: the product initials,
//! the protocol major/minor revision, and a self-check byte. Byte layouts of
//! different protocol revisions are not safely interpretable as each other,
//! so a mismatch hard-fails the decode: no partial or lenient acceptance.

use crate::error::{CacheError, Result};
use crate::framing::{Compact, CompactReader, CompactWriter};

/// Length of the version tag in bytes.
pub const TAG_LEN: usize = 5;

/// Protocol major revision.
const MAJOR: u8 = 2;
/// Protocol minor revision.
const MINOR: u8 = 1;

const fn build_tag() -> [u8; TAG_LEN] {
    let literal = [b'N', b'C', MAJOR, MINOR];
    // Byte 4 is the bitwise OR of bytes 0-3: a cheap self-check, not a
    // cryptographic checksum
    let check = literal[0] | literal[1] | literal[2] | literal[3];
    [literal[0], literal[1], literal[2], literal[3], check]
}

/// The canonical 5-byte tag for this build's protocol revision.
pub const PROTOCOL_TAG: [u8; TAG_LEN] = build_tag();

/// Validates that an incoming frame's first 5 bytes exactly equal the
/// canonical tag. Shorter input is a mismatch.
pub fn compare(bytes: &[u8]) -> bool {
    bytes.len() >= TAG_LEN && bytes[..TAG_LEN] == PROTOCOL_TAG
}

/// Encodes a value as a versioned frame: tag, then the compact body.
pub fn frame<T: Compact>(value: &T) -> Result<Vec<u8>> {
    let mut writer = CompactWriter::new();
    writer.write_raw(&PROTOCOL_TAG);
    value.serialize(&mut writer)?;
    Ok(writer.into_bytes())
}

/// Decodes a versioned frame produced by [`frame`].
///
/// The tag must match exactly and the body must be consumed in full;
/// trailing bytes mean producer and consumer disagree on the field order.
pub fn unframe<T: Compact>(bytes: &[u8]) -> Result<T> {
    if !compare(bytes) {
        return Err(CacheError::ProtocolVersionMismatch);
    }
    let mut reader = CompactReader::new(&bytes[TAG_LEN..]);
    let value = T::deserialize(&mut reader)?;
    if reader.remaining() != 0 {
        return Err(CacheError::SerializationFormat(format!(
            "{} trailing bytes after frame body",
            reader.remaining()
        )));
    }
    Ok(value)
}
