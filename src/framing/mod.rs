//! Framing Module
//!
//! Compact, fixed-order binary serialization plus the 5-byte protocol
//! version tag that prefixes every versioned frame. There is no embedded
//! schema: field order is the entire contract, and both sides must agree on
//! it byte for byte.

mod io;
mod version;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use io::{Compact, CompactReader, CompactWriter};
pub(crate) use io::encode_len;
pub use version::{compare, frame, unframe, PROTOCOL_TAG, TAG_LEN};
