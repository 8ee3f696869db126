//! Entry Module
//!
//! The cache-entry value model plus the per-entry concurrency discipline:
//! flag-sets, canonical binary values, the lock access-type state machine,
//! optimistic version counters and the removal-reason taxonomy.

mod entry;
mod flags;
mod lock;
mod removal;
mod value;

// Re-export public types
pub use entry::CacheEntry;
pub use flags::{
    BitSet, FLAG_BINARY_DATA, FLAG_CLIENT_SERIALIZED, FLAG_COMPRESSED, FLAG_JSON_DATA,
};
pub use lock::{LockAccessType, LockHandle, LockOutcome};
pub use removal::{NotificationClass, RemovalReason, RemovalRouting};
pub use value::{BinaryObject, CompressedValueEntry, EntryValue, OpaqueValue};

use crate::error::{CacheError, Result};

// == Entry Priority ==
/// Relative eviction priority carried by every entry and event snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Low,
    BelowNormal,
    Normal,
    AboveNormal,
    High,
    /// Never considered for eviction
    NotRemovable,
}

impl Priority {
    /// Wire code for compact framing.
    pub fn as_code(&self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::BelowNormal => 1,
            Priority::Normal => 2,
            Priority::AboveNormal => 3,
            Priority::High => 4,
            Priority::NotRemovable => 5,
        }
    }

    /// Decodes a wire code. Unknown codes reject the frame.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Priority::Low),
            1 => Ok(Priority::BelowNormal),
            2 => Ok(Priority::Normal),
            3 => Ok(Priority::AboveNormal),
            4 => Ok(Priority::High),
            5 => Ok(Priority::NotRemovable),
            other => Err(CacheError::SerializationFormat(format!(
                "unknown priority code {}",
                other
            ))),
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}
