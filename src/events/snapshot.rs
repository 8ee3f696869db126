//! Event Snapshot Module
//!
//! Independent copies of entry state taken at notification time, tagged with
//! the opcode of the operation that produced them.

use crate::entry::{BitSet, EntryValue, Priority};
use crate::error::{CacheError, Result};
use crate::framing::{Compact, CompactReader, CompactWriter};

// == Event Opcode ==
/// Which typed handler the client-side dispatcher should invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventOpcode {
    Add,
    Update,
    Remove,
    Clear,
}

impl EventOpcode {
    /// Wire code for compact framing.
    pub fn as_code(&self) -> u8 {
        match self {
            EventOpcode::Add => 1,
            EventOpcode::Update => 2,
            EventOpcode::Remove => 3,
            EventOpcode::Clear => 4,
        }
    }

    /// Decodes a wire code. Unknown codes reject the frame.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(EventOpcode::Add),
            2 => Ok(EventOpcode::Update),
            3 => Ok(EventOpcode::Remove),
            4 => Ok(EventOpcode::Clear),
            other => Err(CacheError::SerializationFormat(format!(
                "unknown event opcode {}",
                other
            ))),
        }
    }
}

// == Event Snapshot ==
/// An independent copy of (priority, flag-set, value) taken when an event is
/// built. Mutating the live entry afterwards never affects a built snapshot:
/// the snapshot owns its own copies.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSnapshot {
    /// Entry priority at snapshot time
    pub priority: Priority,
    /// Entry flag-set at snapshot time
    pub flags: BitSet,
    /// Deep copy of the entry value at snapshot time
    pub value: EntryValue,
}

impl EventSnapshot {
    /// Builds a snapshot from already-copied parts.
    pub fn new(priority: Priority, flags: BitSet, value: EntryValue) -> Self {
        Self {
            priority,
            flags,
            value,
        }
    }
}

impl Compact for EventSnapshot {
    fn serialize(&self, writer: &mut CompactWriter) -> Result<()> {
        writer.write_u8(self.priority.as_code());
        self.flags.serialize(writer)?;
        self.value.serialize(writer)
    }

    fn deserialize(reader: &mut CompactReader) -> Result<Self> {
        let priority = Priority::from_code(reader.read_u8()?)?;
        let flags = BitSet::deserialize(reader)?;
        let value = EntryValue::deserialize(reader)?;
        Ok(Self {
            priority,
            flags,
            value,
        })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::FLAG_COMPRESSED;

    #[test]
    fn test_opcode_code_roundtrip() {
        for op in [
            EventOpcode::Add,
            EventOpcode::Update,
            EventOpcode::Remove,
            EventOpcode::Clear,
        ] {
            assert_eq!(EventOpcode::from_code(op.as_code()).unwrap(), op);
        }
        assert!(EventOpcode::from_code(0).is_err());
        assert!(EventOpcode::from_code(9).is_err());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut flags = BitSet::new();
        flags.set_bit(FLAG_COMPRESSED);
        let snapshot = EventSnapshot::new(Priority::High, flags, EntryValue::wrap(b"state"));

        let mut writer = CompactWriter::new();
        snapshot.serialize(&mut writer).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = CompactReader::new(&bytes);
        let decoded = EventSnapshot::deserialize(&mut reader).unwrap();
        assert_eq!(decoded, snapshot);
    }
}
