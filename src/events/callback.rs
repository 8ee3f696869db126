//! Callback Identity Module
//!
//! Identifies notification subscribers and correlates async operation
//! completions back to their originators.

use std::hash::{Hash, Hasher};

use crate::error::Result;
use crate::framing::{Compact, CompactReader, CompactWriter};

// == Event Filter ==
/// How much entry data a subscriber wants delivered with each event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventFilter {
    /// Key only
    None,
    /// Key plus entry metadata
    Metadata,
    /// Key, metadata and the value snapshot
    DataWithMetadata,
}

impl EventFilter {
    /// Wire code for compact framing.
    pub fn as_code(&self) -> u8 {
        match self {
            EventFilter::None => 0x0,
            EventFilter::Metadata => 0x1,
            EventFilter::DataWithMetadata => 0x3,
        }
    }

    /// Decodes a wire code. Unknown codes degrade to `None` so a newer
    /// peer's richer filter never breaks an older subscriber set.
    pub fn from_code(code: u8) -> Self {
        match code {
            0x1 => EventFilter::Metadata,
            0x3 => EventFilter::DataWithMetadata,
            _ => EventFilter::None,
        }
    }
}

// == Callback Handle ==
/// Client-registered handler slot a notification should be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackHandle(u16);

impl CallbackHandle {
    pub fn new(id: u16) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u16 {
        self.0
    }
}

// == Callback Identity ==
/// (clientId, callbackHandle, event-filter) identifying a subscriber.
///
/// Equality and hashing cover client and handle only: re-registering the
/// same handler with a different filter matches the existing subscription
/// and updates its filter rather than adding a duplicate.
#[derive(Debug, Clone)]
pub struct CallbackIdentity {
    /// Subscribing client application id
    pub client_id: String,
    /// Handler slot on that client
    pub handle: CallbackHandle,
    /// How much data the subscriber wants per event
    pub filter: EventFilter,
}

impl CallbackIdentity {
    pub fn new(client_id: impl Into<String>, handle: CallbackHandle, filter: EventFilter) -> Self {
        Self {
            client_id: client_id.into(),
            handle,
            filter,
        }
    }
}

impl PartialEq for CallbackIdentity {
    fn eq(&self, other: &Self) -> bool {
        // Filter deliberately excluded
        self.client_id == other.client_id && self.handle == other.handle
    }
}

impl Eq for CallbackIdentity {}

impl Hash for CallbackIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.client_id.hash(state);
        self.handle.hash(state);
    }
}

impl Compact for CallbackIdentity {
    fn serialize(&self, writer: &mut CompactWriter) -> Result<()> {
        writer.write_string(&self.client_id)?;
        writer.write_u16(self.handle.id());
        writer.write_u8(self.filter.as_code());
        Ok(())
    }

    fn deserialize(reader: &mut CompactReader) -> Result<Self> {
        let client_id = reader.read_string()?;
        let handle = CallbackHandle::new(reader.read_u16()?);
        let filter = EventFilter::from_code(reader.read_u8()?);
        Ok(Self {
            client_id,
            handle,
            filter,
        })
    }
}

// == Async Callback Identity ==
/// A callback identity plus the request id of one specific async operation.
///
/// Equality is client-match and handle-match ONLY; the request id is
/// deliberately excluded. This governs de-duplication in subscriber sets
/// (one subscription per client+handle across any number of in-flight
/// requests), not uniqueness of a pending request.
#[derive(Debug, Clone)]
pub struct AsyncCallbackIdentity {
    /// Base subscriber identity; serialized first
    pub base: CallbackIdentity,
    /// Correlates this completion to the request that started it
    pub request_id: u64,
}

impl AsyncCallbackIdentity {
    pub fn new(base: CallbackIdentity, request_id: u64) -> Self {
        Self { base, request_id }
    }

    /// The documented subscription-matching predicate: client and handle
    /// equal, request id ignored.
    pub fn matches_subscription(&self, subscription: &CallbackIdentity) -> bool {
        self.base == *subscription
    }
}

impl PartialEq for AsyncCallbackIdentity {
    fn eq(&self, other: &Self) -> bool {
        // request_id deliberately excluded, see type docs
        self.base == other.base
    }
}

impl Eq for AsyncCallbackIdentity {}

impl Hash for AsyncCallbackIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base.hash(state);
    }
}

impl Compact for AsyncCallbackIdentity {
    fn serialize(&self, writer: &mut CompactWriter) -> Result<()> {
        // Base fields first, then the derived field
        self.base.serialize(writer)?;
        writer.write_u64(self.request_id);
        Ok(())
    }

    fn deserialize(reader: &mut CompactReader) -> Result<Self> {
        let base = CallbackIdentity::deserialize(reader)?;
        let request_id = reader.read_u64()?;
        Ok(Self { base, request_id })
    }
}
