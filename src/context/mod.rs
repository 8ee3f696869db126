//! Operation Context Module
//!
//! The ambient, per-call configuration bag every component reads: routing
//! flags, client identity, callback identifiers and lock/version bypass
//! flags. Produced by the request layer, consumed (never written) by the
//! core. Also home of the globally unique logical-operation tag used for
//! replication and idempotency tracking.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::Config;
use crate::entry::LockAccessType;
use crate::error::Result;
use crate::events::{CallbackHandle, EventFilter};
use crate::framing::{Compact, CompactReader, CompactWriter};

// == Context Field ==
/// The fixed set of field names an operation context may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextField {
    OperationType,
    ClientId,
    ClientThreadId,
    RequestId,
    CallbackHandle,
    EventFilter,
    ReadThru,
    WriteThru,
    IsClusteredOperation,
    IsRetryOperation,
    DonotRegisterSyncDependency,
    LockAccessType,
    ClientLastViewId,
}

// == Context Value ==
/// A value stored under a context field.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    Bool(bool),
    Int(i64),
    Str(String),
    AccessType(LockAccessType),
    Filter(EventFilter),
}

// == Operation Context ==
/// Ambient per-call field bag. Cheap to build and clone; one per operation.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    fields: HashMap<ContextField, ContextValue>,
}

impl OperationContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, field: ContextField, value: ContextValue) -> Self {
        self.fields.insert(field, value);
        self
    }

    /// Inserts or replaces a field.
    pub fn insert(&mut self, field: ContextField, value: ContextValue) {
        self.fields.insert(field, value);
    }

    /// Raw lookup.
    pub fn get(&self, field: ContextField) -> Option<&ContextValue> {
        self.fields.get(&field)
    }

    /// Returns true if the field is present.
    pub fn contains(&self, field: ContextField) -> bool {
        self.fields.contains_key(&field)
    }

    fn get_bool(&self, field: ContextField) -> Option<bool> {
        match self.get(field) {
            Some(ContextValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    fn get_int(&self, field: ContextField) -> Option<i64> {
        match self.get(field) {
            Some(ContextValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    fn get_str(&self, field: ContextField) -> Option<&str> {
        match self.get(field) {
            Some(ContextValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    // == Typed Accessors ==

    /// Client application identity, if the transport attached one.
    pub fn client_id(&self) -> Option<&str> {
        self.get_str(ContextField::ClientId)
    }

    /// Client-side thread identity.
    pub fn client_thread_id(&self) -> Option<i64> {
        self.get_int(ContextField::ClientThreadId)
    }

    /// Request correlation id for async operations. A stored value outside
    /// the id range is treated as absent rather than wrapped.
    pub fn request_id(&self) -> Option<u64> {
        self.get_int(ContextField::RequestId)
            .and_then(|i| u64::try_from(i).ok())
    }

    /// Callback handle registered by the client dispatcher. A stored value
    /// outside the handle range is treated as absent rather than wrapped.
    pub fn callback_handle(&self) -> Option<CallbackHandle> {
        self.get_int(ContextField::CallbackHandle)
            .and_then(|i| u16::try_from(i).ok())
            .map(CallbackHandle::new)
    }

    /// Event filter for callback registration; absent means `None`.
    pub fn event_filter(&self) -> EventFilter {
        match self.get(ContextField::EventFilter) {
            Some(ContextValue::Filter(f)) => *f,
            _ => EventFilter::None,
        }
    }

    /// True when the transport re-issued this operation after a failure.
    pub fn is_retry_operation(&self) -> bool {
        self.get_bool(ContextField::IsRetryOperation).unwrap_or(false)
    }

    /// True when the operation must be applied cluster-wide.
    pub fn is_clustered_operation(&self) -> bool {
        self.get_bool(ContextField::IsClusteredOperation)
            .unwrap_or(false)
    }

    /// Read-through toggle for the data-source collaborator.
    pub fn read_thru(&self) -> bool {
        self.get_bool(ContextField::ReadThru).unwrap_or(false)
    }

    /// Write-through toggle for the data-source collaborator.
    pub fn write_thru(&self) -> bool {
        self.get_bool(ContextField::WriteThru).unwrap_or(false)
    }

    /// Ambient lock instruction used when a call passes `Default`.
    pub fn lock_access_type(&self) -> Option<LockAccessType> {
        match self.get(ContextField::LockAccessType) {
            Some(ContextValue::AccessType(t)) => Some(*t),
            _ => None,
        }
    }
}

// == Operation Id ==
/// Globally unique logical-operation tag: a source identifier plus a
/// monotonically distinguishing counter. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationId {
    source: String,
    counter: u64,
}

impl OperationId {
    /// Creates an operation id. Prefer [`OperationIdSource::next`] so the
    /// counter stays monotonic per source.
    pub fn new(source: impl Into<String>, counter: u64) -> Self {
        Self {
            source: source.into(),
            counter,
        }
    }

    /// The originating node/source identifier.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The distinguishing counter.
    pub fn counter(&self) -> u64 {
        self.counter
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.counter)
    }
}

impl Compact for OperationId {
    fn serialize(&self, writer: &mut CompactWriter) -> Result<()> {
        writer.write_string(&self.source)?;
        writer.write_u64(self.counter);
        Ok(())
    }

    fn deserialize(reader: &mut CompactReader) -> Result<Self> {
        let source = reader.read_string()?;
        let counter = reader.read_u64()?;
        Ok(Self { source, counter })
    }
}

// == Operation Id Source ==
/// Hands out monotonically increasing operation ids for one source.
#[derive(Debug)]
pub struct OperationIdSource {
    source: String,
    next: AtomicU64,
}

impl OperationIdSource {
    /// Creates a source starting at the given counter.
    pub fn new(source: impl Into<String>, start: u64) -> Self {
        Self {
            source: source.into(),
            next: AtomicU64::new(start),
        }
    }

    /// Creates a source with the configured starting counter.
    pub fn from_config(source: impl Into<String>, config: &Config) -> Self {
        Self::new(source, config.counter_start)
    }

    /// Issues the next operation id.
    pub fn next(&self) -> OperationId {
        let counter = self.next.fetch_add(1, Ordering::Relaxed);
        OperationId::new(self.source.clone(), counter)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_typed_accessors() {
        let ctx = OperationContext::new()
            .with(ContextField::ClientId, ContextValue::Str("C1".to_string()))
            .with(ContextField::ClientThreadId, ContextValue::Int(12))
            .with(ContextField::RequestId, ContextValue::Int(42))
            .with(ContextField::IsRetryOperation, ContextValue::Bool(true));

        assert_eq!(ctx.client_id(), Some("C1"));
        assert_eq!(ctx.client_thread_id(), Some(12));
        assert_eq!(ctx.request_id(), Some(42));
        assert!(ctx.is_retry_operation());
        assert!(!ctx.is_clustered_operation());
    }

    #[test]
    fn test_context_defaults_when_absent() {
        let ctx = OperationContext::new();
        assert_eq!(ctx.client_id(), None);
        assert!(!ctx.read_thru());
        assert!(!ctx.write_thru());
        assert_eq!(ctx.event_filter(), EventFilter::None);
        assert_eq!(ctx.lock_access_type(), None);
    }

    #[test]
    fn test_context_out_of_range_ids_read_as_absent() {
        let ctx = OperationContext::new()
            .with(ContextField::RequestId, ContextValue::Int(-1))
            .with(ContextField::CallbackHandle, ContextValue::Int(70_000));

        // Negative or oversized values must not wrap into a wrong id
        assert_eq!(ctx.request_id(), None);
        assert_eq!(ctx.callback_handle(), None);

        let ctx = ctx
            .with(ContextField::RequestId, ContextValue::Int(i64::MAX))
            .with(ContextField::CallbackHandle, ContextValue::Int(u16::MAX as i64));
        assert_eq!(ctx.request_id(), Some(i64::MAX as u64));
        assert_eq!(ctx.callback_handle(), Some(CallbackHandle::new(u16::MAX)));
    }

    #[test]
    fn test_context_ambient_access_type() {
        let ctx = OperationContext::new().with(
            ContextField::LockAccessType,
            ContextValue::AccessType(LockAccessType::DontRelease),
        );
        assert_eq!(ctx.lock_access_type(), Some(LockAccessType::DontRelease));
    }

    #[test]
    fn test_operation_id_source_is_monotonic() {
        let source = OperationIdSource::new("node-1", 1);
        let a = source.next();
        let b = source.next();
        assert_eq!(a.source(), "node-1");
        assert!(b.counter() > a.counter());
    }

    #[test]
    fn test_operation_id_roundtrip() {
        let id = OperationId::new("node-7", 991);

        let mut writer = CompactWriter::new();
        id.serialize(&mut writer).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = CompactReader::new(&bytes);
        let decoded = OperationId::deserialize(&mut reader).unwrap();
        assert_eq!(decoded, id);
        assert_eq!(decoded.to_string(), "node-7:991");
    }
}
