//! NuCache Core - entry, concurrency and wire-framing contracts
//!
//! The per-entry concurrency/versioning discipline, removal/notification
//! taxonomy and compact version-tagged binary framing shared by the NuCache
//! client, server and cluster replicas. Transport, cluster membership,
//! data-source providers and the management surface live in sibling crates.

pub mod config;
pub mod context;
pub mod entry;
pub mod error;
pub mod events;
pub mod framing;

pub use config::Config;
pub use context::{ContextField, ContextValue, OperationContext, OperationId, OperationIdSource};
pub use entry::{
    BitSet, BinaryObject, CacheEntry, CompressedValueEntry, EntryValue, LockAccessType,
    LockHandle, LockOutcome, NotificationClass, Priority, RemovalReason, RemovalRouting,
};
pub use error::{CacheError, Result};
pub use events::{
    AsyncCallbackIdentity, CallbackHandle, CallbackIdentity, EventFilter, EventNotification,
    EventOpcode, EventSnapshot, NotificationDispatcher,
};
pub use framing::{compare, frame, unframe, Compact, CompactReader, CompactWriter, PROTOCOL_TAG};
