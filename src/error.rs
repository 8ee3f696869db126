//! Error types for the cache core
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the entry/concurrency/framing core.
///
/// Lock and version conflicts are expected, recoverable outcomes: they are
/// surfaced to the caller and never retried inside the core. Protocol and
/// serialization errors are fatal to the containing decode. A duplicate
/// removal reason indicates a caller bug.
#[derive(Error, Debug)]
pub enum CacheError {
    /// An incompatible, non-expired holder already owns the entry's lock
    #[error("Lock conflict: entry is locked by another holder")]
    LockConflict,

    /// A release was attempted by a handle that is not the current holder
    #[error("Lock handle mismatch: caller does not hold the lock")]
    LockHandleMismatch,

    /// The version presented by an optimistic write is stale
    #[error("Version conflict: entry is at {current}, writer observed {observed}")]
    VersionConflict {
        /// Version the entry currently carries
        current: u64,
        /// Version the writer presented
        observed: u64,
    },

    /// An incoming frame's 5-byte version tag does not match this build
    #[error("Protocol version mismatch: frame was produced by an incompatible revision")]
    ProtocolVersionMismatch,

    /// A frame body violated the fixed field order or ran out of bytes
    #[error("Serialization format error: {0}")]
    SerializationFormat(String),

    /// A second removal reason was attached to an already-removed entry
    #[error("Duplicate removal reason: entry already removed as {existing:?}")]
    DuplicateRemovalReason {
        /// The reason that was attached first
        existing: crate::entry::RemovalReason,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache core.
pub type Result<T> = std::result::Result<T, CacheError>;
