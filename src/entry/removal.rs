//! Removal-Reason Taxonomy
//!
//! Tags why an entry left the cache and routes the cleanup/notification
//! behavior that follows. A reason is attached exactly once at removal time.

use crate::error::{CacheError, Result};

// == Removal Reason ==
/// Why an entry left the cache. Attached once, never overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalReason {
    /// A key this entry depends on changed
    DependencyChanged,
    /// The entry's expiration elapsed
    Expired,
    /// The entry was explicitly removed
    Removed,
    /// The entry was evicted as least valuable under memory pressure
    Underused,
    /// A dependency of this entry became invalid
    DependencyInvalid,
}

impl RemovalReason {
    /// Wire code for compact framing.
    pub fn as_code(&self) -> u8 {
        match self {
            RemovalReason::DependencyChanged => 0,
            RemovalReason::Expired => 1,
            RemovalReason::Removed => 2,
            RemovalReason::Underused => 3,
            RemovalReason::DependencyInvalid => 4,
        }
    }

    /// Decodes a wire code. Unknown codes reject the frame.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(RemovalReason::DependencyChanged),
            1 => Ok(RemovalReason::Expired),
            2 => Ok(RemovalReason::Removed),
            3 => Ok(RemovalReason::Underused),
            4 => Ok(RemovalReason::DependencyInvalid),
            other => Err(CacheError::SerializationFormat(format!(
                "unknown removal reason code {}",
                other
            ))),
        }
    }
}

// == Notification Class ==
/// Which notification family a removal fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationClass {
    /// Eviction-class notification (expiry or pressure eviction)
    Eviction,
    /// Dependency-specific notification
    DependencyInvalidation,
    /// Standard explicit-removal notification
    ExplicitRemoval,
}

// == Removal Routing ==
/// Cleanup/notification behavior derived from a removal reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalRouting {
    /// Notification family to fire
    pub class: NotificationClass,
    /// Whether keys that declared a dependency on this one must be invalidated
    pub cascades: bool,
}

impl RemovalReason {
    /// Routes a removal to its notification family and cascade behavior.
    ///
    /// The match is exhaustive on purpose: adding a reason forces every
    /// consumption site to be revisited.
    pub fn routing(&self) -> RemovalRouting {
        match self {
            RemovalReason::Expired | RemovalReason::Underused => RemovalRouting {
                class: NotificationClass::Eviction,
                cascades: false,
            },
            RemovalReason::DependencyChanged | RemovalReason::DependencyInvalid => RemovalRouting {
                class: NotificationClass::DependencyInvalidation,
                cascades: true,
            },
            RemovalReason::Removed => RemovalRouting {
                class: NotificationClass::ExplicitRemoval,
                cascades: false,
            },
        }
    }
}
