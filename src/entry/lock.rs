//! Lock Access-Type Module
//!
//! The per-call lock intent an operation carries, plus the lock-holder state
//! the entry's arbiter interprets. Acquisition is a non-blocking test-and-set:
//! it succeeds immediately or reports a conflict, and retry/backoff belongs to
//! the caller.

use chrono::{DateTime, Duration, Utc};

// == Lock Access Type ==
/// Per-call instruction telling the entry's arbiter how to treat the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockAccessType {
    /// Obtain exclusive hold before operating
    Acquire,
    /// Operate without acquiring; fail if another holder exists
    DontAcquire,
    /// Release the held lock after the operation
    Release,
    /// Operate and keep the lock held (pipelining from the same holder)
    DontRelease,
    /// Bypass all lock checks (privileged internal flows only)
    IgnoreLock,
    /// Mutate without incrementing the version (replicated-write apply)
    PreserveVersion,
    /// No explicit instruction; fall back to ambient context defaults
    Default,
}

impl LockAccessType {
    /// Wire code for this access type. `Default` has no code and encodes as
    /// the empty string.
    pub fn as_code(&self) -> &'static str {
        match self {
            LockAccessType::Acquire => "1",
            LockAccessType::DontAcquire => "2",
            LockAccessType::Release => "3",
            LockAccessType::DontRelease => "4",
            LockAccessType::IgnoreLock => "5",
            LockAccessType::PreserveVersion => "9",
            LockAccessType::Default => "",
        }
    }

    /// Decodes a wire code. Unrecognized codes map to `Default` so newer
    /// peers can send codes this build does not know about.
    pub fn from_code(code: &str) -> Self {
        match code {
            "1" => LockAccessType::Acquire,
            "2" => LockAccessType::DontAcquire,
            "3" => LockAccessType::Release,
            "4" => LockAccessType::DontRelease,
            "5" => LockAccessType::IgnoreLock,
            "9" => LockAccessType::PreserveVersion,
            _ => LockAccessType::Default,
        }
    }

    /// All defined access types, for exhaustive round-trip tests.
    pub const ALL: [LockAccessType; 7] = [
        LockAccessType::Acquire,
        LockAccessType::DontAcquire,
        LockAccessType::Release,
        LockAccessType::DontRelease,
        LockAccessType::IgnoreLock,
        LockAccessType::PreserveVersion,
        LockAccessType::Default,
    ];
}

// == Lock Handle ==
/// Identity of a lock holder, presented on every lock-sensitive call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockHandle(String);

impl LockHandle {
    /// Creates a handle from a caller-supplied identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The underlying identifier.
    pub fn id(&self) -> &str {
        &self.0
    }
}

// == Lock Outcome ==
/// Result of a non-blocking acquisition attempt. There is no queueing: the
/// caller decides whether and when to retry.
#[derive(Debug, Clone, PartialEq)]
pub enum LockOutcome {
    /// The caller now holds (or already held) the lock
    Acquired,
    /// A different, non-expired holder owns the lock
    Conflict {
        /// The current holder's handle
        holder: LockHandle,
        /// When the current holder acquired the lock
        since: DateTime<Utc>,
    },
}

// == Lock Holder State ==
/// The entry-internal record of who currently holds the lock.
#[derive(Debug, Clone)]
pub(crate) struct LockHolder {
    pub handle: LockHandle,
    pub client_id: Option<String>,
    pub client_thread_id: Option<i64>,
    pub lock_date: DateTime<Utc>,
    /// Instant at which the hold lapses; None means the lease never expires
    pub lease_until: Option<DateTime<Utc>>,
}

impl LockHolder {
    pub fn new(
        handle: LockHandle,
        client_id: Option<String>,
        client_thread_id: Option<i64>,
        lease: Option<Duration>,
    ) -> Self {
        let now = Utc::now();
        Self {
            handle,
            client_id,
            client_thread_id,
            lock_date: now,
            lease_until: lease.map(|d| now + d),
        }
    }

    /// True once the lease instant has passed. An expired holder is treated
    /// as not holding the lock at all.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.lease_until, Some(until) if now >= until)
    }
}
