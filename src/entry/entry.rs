//! Cache Entry Module
//!
//! A cached key's value plus metadata: flag-set, priority, version counter,
//! lock-holder state and the removal reason. Defines the rules every caller
//! must follow to touch an entry; the key→entry map owning the entries lives
//! outside this core.

use chrono::{Duration, Utc};
use std::sync::Mutex;
use tracing::warn;

use crate::context::OperationContext;
use crate::entry::lock::LockHolder;
use crate::entry::{
    BitSet, EntryValue, LockAccessType, LockHandle, LockOutcome, Priority, RemovalReason,
};
use crate::error::{CacheError, Result};
use crate::events::EventSnapshot;

// == Cache Entry ==
/// A single cache entry.
///
/// The value and flag-set carry no internal synchronization: mutating them
/// requires `&mut`, and the caller is contractually required to hold the
/// entry's distributed lock first. The lock word and removal slot are
/// internally guarded so the non-blocking test-and-set and the set-once
/// removal reason stay correct under concurrent shared access.
#[derive(Debug)]
pub struct CacheEntry {
    /// The stored payload
    value: EntryValue,
    /// Compression/format/type hints
    flags: BitSet,
    /// Eviction priority
    priority: Priority,
    /// Optimistic-concurrency version counter
    version: u64,
    /// Current lock holder, if any
    lock: Mutex<Option<LockHolder>>,
    /// Removal reason, set exactly once at removal time
    removal: Mutex<Option<RemovalReason>>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry at version 1.
    pub fn new(value: EntryValue, flags: BitSet, priority: Priority) -> Self {
        Self {
            value,
            flags,
            priority,
            version: 1,
            lock: Mutex::new(None),
            removal: Mutex::new(None),
        }
    }

    // == Value Access ==
    /// The stored value. Unlocked reads are only eventually consistent.
    pub fn value(&self) -> &EntryValue {
        &self.value
    }

    /// Replaces the value directly, without lock or version bookkeeping.
    ///
    /// The caller must hold the entry's lock; concurrent unguarded sets are
    /// undefined behavior by contract. Prefer [`CacheEntry::commit_update`]
    /// for the full optimistic-write path.
    pub fn set_value(&mut self, value: EntryValue) {
        self.value = value;
    }

    /// The entry's flag-set.
    pub fn flags(&self) -> BitSet {
        self.flags
    }

    /// Mutable flag-set access; same lock contract as [`CacheEntry::set_value`].
    pub fn flags_mut(&mut self) -> &mut BitSet {
        &mut self.flags
    }

    /// The entry's eviction priority.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Current version counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    // == Lock Arbitration ==
    /// Non-blocking test-and-set acquisition.
    ///
    /// Succeeds when the entry is unlocked, when the holder's lease has
    /// expired, when the caller's handle already holds the lock, or when a
    /// retry operation arrives from the same client and thread that hold it.
    /// Otherwise reports the conflicting holder. No queueing: retry policy
    /// belongs to the caller.
    pub fn try_acquire(
        &self,
        handle: &LockHandle,
        lease: Option<Duration>,
        ctx: &OperationContext,
    ) -> LockOutcome {
        let mut lock = self.lock.lock().expect("lock word poisoned");
        let now = Utc::now();

        if let Some(holder) = lock.as_ref() {
            if !holder.is_expired(now) {
                if holder.handle == *handle {
                    return LockOutcome::Acquired;
                }
                // A re-issued operation from the holding client/thread gets
                // its own lock back even though the handle differs
                if ctx.is_retry_operation()
                    && holder.client_id.as_deref() == ctx.client_id()
                    && holder.client_id.is_some()
                    && holder.client_thread_id == ctx.client_thread_id()
                {
                    return LockOutcome::Acquired;
                }
                return LockOutcome::Conflict {
                    holder: holder.handle.clone(),
                    since: holder.lock_date,
                };
            }
            // Expired lease: fall through and take the lock
        }

        *lock = Some(LockHolder::new(
            handle.clone(),
            ctx.client_id().map(str::to_string),
            ctx.client_thread_id(),
            lease,
        ));
        LockOutcome::Acquired
    }

    /// Whether a non-expired holder currently owns the lock. Clears an
    /// expired holder as a side effect.
    pub fn is_locked(&self) -> bool {
        let mut lock = self.lock.lock().expect("lock word poisoned");
        match lock.as_ref() {
            Some(holder) if holder.is_expired(Utc::now()) => {
                *lock = None;
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Whether the given handle is the current, non-expired holder.
    pub fn compare_lock(&self, handle: &LockHandle) -> bool {
        let lock = self.lock.lock().expect("lock word poisoned");
        matches!(lock.as_ref(),
                 Some(holder) if !holder.is_expired(Utc::now()) && holder.handle == *handle)
    }

    /// Releases the lock held by `handle`.
    pub fn release(&self, handle: &LockHandle) -> Result<()> {
        let mut lock = self.lock.lock().expect("lock word poisoned");
        match lock.as_ref() {
            Some(holder) if !holder.is_expired(Utc::now()) && holder.handle == *handle => {
                *lock = None;
                Ok(())
            }
            _ => Err(CacheError::LockHandleMismatch),
        }
    }

    // == Access-Type Gate ==
    /// Enforces the caller's lock intent before an operation runs.
    ///
    /// `Default` resolves against the ambient context; if the context carries
    /// no instruction either, the operation behaves like `DontAcquire`.
    pub fn check_access(
        &self,
        access: LockAccessType,
        handle: Option<&LockHandle>,
        lease: Option<Duration>,
        ctx: &OperationContext,
    ) -> Result<()> {
        match Self::resolve_access(access, ctx) {
            LockAccessType::Acquire => {
                let handle = handle
                    .ok_or_else(|| CacheError::Internal("Acquire requires a lock handle".into()))?;
                match self.try_acquire(handle, lease, ctx) {
                    LockOutcome::Acquired => Ok(()),
                    LockOutcome::Conflict { .. } => Err(CacheError::LockConflict),
                }
            }
            LockAccessType::DontAcquire => {
                // Operate without acquiring, but never silently bypass an
                // existing foreign hold
                if self.is_locked() && !handle.is_some_and(|h| self.compare_lock(h)) {
                    Err(CacheError::LockConflict)
                } else {
                    Ok(())
                }
            }
            LockAccessType::Release | LockAccessType::DontRelease => {
                // Both presume the caller already holds the lock
                if handle.is_some_and(|h| self.compare_lock(h)) {
                    Ok(())
                } else {
                    Err(CacheError::LockHandleMismatch)
                }
            }
            // Privileged flows guarantee their own ordering externally
            LockAccessType::IgnoreLock | LockAccessType::PreserveVersion => Ok(()),
            LockAccessType::Default => unreachable!("resolve_access never returns Default"),
        }
    }

    /// Applies the post-operation half of the lock intent: `Release` drops
    /// the hold, everything else keeps the lock state as-is.
    pub fn finish_access(
        &self,
        access: LockAccessType,
        handle: Option<&LockHandle>,
        ctx: &OperationContext,
    ) -> Result<()> {
        if Self::resolve_access(access, ctx) == LockAccessType::Release {
            let handle = handle
                .ok_or_else(|| CacheError::Internal("Release requires a lock handle".into()))?;
            self.release(handle)?;
        }
        Ok(())
    }

    fn resolve_access(access: LockAccessType, ctx: &OperationContext) -> LockAccessType {
        if access != LockAccessType::Default {
            return access;
        }
        match ctx.lock_access_type() {
            Some(ambient) if ambient != LockAccessType::Default => ambient,
            _ => LockAccessType::DontAcquire,
        }
    }

    // == Optimistic Writes ==
    /// Commits a content mutation under optimistic concurrency.
    ///
    /// The writer presents the version it last observed; a mismatch is a
    /// `VersionConflict` and the value is left untouched. The version
    /// strictly increments except under `PreserveVersion`, which applies an
    /// already-versioned replicated write. Returns the entry's version after
    /// the commit.
    pub fn commit_update(
        &mut self,
        value: EntryValue,
        observed_version: u64,
        access: LockAccessType,
    ) -> Result<u64> {
        if self.version != observed_version {
            return Err(CacheError::VersionConflict {
                current: self.version,
                observed: observed_version,
            });
        }
        self.value = value;
        if access != LockAccessType::PreserveVersion {
            self.version += 1;
        }
        Ok(self.version)
    }

    // == Snapshots ==
    /// Takes an independent copy of (priority, flag-set, value) for
    /// notification purposes. Later mutation of this entry never affects the
    /// returned snapshot.
    pub fn snapshot(&self) -> EventSnapshot {
        EventSnapshot::new(self.priority, self.flags, self.value.clone())
    }

    // == Removal ==
    /// Attaches the removal reason, exactly once.
    ///
    /// A second attachment is a caller bug: the first reason (and any
    /// notifications already dispatched for it) is left untouched and
    /// `DuplicateRemovalReason` is returned.
    pub fn attach_removal_reason(&self, reason: RemovalReason) -> Result<()> {
        let mut removal = self.removal.lock().expect("removal slot poisoned");
        if let Some(existing) = *removal {
            warn!(?existing, attempted = ?reason, "Removal reason already attached");
            return Err(CacheError::DuplicateRemovalReason { existing });
        }
        *removal = Some(reason);
        Ok(())
    }

    /// The removal reason, if the entry has been removed.
    pub fn removal_reason(&self) -> Option<RemovalReason> {
        *self.removal.lock().expect("removal slot poisoned")
    }
}
