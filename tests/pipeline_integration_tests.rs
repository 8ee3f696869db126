//! Integration Tests for the Entry/Notification Pipeline
//!
//! Exercises the public API end to end: lock arbitration under real
//! concurrency, removal routing, and async completion delivery through the
//! relaxed subscription-matching contract.

use std::sync::{Arc, Once};
use std::thread;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nucache_core::{
    AsyncCallbackIdentity, BitSet, CacheEntry, CallbackHandle, CallbackIdentity, ContextField,
    ContextValue, EntryValue, EventFilter, EventOpcode, LockHandle, LockOutcome,
    NotificationClass, NotificationDispatcher, OperationContext, Priority, RemovalReason,
};

// == Helper Functions ==

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "nucache_core=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .init();
    });
}

fn test_entry(payload: &[u8]) -> CacheEntry {
    CacheEntry::new(EntryValue::wrap(payload), BitSet::new(), Priority::Normal)
}

fn async_ctx(client: &str, handle: u16, request_id: i64) -> OperationContext {
    OperationContext::new()
        .with(ContextField::ClientId, ContextValue::Str(client.to_string()))
        .with(ContextField::CallbackHandle, ContextValue::Int(handle as i64))
        .with(ContextField::RequestId, ContextValue::Int(request_id))
        .with(
            ContextField::EventFilter,
            ContextValue::Filter(EventFilter::DataWithMetadata),
        )
}

// == Async Completion Scenario ==
// Client C1 issues an async Remove on key "K" with requestId 42. A prior
// subscription from the same client and handle, registered while request 7
// was in flight, must be found "equal" under the relaxed contract and
// receive the completion.

#[tokio::test]
async fn test_async_remove_completion_reaches_prior_subscription() {
    init_tracing();
    let dispatcher = NotificationDispatcher::new(16);
    let handle = CallbackHandle::new(11);

    // Prior subscription, established during request 7
    let earlier = AsyncCallbackIdentity::new(
        CallbackIdentity::new("C1", handle, EventFilter::DataWithMetadata),
        7,
    );
    let mut rx = dispatcher.subscribe(earlier.base.clone());

    // Async Remove with requestId 42 is accepted
    let ctx = async_ctx("C1", 11, 42);
    let identity = dispatcher.accept_async(&ctx).unwrap();
    assert_eq!(identity.request_id, 42);

    // The two identities are equal under the documented contract
    assert_eq!(identity, earlier);

    // The operation removes the entry and completes
    let entry = test_entry(b"doomed");
    entry
        .attach_removal_reason(RemovalReason::Removed)
        .unwrap();
    let routing = entry.removal_reason().unwrap().routing();
    assert_eq!(routing.class, NotificationClass::ExplicitRemoval);
    assert!(!routing.cascades);

    let snapshot = entry.snapshot();
    dispatcher.complete_async(&identity, EventOpcode::Remove, "K", Some(snapshot));

    // The prior subscription receives the opcode-tagged completion
    let delivered = rx.recv().await.unwrap();
    assert_eq!(delivered.opcode, EventOpcode::Remove);
    assert_eq!(delivered.key, "K");
    assert_eq!(delivered.request_id, Some(42));
    assert!(delivered.snapshot.is_some());
}

#[tokio::test]
async fn test_completion_for_other_client_is_not_delivered() {
    init_tracing();
    let dispatcher = NotificationDispatcher::new(16);

    let mut rx = dispatcher.subscribe(CallbackIdentity::new(
        "C2",
        CallbackHandle::new(11),
        EventFilter::None,
    ));

    let identity = dispatcher.accept_async(&async_ctx("C1", 11, 42)).unwrap();
    dispatcher.complete_async(&identity, EventOpcode::Remove, "K", None);

    assert!(rx.try_recv().is_err());
}

// == Concurrent Acquisition Scenario ==
// Two threads attempt ACQUIRE on the same entry with different handles;
// exactly one succeeds, the other observes the conflict.

#[test]
fn test_concurrent_acquire_has_exactly_one_winner() {
    init_tracing();
    let entry = Arc::new(test_entry(b"contended"));
    let barrier = Arc::new(std::sync::Barrier::new(2));

    let handles: Vec<_> = ["h1", "h2"]
        .into_iter()
        .map(|name| {
            let entry = Arc::clone(&entry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let ctx = OperationContext::new();
                barrier.wait();
                entry.try_acquire(&LockHandle::new(name), None, &ctx)
            })
        })
        .collect();

    let outcomes: Vec<LockOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let acquired = outcomes
        .iter()
        .filter(|o| matches!(o, LockOutcome::Acquired))
        .count();
    let conflicts = outcomes
        .iter()
        .filter(|o| matches!(o, LockOutcome::Conflict { .. }))
        .count();

    assert_eq!(acquired, 1, "exactly one thread must win the lock");
    assert_eq!(conflicts, 1, "the other thread must observe the conflict");
    assert!(entry.is_locked());
}

// == Removal Cascade Routing ==

#[test]
fn test_dependency_removal_routes_cascade() {
    init_tracing();
    let entry = test_entry(b"parent");
    entry
        .attach_removal_reason(RemovalReason::DependencyChanged)
        .unwrap();

    let routing = entry.removal_reason().unwrap().routing();
    assert_eq!(routing.class, NotificationClass::DependencyInvalidation);
    assert!(routing.cascades);

    // The reason is attached once; eviction arriving late is the caller's bug
    assert!(entry.attach_removal_reason(RemovalReason::Expired).is_err());
}
