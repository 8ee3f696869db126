//! Notification Dispatcher
//!
//! Routes opcode-tagged event snapshots to subscribing clients. Delivery is
//! at-most-once, best-effort and fire-and-forget: a full queue or a
//! disconnected subscriber drops the notification, and nothing on this path
//! ever blocks the operation that produced the event.

use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::Config;
use crate::context::OperationContext;
use crate::error::{CacheError, Result};
use crate::events::{
    AsyncCallbackIdentity, CallbackIdentity, EventFilter, EventOpcode, EventSnapshot,
};

// == Event Notification ==
/// One deliverable unit: the opcode, the key it concerns, an optional state
/// snapshot, and the request id when the event completes an async operation.
#[derive(Debug, Clone, PartialEq)]
pub struct EventNotification {
    /// Which typed handler the client dispatcher invokes
    pub opcode: EventOpcode,
    /// Key the event concerns
    pub key: String,
    /// State snapshot, present when the subscriber's filter asks for data
    pub snapshot: Option<EventSnapshot>,
    /// Correlates an async completion to its originating request
    pub request_id: Option<u64>,
}

/// One registered subscriber: its identity and its delivery queue.
struct Subscription {
    identity: CallbackIdentity,
    sender: mpsc::Sender<EventNotification>,
}

// == Notification Dispatcher ==
/// Subscriber registry plus the non-blocking delivery path.
///
/// Callers build snapshots synchronously inside their own operation and hand
/// them here; `publish`/`complete_async` only enqueue. Neither may be called
/// while an entry lock is held.
pub struct NotificationDispatcher {
    subscribers: Mutex<Vec<Subscription>>,
    queue_capacity: usize,
}

impl NotificationDispatcher {
    /// Creates a dispatcher whose per-subscriber queues hold `queue_capacity`
    /// undelivered notifications before further ones are dropped.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Creates a dispatcher with the configured queue capacity.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.dispatch_queue_capacity)
    }

    /// Registers a subscriber and returns its delivery queue.
    ///
    /// A subscription equal to an existing one (same client and handle)
    /// replaces it: the old queue is closed, the filter is updated. One
    /// subscription per client+handle, however many requests are in flight.
    pub fn subscribe(&self, identity: CallbackIdentity) -> mpsc::Receiver<EventNotification> {
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        let mut subscribers = self.subscribers.lock().expect("subscriber registry poisoned");

        if let Some(existing) = subscribers.iter_mut().find(|s| s.identity == identity) {
            info!(client = %identity.client_id, handle = identity.handle.id(),
                  "Replacing existing subscription");
            existing.identity = identity;
            existing.sender = sender;
        } else {
            info!(client = %identity.client_id, handle = identity.handle.id(),
                  "Registered subscription");
            subscribers.push(Subscription { identity, sender });
        }
        receiver
    }

    /// Removes a subscription. Undelivered notifications are dropped.
    pub fn unsubscribe(&self, identity: &CallbackIdentity) {
        let mut subscribers = self.subscribers.lock().expect("subscriber registry poisoned");
        subscribers.retain(|s| s.identity != *identity);
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("subscriber registry poisoned")
            .len()
    }

    /// Resolves the async callback identity for an accepted operation from
    /// its ambient context.
    pub fn accept_async(&self, ctx: &OperationContext) -> Result<AsyncCallbackIdentity> {
        let client_id = ctx
            .client_id()
            .ok_or_else(|| CacheError::Internal("operation context missing ClientId".to_string()))?;
        let handle = ctx.callback_handle().ok_or_else(|| {
            CacheError::Internal("operation context missing CallbackHandle".to_string())
        })?;
        let request_id = ctx.request_id().ok_or_else(|| {
            CacheError::Internal("operation context missing RequestId".to_string())
        })?;

        let base = CallbackIdentity::new(client_id, handle, ctx.event_filter());
        Ok(AsyncCallbackIdentity::new(base, request_id))
    }

    /// Reports an async operation's completion.
    ///
    /// Every subscription equal to the identity under the relaxed predicate
    /// (client and handle match, request id ignored) receives the
    /// notification, tagged with the completing request's id.
    pub fn complete_async(
        &self,
        identity: &AsyncCallbackIdentity,
        opcode: EventOpcode,
        key: impl Into<String>,
        snapshot: Option<EventSnapshot>,
    ) {
        let notification = EventNotification {
            opcode,
            key: key.into(),
            snapshot,
            request_id: Some(identity.request_id),
        };
        self.deliver(&notification, |sub| identity.matches_subscription(sub));
    }

    /// Publishes a cache event to every subscriber.
    pub fn publish(&self, opcode: EventOpcode, key: impl Into<String>, snapshot: Option<EventSnapshot>) {
        let notification = EventNotification {
            opcode,
            key: key.into(),
            snapshot,
            request_id: None,
        };
        self.deliver(&notification, |_| true);
    }

    /// Non-blocking fan-out. A subscriber whose queue is full misses this
    /// notification; a disconnected subscriber is pruned.
    fn deliver<F: Fn(&CallbackIdentity) -> bool>(&self, notification: &EventNotification, matches: F) {
        let mut subscribers = self.subscribers.lock().expect("subscriber registry poisoned");

        subscribers.retain(|sub| {
            if !matches(&sub.identity) {
                return true;
            }
            // Honor the subscriber's filter: strip the snapshot unless the
            // subscriber asked for data
            let mut outgoing = notification.clone();
            if sub.identity.filter != EventFilter::DataWithMetadata {
                outgoing.snapshot = None;
            }
            match sub.sender.try_send(outgoing) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    debug!(client = %sub.identity.client_id, key = %notification.key,
                           "Subscriber queue full, dropping notification");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(client = %sub.identity.client_id,
                           "Subscriber disconnected, pruning subscription");
                    false
                }
            }
        });
    }
}
