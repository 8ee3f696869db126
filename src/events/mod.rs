//! Events Module
//!
//! The asynchronous callback and notification pipeline: subscriber
//! identities, opcode-tagged event snapshots and the best-effort dispatcher
//! that correlates operation completions back to subscribing clients.

mod callback;
mod dispatcher;
mod snapshot;

// Re-export public types
pub use callback::{AsyncCallbackIdentity, CallbackHandle, CallbackIdentity, EventFilter};
pub use dispatcher::{EventNotification, NotificationDispatcher};
pub use snapshot::{EventOpcode, EventSnapshot};
