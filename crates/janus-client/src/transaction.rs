//! Call-identifier correlation.
//!
//! Every outbound call registers a fresh, globally unique identifier here
//! together with a single-slot delivery channel.  The dispatcher looks the
//! identifier up when a reply arrives and hands the frame to the waiting
//! caller through the slot.
//!
//! # The `used` flag
//!
//! The gateway may send an immediate acknowledgement and, later, an
//! asynchronous event carrying the *same* identifier — and after that, keep
//! tagging related push traffic with it.  Once an event-class payload has
//! been observed under an identifier, [`TransactionTable::mark_used`]
//! retires it from reply matching: `unused → used` is the only transition
//! and it is irreversible.
//!
//! # Retention
//!
//! Entries are never removed.  The table grows for the connection's
//! lifetime; this is deliberate, because a retired identifier must keep
//! answering `is_used` for as long as the gateway may still reference it.
//! It also pins the slot's sender, so a caller whose outbound write failed
//! blocks forever instead of observing a closed channel.

use std::collections::HashMap;

use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use janus_proto::IncomingMessage;

/// Capacity of one pending call's delivery slot.  Deliveries run on
/// detached tasks, so a depth of one is enough to decouple the dispatcher
/// from the caller.
const SLOT_CAPACITY: usize = 1;

/// One outstanding (or retired) call.
struct PendingCall {
    /// Sender half of the caller's delivery slot.
    slot: mpsc::Sender<IncomingMessage>,
    /// Set once an event-class payload was seen under this identifier.
    used: bool,
}

/// Registry of call identifiers, keyed by the wire `transaction` string.
pub(crate) struct TransactionTable {
    entries: Mutex<HashMap<String, PendingCall>>,
}

impl TransactionTable {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Allocates a fresh identifier and delivery slot.
    ///
    /// Identifiers are UUIDv7: time-ordered, with a collision probability
    /// that is negligible for the lifetime of a connection.
    pub async fn register(&self) -> (String, mpsc::Receiver<IncomingMessage>) {
        let id = Uuid::now_v7().to_string();
        let (slot, rx) = mpsc::channel(SLOT_CAPACITY);
        let previous = self.entries.lock().await.insert(
            id.clone(),
            PendingCall { slot, used: false },
        );
        debug_assert!(previous.is_none(), "call identifiers must never repeat");
        (id, rx)
    }

    /// Sender half of the delivery slot for `id`, if registered.
    pub async fn lookup(&self, id: &str) -> Option<mpsc::Sender<IncomingMessage>> {
        self.entries.lock().await.get(id).map(|call| call.slot.clone())
    }

    /// Whether `id` has been retired from reply matching.
    ///
    /// Unknown identifiers are reported as unused, matching how the
    /// dispatcher treats frames for calls it never registered.
    pub async fn is_used(&self, id: &str) -> bool {
        self.entries
            .lock()
            .await
            .get(id)
            .map(|call| call.used)
            .unwrap_or(false)
    }

    /// Retires `id` from reply matching.  One-shot; never reversed.
    pub async fn mark_used(&self, id: &str) {
        if let Some(call) = self.entries.lock().await.get_mut(id) {
            call.used = true;
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
