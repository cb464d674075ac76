//! The dispatcher: one background reader loop for the whole connection.
//!
//! Every inbound frame is decoded into a classified message and routed by a
//! two-way decision:
//!
//! 1. The frame carries a plugin-scope name, **or** its call identifier has
//!    already been retired (`used`) → it is an asynchronous **push event**:
//!    resolve the owning session, then the owning handle, and deliver onto
//!    that handle's event stream.  Unresolvable frames are dropped with a
//!    diagnostic — the loop never blocks and never fails over them.
//! 2. Otherwise → it is a **reply** to a pending call: an event-class
//!    payload retires the identifier first (so any later frame reusing it
//!    is routed as a push event), then the frame is delivered to the call's
//!    slot.  Replies for unknown identifiers are dropped with a diagnostic.
//!
//! Deliveries always happen on a detached task so one slow consumer cannot
//! delay classification of subsequent frames.  A read failure is reported
//! on the error surface and terminates the loop permanently; reconnection
//! is the embedding application's business.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tracing::{debug, trace, warn};

use janus_proto::{decode_incoming, IncomingMessage};

use crate::gateway::ConnectionShared;
use crate::transport::WsStream;

/// Which way the routing decision went for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// Forward onto the owning handle's event stream.
    PushEvent,
    /// Deliver to the pending call registered under the frame's identifier.
    Reply,
}

/// The routing decision, given the frame and the retired-state of its
/// identifier.
fn classify(msg: &IncomingMessage, identifier_used: bool) -> Route {
    if msg.plugin_scope().is_some() || identifier_used {
        Route::PushEvent
    } else {
        Route::Reply
    }
}

/// Spawns the reader loop for `stream`.
pub(crate) fn spawn(shared: Arc<ConnectionShared>, stream: WsStream) -> JoinHandle<()> {
    tokio::spawn(run(shared, stream))
}

async fn run(shared: Arc<ConnectionShared>, mut stream: WsStream) {
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Ping(_) | WsMessage::Pong(_)) => {
                trace!("transport-level ping/pong");
                continue;
            }
            Ok(WsMessage::Binary(_)) => {
                warn!("unexpected binary frame on a text protocol; ignored");
                continue;
            }
            Ok(WsMessage::Close(_)) => {
                debug!("close frame received");
                continue;
            }
            Ok(WsMessage::Frame(_)) => continue,
            Err(err) => {
                shared.errors.report(err.into());
                return;
            }
        };

        let msg = match decode_incoming(&text) {
            Ok(msg) => msg,
            Err(err) => {
                warn!("dropping undecodable frame: {err}");
                continue;
            }
        };

        route(&shared, msg).await;
    }
    debug!("connection closed; dispatcher exiting");
}

async fn route(shared: &Arc<ConnectionShared>, msg: IncomingMessage) {
    let identifier_used = match msg.transaction() {
        Some(id) => shared.transactions.is_used(id).await,
        None => false,
    };

    match classify(&msg, identifier_used) {
        Route::PushEvent => deliver_push_event(shared, msg).await,
        Route::Reply => deliver_reply(shared, msg).await,
    }
}

/// Resolves the owning handle and delivers on its event stream.
///
/// Tree locks are taken outermost-first and each is released before the
/// next lookup; neither is held at delivery time.
async fn deliver_push_event(shared: &Arc<ConnectionShared>, msg: IncomingMessage) {
    let handle_id = msg.sender();
    if handle_id == 0 {
        debug!(kind = msg.kind(), "dropping push event without a sender handle");
        return;
    }
    let session_id = msg.session_id();

    let session = { shared.sessions.lock().await.get(&session_id).cloned() };
    let Some(session) = session else {
        warn!(session_id, "unable to deliver event: session gone");
        return;
    };
    let handle = { session.handles.lock().await.get(&handle_id).cloned() };
    let Some(handle) = handle else {
        warn!(session_id, handle_id, "unable to deliver event: handle gone");
        return;
    };

    let slot = handle.events_sender();
    tokio::spawn(async move {
        // A send only fails once the handle is torn down; the event is
        // simply lost then, like any other unroutable frame.
        let _ = slot.send(msg).await;
    });
}

/// Delivers a reply to the pending call registered under its identifier.
async fn deliver_reply(shared: &Arc<ConnectionShared>, msg: IncomingMessage) {
    let Some(id) = msg.transaction().map(str::to_owned) else {
        // TODO: surface session-scoped `timeout` frames on the owning
        // session's event stream instead of dropping them here.
        debug!(kind = msg.kind(), "dropping frame with no call identifier");
        return;
    };

    if msg.is_event() {
        // First event-class payload under this identifier: retire it, so
        // later frames reusing it are routed as push events.
        shared.transactions.mark_used(&id).await;
    }

    let Some(slot) = shared.transactions.lookup(&id).await else {
        debug!(kind = msg.kind(), transaction = %id, "dropping reply for unknown call");
        return;
    };
    tokio::spawn(async move {
        let _ = slot.send(msg).await;
    });
}

// ── Tests ─────────────────────────────────────────────────────────────────────
