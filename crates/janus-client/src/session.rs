//! Sessions: server-allocated groupings that plugin handles attach under.
//!
//! A [`Session`] exists only after the gateway confirmed a `create` call,
//! and leaves the connection's tree only after the gateway confirms
//! `destroy` — a failed destroy leaves the entry intact so the caller can
//! retry.  Each session guards its own handle map with its own lock; the
//! connection-level lock is never held while it is taken.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use janus_proto::{new_request, AckPayload, FieldMap, IncomingMessage};

use crate::error::ClientError;
use crate::gateway::{recv_reply, ConnectionShared};
use crate::handle::Handle;

/// Depth of the session-level event stream.
const EVENT_STREAM_CAPACITY: usize = 2;

/// One server-allocated session on the gateway.
pub struct Session {
    id: u64,
    /// Back-reference for building outbound calls only; never an owner.
    shared: Weak<ConnectionShared>,
    /// Server-assigned handle id → handle, behind this session's own lock.
    pub(crate) handles: Mutex<HashMap<u64, Arc<Handle>>>,
    // TODO: deliver session-scoped `timeout` pushes here; the dispatcher
    // currently drops them because they carry neither a call identifier
    // nor a plugin scope.
    #[allow(dead_code)]
    events_tx: mpsc::Sender<IncomingMessage>,
    events_rx: Mutex<mpsc::Receiver<IncomingMessage>>,
}

impl Session {
    pub(crate) fn new(id: u64, shared: Weak<ConnectionShared>) -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::channel(EVENT_STREAM_CAPACITY);
        Arc::new(Self {
            id,
            shared,
            handles: Mutex::new(HashMap::new()),
            events_tx,
            events_rx: Mutex::new(events_rx),
        })
    }

    /// Server-assigned session id, unique for the connection's lifetime.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Receives the next session-scoped event.
    ///
    /// Returns `None` once the stream is closed.
    pub async fn next_event(&self) -> Option<IncomingMessage> {
        self.events_rx.lock().await.recv().await
    }

    fn shared(&self) -> Result<Arc<ConnectionShared>, ClientError> {
        self.shared.upgrade().ok_or(ClientError::ConnectionClosed)
    }

    /// Issues a call scoped to this session.
    pub(crate) async fn call(
        &self,
        mut fields: FieldMap,
    ) -> Result<mpsc::Receiver<IncomingMessage>, ClientError> {
        fields.insert("session_id".to_string(), json!(self.id));
        Ok(self.shared()?.call(fields).await)
    }

    /// Attaches a plugin to this session.
    ///
    /// On success the new [`Handle`] is registered under this session's
    /// lock, keyed by the server-returned id.
    pub async fn attach(&self, plugin: &str) -> Result<Arc<Handle>, ClientError> {
        let mut fields = new_request("attach");
        fields.insert("plugin".to_string(), json!(plugin));
        let mut slot = self.call(fields).await?;

        let success = match recv_reply(&mut slot).await? {
            IncomingMessage::Success(success) => success,
            IncomingMessage::Error(err) => return Err(err.error.into()),
            _ => return Err(ClientError::UnexpectedResponse { request: "attach" }),
        };
        let id = success
            .data
            .map(|data| data.id)
            .ok_or(ClientError::UnexpectedResponse { request: "attach" })?;

        let handle = Handle::new(id, self.id, self.shared.clone());
        self.handles.lock().await.insert(id, Arc::clone(&handle));
        debug!(session_id = self.id, handle_id = id, plugin, "handle attached");
        Ok(handle)
    }

    /// Refreshes the gateway's session timeout.
    pub async fn keep_alive(&self) -> Result<AckPayload, ClientError> {
        let mut slot = self.call(new_request("keepalive")).await?;
        match recv_reply(&mut slot).await? {
            IncomingMessage::Ack(ack) => Ok(ack),
            IncomingMessage::Error(err) => Err(err.error.into()),
            _ => Err(ClientError::UnexpectedResponse { request: "keepalive" }),
        }
    }

    /// Tears this session down on the gateway.
    ///
    /// The session is removed from the connection's tree only when the
    /// gateway confirms; on error it stays reachable and the caller may
    /// retry.
    pub async fn destroy(&self) -> Result<AckPayload, ClientError> {
        let mut slot = self.call(new_request("destroy")).await?;
        let ack = match recv_reply(&mut slot).await? {
            IncomingMessage::Ack(ack) => ack,
            IncomingMessage::Error(err) => return Err(err.error.into()),
            _ => return Err(ClientError::UnexpectedResponse { request: "destroy" }),
        };

        if let Some(shared) = self.shared.upgrade() {
            shared.sessions.lock().await.remove(&self.id);
            debug!(session_id = self.id, "session destroyed");
        }
        Ok(ack)
    }

    /// Looks up a live handle by its server-assigned id.
    pub async fn handle(&self, id: u64) -> Option<Arc<Handle>> {
        self.handles.lock().await.get(&id).cloned()
    }

    /// Number of handles currently attached to this session.
    pub async fn handle_count(&self) -> usize {
        self.handles.lock().await.len()
    }
}
