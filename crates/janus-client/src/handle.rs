//! Plugin handles: per-attachment negotiation and event streams.
//!
//! A [`Handle`] is the client's side of one plugin attachment.  Plugin
//! traffic and incremental connectivity candidates go out through it, and
//! asynchronous pushes from the plugin come back on its event stream.
//!
//! The interesting operation is [`Handle::message`]: the gateway answers a
//! plugin message with an immediate acknowledgement and delivers the real
//! outcome later under the same call identifier, so the reply wait loop
//! discards any number of acks and returns only on an event-class or
//! error-class payload.

use std::sync::{Arc, Weak};

use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use janus_proto::{new_request, AckPayload, EventPayload, FieldMap, IncomingMessage, SuccessPayload};

use crate::error::ClientError;
use crate::gateway::{recv_reply, ConnectionShared};

/// Depth of the handle-level event stream.
///
/// Deliveries run on detached tasks, so a full stream stalls only those
/// tasks — never the dispatcher.
const EVENT_STREAM_CAPACITY: usize = 8;

/// Plugin-defined tags callers may pin on a handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandleTags {
    /// Role of this attachment, e.g. `publisher` or `subscriber`.
    pub kind: Option<String>,
    /// Application-level user the attachment acts for.
    pub user: Option<String>,
}

/// One plugin attachment within a session.
pub struct Handle {
    id: u64,
    session_id: u64,
    /// Back-reference for building outbound calls only; never an owner.
    shared: Weak<ConnectionShared>,
    tags: Mutex<HandleTags>,
    events_tx: mpsc::Sender<IncomingMessage>,
    events_rx: Mutex<mpsc::Receiver<IncomingMessage>>,
}

impl Handle {
    pub(crate) fn new(id: u64, session_id: u64, shared: Weak<ConnectionShared>) -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::channel(EVENT_STREAM_CAPACITY);
        Arc::new(Self {
            id,
            session_id,
            shared,
            tags: Mutex::new(HandleTags::default()),
            events_tx,
            events_rx: Mutex::new(events_rx),
        })
    }

    /// Server-assigned handle id, unique within the owning session.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Id of the session this handle is attached under.
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Current plugin-defined tags.
    pub async fn tags(&self) -> HandleTags {
        self.tags.lock().await.clone()
    }

    /// Replaces the plugin-defined tags.
    pub async fn set_tags(&self, tags: HandleTags) {
        *self.tags.lock().await = tags;
    }

    /// Sender half of the event stream; used by the dispatcher's detached
    /// delivery tasks.
    pub(crate) fn events_sender(&self) -> mpsc::Sender<IncomingMessage> {
        self.events_tx.clone()
    }

    /// Receives the next push event routed to this handle.
    ///
    /// Only frames whose session and handle ids match this handle are ever
    /// delivered here.  Returns `None` once the stream is closed.
    pub async fn next_event(&self) -> Option<IncomingMessage> {
        self.events_rx.lock().await.recv().await
    }

    fn shared(&self) -> Result<Arc<ConnectionShared>, ClientError> {
        self.shared.upgrade().ok_or(ClientError::ConnectionClosed)
    }

    /// Issues a call scoped to this session + handle.
    async fn call(
        &self,
        mut fields: FieldMap,
    ) -> Result<mpsc::Receiver<IncomingMessage>, ClientError> {
        fields.insert("session_id".to_string(), json!(self.session_id));
        fields.insert("handle_id".to_string(), json!(self.id));
        Ok(self.shared()?.call(fields).await)
    }

    /// Sends a synchronous plugin request and returns the immediate success
    /// payload.
    ///
    /// # Errors
    ///
    /// [`ClientError::Gateway`] on an error-class reply;
    /// [`ClientError::UnexpectedResponse`] for any other class.
    pub async fn request(&self, body: Option<Value>) -> Result<SuccessPayload, ClientError> {
        let mut fields = new_request("message");
        if let Some(body) = body {
            fields.insert("body".to_string(), body);
        }
        let mut slot = self.call(fields).await?;

        match recv_reply(&mut slot).await? {
            IncomingMessage::Success(success) => Ok(success),
            IncomingMessage::Error(err) => Err(err.error.into()),
            _ => Err(ClientError::UnexpectedResponse { request: "message" }),
        }
    }

    /// Sends an asynchronous plugin message, optionally carrying a session
    /// description, and waits for the event-class outcome.
    ///
    /// The gateway acknowledges immediately and answers later under the
    /// same call identifier; every ack is discarded and only an event or an
    /// error ends the wait.
    pub async fn message(
        &self,
        body: Option<Value>,
        jsep: Option<Value>,
    ) -> Result<EventPayload, ClientError> {
        let mut fields = new_request("message");
        if let Some(body) = body {
            fields.insert("body".to_string(), body);
        }
        if let Some(jsep) = jsep {
            fields.insert("jsep".to_string(), jsep);
        }
        let mut slot = self.call(fields).await?;

        loop {
            match recv_reply(&mut slot).await? {
                IncomingMessage::Ack(_) => {
                    debug!(handle_id = self.id, "ack received; waiting for the real answer");
                }
                IncomingMessage::Event(event) => return Ok(event),
                IncomingMessage::Error(err) => return Err(err.error.into()),
                _ => return Err(ClientError::UnexpectedResponse { request: "message" }),
            }
        }
    }

    /// Sends one incremental connectivity candidate.
    ///
    /// `candidate` is a single ICE candidate object, or `{"completed":
    /// true}` to signal the end of trickling.
    pub async fn trickle(&self, candidate: Value) -> Result<AckPayload, ClientError> {
        let mut fields = new_request("trickle");
        fields.insert("candidate".to_string(), candidate);
        let mut slot = self.call(fields).await?;

        match recv_reply(&mut slot).await? {
            IncomingMessage::Ack(ack) => Ok(ack),
            IncomingMessage::Error(err) => Err(err.error.into()),
            _ => Err(ClientError::UnexpectedResponse { request: "trickle" }),
        }
    }

    /// Sends a batch of connectivity candidates in one call.
    pub async fn trickle_many(&self, candidates: Vec<Value>) -> Result<AckPayload, ClientError> {
        let mut fields = new_request("trickle");
        fields.insert("candidates".to_string(), Value::Array(candidates));
        let mut slot = self.call(fields).await?;

        match recv_reply(&mut slot).await? {
            IncomingMessage::Ack(ack) => Ok(ack),
            IncomingMessage::Error(err) => Err(err.error.into()),
            _ => Err(ClientError::UnexpectedResponse { request: "trickle" }),
        }
    }

    /// Detaches this handle from its plugin.
    ///
    /// The handle is removed from its session's map only when the gateway
    /// confirms; on error it stays reachable and the caller may retry.
    pub async fn detach(&self) -> Result<AckPayload, ClientError> {
        let mut slot = self.call(new_request("detach")).await?;
        let ack = match recv_reply(&mut slot).await? {
            IncomingMessage::Ack(ack) => ack,
            IncomingMessage::Error(err) => return Err(err.error.into()),
            _ => return Err(ClientError::UnexpectedResponse { request: "detach" }),
        };

        if let Some(shared) = self.shared.upgrade() {
            // Parent lock released before the session's own lock is taken.
            let session = { shared.sessions.lock().await.get(&self.session_id).cloned() };
            if let Some(session) = session {
                session.handles.lock().await.remove(&self.id);
                debug!(session_id = self.session_id, handle_id = self.id, "handle detached");
            }
        }
        Ok(ack)
    }
}
