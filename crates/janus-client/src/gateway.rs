//! The gateway connection: resource-tree root and shared call plumbing.
//!
//! [`Gateway`] is the client-side handle to one persistent connection.  It
//! owns the session tree, the correlation table, the outward-facing error
//! channel, and the shutdown signal.  Connecting spawns the two background
//! tasks (liveness prober, dispatcher); closing signals them to stop and
//! closes the connection, which makes the dispatcher's pending read fail
//! and that task exit.
//!
//! Every operation at every level of the tree funnels through
//! [`ConnectionShared::call`]: build the request map, register a
//! correlation identifier, merge authentication, write the frame, and hand
//! the caller the delivery slot to block on.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::debug;

use janus_proto::{encode_request, new_request, FieldMap, IncomingMessage, InfoPayload};

use crate::config::ClientConfig;
use crate::dispatcher;
use crate::error::{ClientError, ErrorReporter, WsError};
use crate::session::Session;
use crate::transaction::TransactionTable;
use crate::transport::{self, WsSink};

// ── Shared connection state ───────────────────────────────────────────────────

/// State shared by the resource tree and the background tasks.
///
/// Sessions and handles keep `Weak` references back to this; the strong
/// owners are the caller's [`Gateway`] clones and the background tasks, so
/// the tree can never keep a closed connection alive on its own.
pub(crate) struct ConnectionShared {
    /// Write-serialization point for all outbound frames.
    pub(crate) sink: Mutex<WsSink>,
    /// Correlation table for outstanding calls.
    pub(crate) transactions: TransactionTable,
    /// Resource-tree root: server-assigned session id → session.
    pub(crate) sessions: Mutex<HashMap<u64, Arc<Session>>>,
    pub(crate) config: ClientConfig,
    pub(crate) errors: ErrorReporter,
    /// Cooperative shutdown signal watched by the liveness prober.
    pub(crate) shutdown: watch::Sender<bool>,
}

impl ConnectionShared {
    /// The uniform call pattern shared by gateway, session, and handle
    /// operations.
    ///
    /// On a serialize or write failure the error is reported on the error
    /// surface and the returned slot is never fulfilled: the caller blocks
    /// until it imposes its own external timeout.  The correlation entry
    /// keeps the slot's sender alive, so the receiver never observes a
    /// closed channel by accident.
    pub(crate) async fn call(&self, mut fields: FieldMap) -> mpsc::Receiver<IncomingMessage> {
        let (id, slot) = self.transactions.register().await;
        fields.insert("transaction".to_string(), Value::String(id));
        merge_auth(&mut fields, &self.config);

        let text = match encode_request(&fields) {
            Ok(text) => text,
            Err(err) => {
                self.errors.report(err.into());
                return slot;
            }
        };
        if let Err(err) = transport::write_text(&self.sink, text).await {
            self.errors.report(err.into());
        }
        slot
    }
}

/// Merges the reserved authentication field into an outbound request:
/// prefer the configured secret, else the configured token, never both.
fn merge_auth(fields: &mut FieldMap, config: &ClientConfig) {
    if let Some(secret) = &config.api_secret {
        fields.insert("apisecret".to_string(), json!(secret));
    } else if let Some(token) = &config.token {
        fields.insert("token".to_string(), json!(token));
    }
}

/// Blocks on a delivery slot until the dispatcher fulfils it.
pub(crate) async fn recv_reply(
    slot: &mut mpsc::Receiver<IncomingMessage>,
) -> Result<IncomingMessage, ClientError> {
    slot.recv().await.ok_or(ClientError::ConnectionClosed)
}

// ── Public handle ─────────────────────────────────────────────────────────────

/// Client-side handle to one gateway connection.
///
/// Cheap to clone; all clones share the same connection and resource tree.
#[derive(Clone)]
pub struct Gateway {
    shared: Arc<ConnectionShared>,
}

impl Gateway {
    /// Connects to the gateway at `url` with default configuration.
    ///
    /// Returns the gateway together with the receiver for connectivity
    /// errors hit by the background tasks.  Reporting on that channel is
    /// best-effort: errors nobody is waiting for go to the log instead.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the WebSocket handshake fails.
    pub async fn connect(url: &str) -> Result<(Self, mpsc::Receiver<ClientError>), ClientError> {
        Self::connect_with_config(url, ClientConfig::default()).await
    }

    /// Connects with explicit configuration (authentication, probe cadence).
    pub async fn connect_with_config(
        url: &str,
        config: ClientConfig,
    ) -> Result<(Self, mpsc::Receiver<ClientError>), ClientError> {
        let conn = transport::connect(url).await?;
        let (sink, stream) = conn.split();

        let (errors, error_rx) = ErrorReporter::channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(ConnectionShared {
            sink: Mutex::new(sink),
            transactions: TransactionTable::new(),
            sessions: Mutex::new(HashMap::new()),
            config,
            errors,
            shutdown,
        });

        transport::spawn_keepalive(Arc::clone(&shared), shutdown_rx);
        dispatcher::spawn(Arc::clone(&shared), stream);

        Ok((Self { shared }, error_rx))
    }

    /// Queries the gateway's identity and capability summary.
    ///
    /// # Errors
    ///
    /// [`ClientError::Gateway`] if the gateway answers with an error-class
    /// payload; [`ClientError::UnexpectedResponse`] for any other class.
    pub async fn info(&self) -> Result<InfoPayload, ClientError> {
        let mut slot = self.shared.call(new_request("info")).await;
        match recv_reply(&mut slot).await? {
            IncomingMessage::Info(info) => Ok(info),
            IncomingMessage::Error(err) => Err(err.error.into()),
            _ => Err(ClientError::UnexpectedResponse { request: "info" }),
        }
    }

    /// Asks the gateway for a new session and registers it in the tree
    /// under the server-returned id.
    pub async fn create(&self) -> Result<Arc<Session>, ClientError> {
        let mut slot = self.shared.call(new_request("create")).await;
        let success = match recv_reply(&mut slot).await? {
            IncomingMessage::Success(success) => success,
            IncomingMessage::Error(err) => return Err(err.error.into()),
            _ => return Err(ClientError::UnexpectedResponse { request: "create" }),
        };
        let id = success
            .data
            .map(|data| data.id)
            .ok_or(ClientError::UnexpectedResponse { request: "create" })?;

        let session = Session::new(id, Arc::downgrade(&self.shared));
        self.shared
            .sessions
            .lock()
            .await
            .insert(id, Arc::clone(&session));
        debug!(session_id = id, "session created");
        Ok(session)
    }

    /// Looks up a live session by its server-assigned id.
    pub async fn session(&self, id: u64) -> Option<Arc<Session>> {
        self.shared.sessions.lock().await.get(&id).cloned()
    }

    /// Number of sessions currently registered in the tree.
    pub async fn session_count(&self) -> usize {
        self.shared.sessions.lock().await.len()
    }

    /// Signals the background tasks to stop and closes the connection.
    ///
    /// Idempotent and non-blocking: calling it again — or after the prober
    /// already died on a transport error — is a no-op.  The dispatcher
    /// exits when its pending read fails; the two teardown paths are not
    /// otherwise synchronized.
    pub async fn close(&self) -> Result<(), ClientError> {
        if *self.shared.shutdown.borrow() {
            return Ok(());
        }
        let _ = self.shared.shutdown.send(true);

        let mut sink = self.shared.sink.lock().await;
        match sink.close().await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
