//! Error types for the connection engine.
//!
//! The taxonomy separates failures by who can recover from them:
//!
//! - [`ClientError::Transport`] / [`ClientError::ProbeTimeout`] – fatal to
//!   the background task that hit them; reported best-effort on the error
//!   channel handed out at connect time.
//! - [`ClientError::Gateway`] – the gateway rejected one request; fully
//!   recoverable at the call site.
//! - [`ClientError::UnexpectedResponse`] – a reply arrived whose class the
//!   calling operation does not understand.
//! - [`ClientError::ConnectionClosed`] – the connection (or the resource the
//!   call was scoped to) no longer exists.
//!
//! Frames that cannot be routed at all are *not* errors: the dispatcher
//! drops them with a diagnostic log line and keeps going.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

use janus_proto::{CodecError, ErrorData};

/// WebSocket-level error type, re-exported for matching convenience.
pub type WsError = tokio_tungstenite::tungstenite::Error;

/// Everything a gateway operation or background task can fail with.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection read or write failed.  The task that hit it stops
    /// permanently; no reconnection is attempted.
    #[error("transport error: {0}")]
    Transport(#[from] WsError),

    /// The liveness probe did not complete within its deadline.
    #[error("liveness probe timed out after {0:?}")]
    ProbeTimeout(Duration),

    /// The gateway answered with an error-class payload.
    #[error("gateway error {code}: {reason}")]
    Gateway { code: i32, reason: String },

    /// A reply arrived whose class is not among the classes this operation
    /// understands.
    #[error("unexpected response received to {request:?} request")]
    UnexpectedResponse { request: &'static str },

    /// A frame failed to encode or decode.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The connection is gone, or the parent resource of a scoped call has
    /// already been torn down.
    #[error("connection closed")]
    ConnectionClosed,
}

impl From<ErrorData> for ClientError {
    fn from(err: ErrorData) -> Self {
        Self::Gateway {
            code: err.code,
            reason: err.reason,
        }
    }
}

// ── Best-effort error reporting ───────────────────────────────────────────────

/// Sender half of the outward-facing error channel.
///
/// Reporting never blocks the reporter: if nobody is draining the channel,
/// the error is demoted to a diagnostic log line and dropped.
#[derive(Clone)]
pub(crate) struct ErrorReporter {
    tx: mpsc::Sender<ClientError>,
}

impl ErrorReporter {
    /// Creates the reporter and the receiver handed to the caller.
    pub fn channel() -> (Self, mpsc::Receiver<ClientError>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }

    /// Reports `err` without blocking; falls back to the diagnostic sink.
    pub fn report(&self, err: ClientError) {
        if let Err(unsent) = self.tx.try_send(err) {
            warn!("no error receiver, dropping: {}", unsent.into_inner());
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
