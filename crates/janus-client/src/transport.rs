//! WebSocket transport: connect, the single write-serialization point, and
//! the liveness prober.
//!
//! The connection is split once at connect time: the read half belongs to
//! the dispatcher, the write half goes behind one async lock shared by every
//! caller and the prober, so outbound frames are never interleaved on the
//! wire.
//!
//! The prober pings the gateway on a fixed interval with a bounded deadline
//! per probe.  On failure it reports the error and exits — it does not retry
//! and it does not reconnect; that policy belongs to the embedding
//! application.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::error::{ClientError, WsError};
use crate::gateway::ConnectionShared;

/// Sub-protocol requested during the WebSocket handshake; the gateway
/// routes the connection to its signalling transport based on this name.
pub const SIGNALLING_SUBPROTOCOL: &str = "janus-protocol";

pub(crate) type WsConn = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsConn, WsMessage>;
pub(crate) type WsStream = SplitStream<WsConn>;

/// Opens the persistent connection to the gateway at `url`.
pub(crate) async fn connect(url: &str) -> Result<WsConn, ClientError> {
    let mut request = url.into_client_request()?;
    request.headers_mut().insert(
        SEC_WEBSOCKET_PROTOCOL,
        HeaderValue::from_static(SIGNALLING_SUBPROTOCOL),
    );

    let (conn, response) = connect_async(request).await?;
    debug!(status = %response.status(), "gateway connection established");
    Ok(conn)
}

/// Writes one text frame through the shared sink.
pub(crate) async fn write_text(sink: &Mutex<WsSink>, text: String) -> Result<(), WsError> {
    let mut sink = sink.lock().await;
    sink.send(WsMessage::Text(text)).await
}

/// Spawns the liveness prober.
///
/// Fires every `ping_interval`; each probe must complete within
/// `ping_timeout`.  The task exits when the shutdown signal flips or the
/// first probe fails (after reporting the error).
pub(crate) fn spawn_keepalive(
    shared: Arc<ConnectionShared>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let deadline = shared.config.ping_timeout;
        let mut ticker = interval(shared.config.ping_interval);
        // An interval's first tick fires immediately; the first probe
        // belongs one full period after connect.
        ticker.tick().await;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("shutdown signalled; liveness prober exiting");
                        return;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(err) = probe(&shared, deadline).await {
                        shared.errors.report(err);
                        return;
                    }
                }
            }
        }
    })
}

/// Sends one low-level ping frame within `deadline`.
async fn probe(shared: &ConnectionShared, deadline: Duration) -> Result<(), ClientError> {
    let write = async {
        let mut sink = shared.sink.lock().await;
        sink.send(WsMessage::Ping(Vec::new())).await
    };

    match timeout(deadline, write).await {
        Ok(Ok(())) => {
            debug!("liveness probe sent");
            Ok(())
        }
        Ok(Err(err)) => {
            warn!("liveness probe failed: {err}");
            Err(err.into())
        }
        Err(_) => {
            warn!(?deadline, "liveness probe deadline exceeded");
            Err(ClientError::ProbeTimeout(deadline))
        }
    }
}
