//! Scripted in-process gateway for integration tests.
//!
//! Each test gets a real WebSocket server on a loopback port.  The server
//! is a dumb pipe with a script on the other side of two channels:
//!
//! - every JSON request the client writes is forwarded to the test through
//!   [`MockGateway::next_request`];
//! - every frame the test pushes through [`MockGateway::push`] /
//!   [`MockGateway::reply`] is written to the client.
//!
//! This keeps the full protocol decision-making in the test body, which is
//! where a scripted gateway belongs: the test IS the gateway.

#![allow(dead_code)] // each integration-test crate uses a different subset

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;

/// Sub-protocol the client requests; a real Janus gateway echoes it back in
/// the handshake response, so the scripted gateway must too.
const SIGNALLING_SUBPROTOCOL: &str = "janus-protocol";

/// Generous upper bound for any single await in a test.  Hitting it means
/// the routing under test lost a frame, not that the machine is slow.
pub const TEST_DEADLINE: Duration = Duration::from_secs(5);

pub struct MockGateway {
    /// URL the client under test connects to.
    pub url: String,
    requests: mpsc::Receiver<Value>,
    replies: mpsc::Sender<String>,
    server: JoinHandle<()>,
}

/// Makes client logs visible when a test runs with `RUST_LOG` set.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

impl MockGateway {
    /// Binds a loopback listener and serves exactly one client connection.
    pub async fn spawn() -> Self {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback listener");
        let addr = listener.local_addr().expect("listener has an address");

        let (request_tx, requests) = mpsc::channel::<Value>(64);
        let (replies, mut reply_rx) = mpsc::channel::<String>(64);

        let server = tokio::spawn(async move {
            let (stream, _peer) = listener.accept().await.expect("client connects");
            let echo_subprotocol = |_req: &Request, mut response: Response| {
                response.headers_mut().insert(
                    SEC_WEBSOCKET_PROTOCOL,
                    HeaderValue::from_static(SIGNALLING_SUBPROTOCOL),
                );
                Ok(response)
            };
            let ws = accept_hdr_async(stream, echo_subprotocol)
                .await
                .expect("WebSocket handshake");
            let (mut sink, mut source) = ws.split();

            loop {
                tokio::select! {
                    frame = source.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            let value: Value =
                                serde_json::from_str(&text).expect("client sends valid JSON");
                            if request_tx.send(value).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            let _ = sink.send(Message::Pong(payload)).await;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            // Complete the close handshake before hanging up.
                            let _ = sink.send(Message::Close(frame)).await;
                            break;
                        }
                        Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    },
                    reply = reply_rx.recv() => match reply {
                        Some(text) => {
                            if sink.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
        });

        Self {
            url: format!("ws://{addr}"),
            requests,
            replies,
            server,
        }
    }

    /// Next request frame the client wrote, as parsed JSON.
    pub async fn next_request(&mut self) -> Value {
        timeout(TEST_DEADLINE, self.requests.recv())
            .await
            .expect("timed out waiting for a client request")
            .expect("client connection ended")
    }

    /// Writes a raw frame to the client.
    pub async fn push(&self, frame: Value) {
        self.replies
            .send(frame.to_string())
            .await
            .expect("server task alive");
    }

    /// Writes `frame` to the client with the call identifier echoed from
    /// `request`.
    pub async fn reply(&self, request: &Value, mut frame: Value) {
        frame["transaction"] = request["transaction"].clone();
        self.push(frame).await;
    }

    /// Tears the server down without a close handshake, as a dying gateway
    /// would.
    pub fn kill(self) {
        self.server.abort();
    }
}
