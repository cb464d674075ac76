//! # janus-client
//!
//! Async client for the Janus WebRTC signalling gateway.
//!
//! One persistent WebSocket connection carries many independent logical
//! conversations: administrative queries, session lifecycle, and per-handle
//! plugin negotiation.  The gateway may answer a request immediately, answer
//! it later, or push unsolicited events tagged with the identifiers of a
//! prior request.  This crate demultiplexes that single inbound stream into
//! replies for pending calls and events for the right handle.
//!
//! # Architecture
//!
//! ```text
//! caller tasks                 background tasks
//! ────────────                 ────────────────
//! Gateway ──┐                  keepalive  (periodic WebSocket ping)
//! Session ──┼─ call() ──────►  [write point: one locked sink]
//! Handle  ──┘      ▲                    │ WebSocket
//!                  │                    ▼
//!            delivery slot  ◄──  dispatcher (single read loop)
//!            handle events  ◄──      │ one detached task per delivery
//! ```
//!
//! - **Resource tree** – [`Gateway`] owns sessions, a [`Session`] owns plugin
//!   [`Handle`]s; each level keyed by the server-assigned numeric id and
//!   guarded by its own lock.
//! - **Correlation** – every outbound call registers a fresh identifier and a
//!   delivery slot; the dispatcher decides per inbound frame whether it
//!   satisfies a pending call or must be forwarded as a push event.
//! - **Liveness** – a background prober pings the gateway on a fixed
//!   interval and reports (then stops) on failure.
//!
//! # Example
//!
//! ```no_run
//! use janus_client::Gateway;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), janus_client::ClientError> {
//! let (gateway, _errors) = Gateway::connect("ws://127.0.0.1:8188/janus").await?;
//! let session = gateway.create().await?;
//! let handle = session.attach("janus.plugin.videoroom").await?;
//! let reply = handle
//!     .message(Some(json!({"request": "join", "room": 1234, "ptype": "publisher"})), None)
//!     .await?;
//! println!("joined: {:?}", reply.plugindata);
//! # Ok(())
//! # }
//! ```
//!
//! # What this crate does not do
//!
//! No automatic reconnection, no back-pressure on outstanding calls, and no
//! call timeouts: a call blocks its caller until a frame satisfies it.
//! Callers needing liveness must impose their own external timeout.

pub mod config;
pub mod error;
pub mod gateway;
pub mod handle;
pub mod session;

mod dispatcher;
mod transaction;
mod transport;

pub use config::ClientConfig;
pub use error::ClientError;
pub use gateway::Gateway;
pub use handle::{Handle, HandleTags};
pub use session::Session;
pub use transport::SIGNALLING_SUBPROTOCOL;
