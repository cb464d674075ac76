//! Integration tests for the connection and resource-tree lifecycle.
//!
//! # Purpose
//!
//! These tests exercise the client through its *public* API against a real
//! WebSocket peer (`support::MockGateway`), the same way an application
//! uses it.  They verify:
//!
//! - The happy path: connect, `info`, `create`, `attach`, `keepalive`.
//! - Tree maintenance: `destroy`/`detach` remove a resource from its
//!   parent's map only when the gateway confirms; a failed call leaves the
//!   resource reachable and retryable.
//! - Request framing: method names, scope ids, and the authentication
//!   field (secret preferred over token, never both).
//! - Identifier uniqueness under concurrency.
//! - Shutdown: `close()` is idempotent; a dead transport surfaces on the
//!   error channel while the call that hit it stays blocked.
//!
//! # Why a scripted gateway?
//!
//! The multiplexer's contract is about *which* frame goes *where*, so the
//! tests must control every inbound frame exactly — a canned script over a
//! real socket does that and still exercises the full transport path.

mod support;

use std::collections::HashSet;

use anyhow::Result;
use serde_json::json;
use tokio::time::timeout;

use janus_client::{ClientConfig, ClientError, Gateway};
use support::{MockGateway, TEST_DEADLINE};

// ── Lifecycle ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_info_returns_typed_gateway_summary() -> Result<()> {
    let mut mock = MockGateway::spawn().await;
    let (gateway, _errors) = Gateway::connect(&mock.url).await?;

    let info_task = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.info().await }
    });

    let request = mock.next_request().await;
    assert_eq!(request["janus"], "info");
    mock.reply(
        &request,
        json!({
            "janus": "server_info",
            "name": "Janus WebRTC Server",
            "version": 73,
            "version_string": "0.7.3",
            "data_channels": true,
            "local-ip": "192.168.1.10"
        }),
    )
    .await;

    let info = timeout(TEST_DEADLINE, info_task).await???;
    assert_eq!(info.name, "Janus WebRTC Server");
    assert_eq!(info.version_string, "0.7.3");
    assert!(info.data_channels);
    Ok(())
}

#[tokio::test]
async fn test_info_error_reply_surfaces_gateway_error() -> Result<()> {
    let mut mock = MockGateway::spawn().await;
    let (gateway, _errors) = Gateway::connect(&mock.url).await?;

    let info_task = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.info().await }
    });

    let request = mock.next_request().await;
    mock.reply(
        &request,
        json!({"janus": "error", "error": {"code": 403, "reason": "Unauthorized request"}}),
    )
    .await;

    let err = timeout(TEST_DEADLINE, info_task)
        .await??
        .expect_err("error reply must fail the call");
    match err {
        ClientError::Gateway { code, reason } => {
            assert_eq!(code, 403);
            assert_eq!(reason, "Unauthorized request");
        }
        other => panic!("expected Gateway error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_create_returns_session_with_server_assigned_id() -> Result<()> {
    let mut mock = MockGateway::spawn().await;
    let (gateway, _errors) = Gateway::connect(&mock.url).await?;

    let create_task = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.create().await }
    });

    let request = mock.next_request().await;
    assert_eq!(request["janus"], "create");
    assert!(
        request["transaction"].is_string(),
        "every call must carry an identifier"
    );
    mock.reply(&request, json!({"janus": "success", "data": {"id": 1}}))
        .await;

    let session = timeout(TEST_DEADLINE, create_task).await???;
    assert_eq!(session.id(), 1);
    assert_eq!(gateway.session_count().await, 1);
    assert!(gateway.session(1).await.is_some());
    Ok(())
}

#[tokio::test]
async fn test_attach_registers_handle_under_session() -> Result<()> {
    let mut mock = MockGateway::spawn().await;
    let (gateway, _errors) = Gateway::connect(&mock.url).await?;

    // create
    let create_task = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.create().await }
    });
    let request = mock.next_request().await;
    mock.reply(&request, json!({"janus": "success", "data": {"id": 1}}))
        .await;
    let session = timeout(TEST_DEADLINE, create_task).await???;

    // attach
    let attach_task = tokio::spawn({
        let session = session.clone();
        async move { session.attach("janus.plugin.videoroom").await }
    });
    let request = mock.next_request().await;
    assert_eq!(request["janus"], "attach");
    assert_eq!(request["plugin"], "janus.plugin.videoroom");
    assert_eq!(request["session_id"], 1, "attach is scoped to the session");
    mock.reply(&request, json!({"janus": "success", "session_id": 1, "data": {"id": 5}}))
        .await;

    let handle = timeout(TEST_DEADLINE, attach_task).await???;
    assert_eq!(handle.id(), 5);
    assert_eq!(handle.session_id(), 1);
    assert_eq!(session.handle_count().await, 1);
    assert!(session.handle(5).await.is_some());
    Ok(())
}

#[tokio::test]
async fn test_keepalive_returns_ack() -> Result<()> {
    let mut mock = MockGateway::spawn().await;
    let (gateway, _errors) = Gateway::connect(&mock.url).await?;

    let create_task = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.create().await }
    });
    let request = mock.next_request().await;
    mock.reply(&request, json!({"janus": "success", "data": {"id": 1}}))
        .await;
    let session = timeout(TEST_DEADLINE, create_task).await???;

    let keepalive_task = tokio::spawn({
        let session = session.clone();
        async move { session.keep_alive().await }
    });
    let request = mock.next_request().await;
    assert_eq!(request["janus"], "keepalive");
    assert_eq!(request["session_id"], 1);
    mock.reply(&request, json!({"janus": "ack", "session_id": 1}))
        .await;

    let ack = timeout(TEST_DEADLINE, keepalive_task).await???;
    assert_eq!(ack.session_id, 1);
    Ok(())
}

// ── Tree maintenance on destroy/detach ────────────────────────────────────────

#[tokio::test]
async fn test_destroy_removes_session_only_on_success() -> Result<()> {
    let mut mock = MockGateway::spawn().await;
    let (gateway, _errors) = Gateway::connect(&mock.url).await?;

    let create_task = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.create().await }
    });
    let request = mock.next_request().await;
    mock.reply(&request, json!({"janus": "success", "data": {"id": 1}}))
        .await;
    let session = timeout(TEST_DEADLINE, create_task).await???;

    // First attempt: the gateway refuses.  The session must stay in the
    // tree so the caller can retry.
    let destroy_task = tokio::spawn({
        let session = session.clone();
        async move { session.destroy().await }
    });
    let request = mock.next_request().await;
    assert_eq!(request["janus"], "destroy");
    mock.reply(
        &request,
        json!({"janus": "error", "session_id": 1, "error": {"code": 458, "reason": "Session busy"}}),
    )
    .await;

    let err = timeout(TEST_DEADLINE, destroy_task)
        .await??
        .expect_err("refused destroy must fail");
    assert!(matches!(err, ClientError::Gateway { code: 458, .. }));
    assert_eq!(gateway.session_count().await, 1, "failed destroy keeps the session");

    // Retry: the gateway confirms, the session leaves the tree.
    let destroy_task = tokio::spawn({
        let session = session.clone();
        async move { session.destroy().await }
    });
    let request = mock.next_request().await;
    mock.reply(&request, json!({"janus": "ack", "session_id": 1}))
        .await;

    timeout(TEST_DEADLINE, destroy_task).await???;
    assert_eq!(gateway.session_count().await, 0);
    assert!(gateway.session(1).await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_detach_removes_handle_only_on_success() -> Result<()> {
    let mut mock = MockGateway::spawn().await;
    let (gateway, _errors) = Gateway::connect(&mock.url).await?;

    let create_task = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.create().await }
    });
    let request = mock.next_request().await;
    mock.reply(&request, json!({"janus": "success", "data": {"id": 1}}))
        .await;
    let session = timeout(TEST_DEADLINE, create_task).await???;

    let attach_task = tokio::spawn({
        let session = session.clone();
        async move { session.attach("janus.plugin.echotest").await }
    });
    let request = mock.next_request().await;
    mock.reply(&request, json!({"janus": "success", "session_id": 1, "data": {"id": 5}}))
        .await;
    let handle = timeout(TEST_DEADLINE, attach_task).await???;

    // Refused detach keeps the handle reachable.
    let detach_task = tokio::spawn({
        let handle = handle.clone();
        async move { handle.detach().await }
    });
    let request = mock.next_request().await;
    assert_eq!(request["janus"], "detach");
    assert_eq!(request["session_id"], 1);
    assert_eq!(request["handle_id"], 5);
    mock.reply(
        &request,
        json!({"janus": "error", "session_id": 1, "error": {"code": 460, "reason": "No such handle"}}),
    )
    .await;
    timeout(TEST_DEADLINE, detach_task)
        .await??
        .expect_err("refused detach must fail");
    assert_eq!(session.handle_count().await, 1);

    // Confirmed detach removes it.
    let detach_task = tokio::spawn({
        let handle = handle.clone();
        async move { handle.detach().await }
    });
    let request = mock.next_request().await;
    mock.reply(&request, json!({"janus": "ack", "session_id": 1}))
        .await;
    timeout(TEST_DEADLINE, detach_task).await???;
    assert_eq!(session.handle_count().await, 0);
    Ok(())
}

// ── Request framing ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_api_secret_is_preferred_over_token() -> Result<()> {
    let mut mock = MockGateway::spawn().await;
    let config = ClientConfig::new()
        .with_api_secret("s3cret")
        .with_token("tok");
    let (gateway, _errors) = Gateway::connect_with_config(&mock.url, config).await?;

    let info_task = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.info().await }
    });

    let request = mock.next_request().await;
    assert_eq!(request["apisecret"], "s3cret");
    assert!(
        request.get("token").is_none(),
        "secret and token must never be sent together"
    );
    mock.reply(&request, json!({"janus": "server_info", "name": "Janus"}))
        .await;
    timeout(TEST_DEADLINE, info_task).await???;
    Ok(())
}

#[tokio::test]
async fn test_token_is_sent_when_no_secret_is_configured() -> Result<()> {
    let mut mock = MockGateway::spawn().await;
    let config = ClientConfig::new().with_token("tok");
    let (gateway, _errors) = Gateway::connect_with_config(&mock.url, config).await?;

    let info_task = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.info().await }
    });

    let request = mock.next_request().await;
    assert_eq!(request["token"], "tok");
    assert!(request.get("apisecret").is_none());
    mock.reply(&request, json!({"janus": "server_info", "name": "Janus"}))
        .await;
    timeout(TEST_DEADLINE, info_task).await???;
    Ok(())
}

// ── Concurrency ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_creates_use_distinct_identifiers_and_ids() -> Result<()> {
    const CALLS: u64 = 8;

    let mut mock = MockGateway::spawn().await;
    let (gateway, _errors) = Gateway::connect(&mock.url).await?;

    let tasks: Vec<_> = (0..CALLS)
        .map(|_| {
            tokio::spawn({
                let gateway = gateway.clone();
                async move { gateway.create().await }
            })
        })
        .collect();

    // Answer each request as it arrives; the correlation layer must match
    // every reply to the right caller no matter the interleaving.
    let mut transactions = HashSet::new();
    for i in 0..CALLS {
        let request = mock.next_request().await;
        assert_eq!(request["janus"], "create");
        let transaction = request["transaction"]
            .as_str()
            .expect("identifier is a string")
            .to_string();
        assert!(
            transactions.insert(transaction),
            "call identifiers must be pairwise distinct"
        );
        mock.reply(&request, json!({"janus": "success", "data": {"id": 100 + i}}))
            .await;
    }

    let mut session_ids = HashSet::new();
    for task in tasks {
        let session = timeout(TEST_DEADLINE, task).await???;
        session_ids.insert(session.id());
    }
    assert_eq!(session_ids.len() as u64, CALLS, "session ids must be pairwise distinct");
    assert_eq!(gateway.session_count().await as u64, CALLS);
    Ok(())
}

// ── Shutdown & transport failure ──────────────────────────────────────────────

#[tokio::test]
async fn test_close_is_idempotent() -> Result<()> {
    let mock = MockGateway::spawn().await;
    let (gateway, _errors) = Gateway::connect(&mock.url).await?;

    gateway.close().await?;
    // A second close — e.g. from another clone during teardown — must be a
    // no-op, not an error or a hang.
    gateway.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_dead_transport_reports_error_and_call_stays_blocked() -> Result<()> {
    let mock = MockGateway::spawn().await;
    let (gateway, mut errors) = Gateway::connect(&mock.url).await?;

    // The gateway dies without a close handshake.
    mock.kill();

    // The dispatcher's failed read surfaces on the error channel.
    let reported = timeout(TEST_DEADLINE, errors.recv())
        .await?
        .expect("error channel delivers the transport failure");
    assert!(
        matches!(reported, ClientError::Transport(_)),
        "expected a transport error, got {reported:?}"
    );

    // A call issued now can never be fulfilled; it must stay blocked
    // rather than fail — external timeouts are the caller's business.
    let info_task = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.info().await }
    });
    let outcome = timeout(std::time::Duration::from_millis(300), info_task).await;
    assert!(outcome.is_err(), "unfulfillable call must stay blocked");
    Ok(())
}
