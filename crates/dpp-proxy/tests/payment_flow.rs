//! End-to-end flows: HTTP router → services → socket store → channel hub →
//! simulated payee wallet, and back.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use channel_bus::{ChannelHub, Message};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use dpp_proxy::adapters::PaymentStore;
use dpp_proxy::domain::{CallContext, PaymentTermsArgs, PendingCallStore};
use dpp_proxy::http::{self, error_response, AppState, SocketSettings};
use dpp_proxy::ipc::CorrelationBridge;
use dpp_proxy::ports::PaymentTermsService;
use dpp_proxy::service::{PaymentProxy, PaymentTermsProxy, ProofProxy};

struct Harness {
    router: Router,
    hub: Arc<ChannelHub>,
    pending: Arc<PendingCallStore>,
}

fn harness(timeout: Duration) -> Harness {
    let hub = Arc::new(ChannelHub::new());
    let pending = Arc::new(PendingCallStore::new());
    let bridge = Arc::new(CorrelationBridge::new(hub.clone(), pending.clone()));
    tokio::spawn(bridge.listener().run());

    let store = Arc::new(PaymentStore::new(bridge).with_timeout(timeout));
    let state = AppState {
        payment_terms: Arc::new(PaymentTermsProxy::new(store.clone())),
        payments: Arc::new(PaymentProxy::new(store.clone())),
        proofs: Arc::new(ProofProxy::new(store)),
        hub: Some(hub.clone()),
        sockets: SocketSettings::default(),
    };

    Harness {
        router: http::router(state),
        hub,
        pending,
    }
}

/// Join `channel` as a wallet answering each message with `respond`.
fn spawn_wallet<F>(hub: &ChannelHub, channel: &str, respond: F) -> JoinHandle<()>
where
    F: Fn(Message) -> Option<Message> + Send + 'static,
{
    let mut peer = hub.join(channel);
    tokio::spawn(async move {
        while let Some(msg) = peer.recv().await {
            if let Some(reply) = respond(msg) {
                peer.reply(reply).unwrap();
            }
        }
    })
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn test_payment_terms_returned_verbatim() {
    let h = harness(Duration::from_secs(2));
    let terms = json!({
        "network": "mainnet",
        "memo": "payment abc123",
        "beneficiary": {"name": "Merchant"},
        "extensions": {"x-custom": [1, 2, 3]}
    });
    let reply_body = terms.clone();
    spawn_wallet(&h.hub, "abc123", move |msg| {
        assert_eq!(msg.key(), "paymentterms.create");
        assert_eq!(msg.app_id, "dpp");
        Some(
            msg.reply("paymentterms.response")
                .with_body(&reply_body)
                .unwrap(),
        )
    });

    let (status, body) = send(&h.router, get("/api/v1/payment/abc123")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), terms);
    assert_eq!(h.pending.pending_count(), 0);
}

#[tokio::test]
async fn test_payment_terms_without_wallet_is_not_found() {
    let h = harness(Duration::from_secs(2));

    let (status, body) = send(&h.router, get("/api/v1/payment/abc123")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_body(&body), json!("invoice not found"));
}

#[tokio::test]
async fn test_payment_acknowledged() {
    let h = harness(Duration::from_secs(2));
    spawn_wallet(&h.hub, "inv-7", |msg| {
        assert_eq!(msg.key(), "payment");
        let payment: Value = msg.bind().unwrap();
        assert_eq!(payment["modeId"], "ef63d9775da5");
        assert_eq!(payment["mode"]["transactions"], json!(["0100"]));
        Some(
            msg.reply("payment.ack")
                .with_body(&json!({"modeId": "ef63d9775da5", "memo": "thanks"}))
                .unwrap(),
        )
    });

    let payment = json!({
        "modeId": "ef63d9775da5",
        "mode": {"transactions": ["0100"]},
        "memo": "for invoice inv-7"
    });
    let (status, body) = send(&h.router, post_json("/api/v1/payment/inv-7", &payment)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json_body(&body), json!({"modeId": "ef63d9775da5", "memo": "thanks"}));
}

#[tokio::test]
async fn test_payee_error_keeps_its_status() {
    let h = harness(Duration::from_secs(2));
    spawn_wallet(&h.hub, "inv-8", |msg| {
        Some(
            msg.reply("payment.error")
                .with_body(&json!({
                    "id": "e-1",
                    "code": "422",
                    "title": "Unprocessable",
                    "message": "failed"
                }))
                .unwrap(),
        )
    });

    let (status, body) = send(
        &h.router,
        post_json("/api/v1/payment/inv-8", &json!({"modeId": "m"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body, b"\"failed\"");
}

#[tokio::test]
async fn test_silent_wallet_times_out() {
    let h = harness(Duration::from_millis(100));
    spawn_wallet(&h.hub, "inv-9", |_| None);

    let (status, body) = send(&h.router, get("/api/v1/payment/inv-9")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(&body), json!("Internal Server Error"));
    assert_eq!(h.pending.pending_count(), 0);
    assert_eq!(h.pending.stats().total_timeouts.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_concurrent_invoices_do_not_cross() {
    let h = harness(Duration::from_secs(2));
    for id in ["a", "b", "c"] {
        let memo = format!("payment {id}");
        spawn_wallet(&h.hub, id, move |msg| {
            Some(
                msg.reply("paymentterms.response")
                    .with_body(&json!({"memo": memo}))
                    .unwrap(),
            )
        });
    }

    let (a, b, c) = tokio::join!(
        send(&h.router, get("/api/v1/payment/a")),
        send(&h.router, get("/api/v1/payment/b")),
        send(&h.router, get("/api/v1/payment/c")),
    );

    assert_eq!(json_body(&a.1)["memo"], "payment a");
    assert_eq!(json_body(&b.1)["memo"], "payment b");
    assert_eq!(json_body(&c.1)["memo"], "payment c");
}

#[tokio::test]
async fn test_empty_payment_id_is_validation_error() {
    let h = harness(Duration::from_secs(2));
    let bridge_store = Arc::new(PaymentStore::new(Arc::new(CorrelationBridge::new(
        h.hub.clone(),
        h.pending.clone(),
    ))));
    let svc = PaymentTermsProxy::new(bridge_store);

    let err = svc
        .payment_terms(
            &CallContext::background(),
            &PaymentTermsArgs {
                payment_id: String::new(),
            },
        )
        .await
        .unwrap_err();
    let (status, body) = error_response(&err);

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"errors": {"paymentID": ["value cannot be empty"]}}));
    assert_eq!(h.hub.messages_published(), 0);
}

#[tokio::test]
async fn test_proof_broadcast_to_wallet() {
    let h = harness(Duration::from_secs(2));
    let (tx, mut rx) = mpsc::unbounded_channel();
    spawn_wallet(&h.hub, "inv-10", move |msg| {
        tx.send(msg).unwrap();
        None
    });

    let proof = json!({"payload": "{\"index\":0}", "encoding": "UTF-8", "mimeType": "application/json"});
    let (status, _) = send(&h.router, post_json("/api/v1/proofs/tx-1?i=inv-10", &proof)).await;
    assert_eq!(status, StatusCode::CREATED);

    let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received.key(), "proof.create");
    assert_eq!(received.header("x-tx-id"), Some("tx-1"));
    assert_eq!(received.body["payload"], "{\"index\":0}");
}

#[tokio::test]
async fn test_proof_without_reference_rejected() {
    let h = harness(Duration::from_secs(2));
    let proof = json!({"payload": "{}"});

    let (status, body) = send(&h.router, post_json("/api/v1/proofs/tx-1", &proof)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&body)["errors"]["paymentReference"].is_array());
}

#[tokio::test]
async fn test_malformed_payment_body_is_bad_request() {
    let h = harness(Duration::from_secs(2));
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/payment/inv-11")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&h.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&body).is_string());
    assert_eq!(h.hub.messages_published(), 0);
}

#[tokio::test]
async fn test_health() {
    let h = harness(Duration::from_secs(2));
    let (status, body) = send(&h.router, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({"status": "ok"}));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let h = harness(Duration::from_secs(2));
    let (status, body) = send(&h.router, get("/api/v2/nothing")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_body(&body), json!("Not Found"));
}
