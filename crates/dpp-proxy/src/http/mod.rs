//! HTTP surface: routes, handlers, the error mapper and the wallet socket.

pub mod error_handler;
pub mod payment;
pub mod payment_terms;
pub mod proofs;
pub mod sockets;

use std::sync::Arc;

use axum::http::Uri;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use channel_bus::ChannelHub;
use tower_http::trace::TraceLayer;

use crate::domain::ProxyError;
use crate::ports::{PaymentService, PaymentTermsService, ProofService};

pub use error_handler::{error_response, INTERNAL_ERROR_MESSAGE};
pub use sockets::{SocketSettings, WalletConnection};

pub const ROUTE_PAYMENT: &str = "/api/v1/payment/:paymentID";
pub const ROUTE_PROOFS: &str = "/api/v1/proofs/:txid";
pub const ROUTE_HEALTH: &str = "/health";
pub const ROUTE_WALLET_SOCKET: &str = "/ws/:channelKey";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub payment_terms: Arc<dyn PaymentTermsService>,
    pub payments: Arc<dyn PaymentService>,
    pub proofs: Arc<dyn ProofService>,
    /// Present when wallets connect over sockets.
    pub hub: Option<Arc<ChannelHub>>,
    pub sockets: SocketSettings,
}

/// Build the proxy router.
///
/// The wallet socket route is only mounted when `state.hub` is set.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route(ROUTE_HEALTH, get(health_check))
        .route(
            ROUTE_PAYMENT,
            get(payment_terms::get_payment_terms).post(payment::create_payment),
        )
        .route(ROUTE_PROOFS, post(proofs::create_proof));

    if state.hub.is_some() {
        router = router.route(ROUTE_WALLET_SOCKET, get(sockets::ws_upgrade));
    }

    router
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn route_not_found(uri: Uri) -> ProxyError {
    ProxyError::RouteNotFound(uri.path().to_string())
}
