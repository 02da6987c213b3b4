//! Proxy server: wires configuration to stores, services and the router.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use channel_bus::{ChannelHub, DEFAULT_CHANNEL_CAPACITY};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::adapters::{Noop, PayD, PaymentStore, ReqwestClient};
use crate::domain::pending::cleanup_task;
use crate::domain::{ConfigError, PendingCallStore, ProxyConfig, ProxyError, WalletBackend};
use crate::http::{self, AppState, SocketSettings};
use crate::ipc::CorrelationBridge;
use crate::ports::WalletStore;
use crate::service::{PaymentProxy, PaymentTermsProxy, ProofProxy};

/// How often leaked pending calls are swept.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build wallet store: {0}")]
    Setup(#[from] ProxyError),

    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The assembled proxy.
pub struct ProxyServer {
    config: ProxyConfig,
    state: AppState,
    bridge: Option<Arc<CorrelationBridge>>,
    pending: Arc<PendingCallStore>,
}

impl ProxyServer {
    /// Build the proxy for `config`.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let pending = Arc::new(PendingCallStore::new());
        let sockets = SocketSettings {
            max_message_bytes: config.socket.max_message_bytes,
            idle_timeout: config.socket.channel_timeout(),
        };

        let (state, bridge) = match config.wallet.backend {
            WalletBackend::Socket => {
                let hub = Arc::new(ChannelHub::with_limits(
                    DEFAULT_CHANNEL_CAPACITY,
                    config.socket.max_message_bytes,
                ));
                let bridge = Arc::new(CorrelationBridge::new(hub.clone(), Arc::clone(&pending)));
                let store = Arc::new(
                    PaymentStore::new(bridge.clone()).with_timeout(config.socket.call_timeout()),
                );
                (app_state(store, Some(hub), sockets), Some(bridge))
            }
            WalletBackend::PayD if config.payd.noop => {
                (app_state(Arc::new(Noop::new()), None, sockets), None)
            }
            WalletBackend::PayD => {
                let client = Arc::new(ReqwestClient::new(config.socket.call_timeout())?);
                let store = Arc::new(PayD::new(&config.payd, config.server.public_url(), client));
                (app_state(store, None, sockets), None)
            }
        };

        info!(
            backend = ?config.wallet.backend,
            noop = config.payd.noop,
            environment = %config.deployment.environment,
            version = %config.deployment.version,
            "Proxy configured"
        );

        Ok(Self {
            config,
            state,
            bridge,
            pending,
        })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Router serving the proxy routes.
    pub fn router(&self) -> Router {
        http::router(self.state.clone())
    }

    /// The socket hub wallets join, when running with the socket backend.
    pub fn hub(&self) -> Option<Arc<ChannelHub>> {
        self.state.hub.clone()
    }

    pub fn pending(&self) -> Arc<PendingCallStore> {
        Arc::clone(&self.pending)
    }

    /// Bind the configured address and serve until ctrl-c.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr = self.config.http_addr()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` completes.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let background = self.spawn_background_tasks();
        let router = self.router();

        info!(addr = %addr, "Starting DPP proxy");
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await;

        for task in background {
            task.abort();
        }
        info!("DPP proxy stopped");
        result.map_err(ServerError::from)
    }

    fn spawn_background_tasks(&self) -> Vec<JoinHandle<()>> {
        let Some(bridge) = &self.bridge else {
            return Vec::new();
        };

        let listener = bridge.listener();
        let pending = Arc::clone(&self.pending);
        vec![
            tokio::spawn(listener.run()),
            tokio::spawn(cleanup_task(pending, CLEANUP_INTERVAL)),
        ]
    }
}

fn app_state<S>(store: Arc<S>, hub: Option<Arc<ChannelHub>>, sockets: SocketSettings) -> AppState
where
    S: WalletStore + 'static,
{
    AppState {
        payment_terms: Arc::new(PaymentTermsProxy::new(store.clone())),
        payments: Arc::new(PaymentProxy::new(store.clone())),
        proofs: Arc::new(ProofProxy::new(store)),
        hub,
        sockets,
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    fn config(backend: WalletBackend, noop: bool) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.wallet.backend = backend;
        config.payd.noop = noop;
        config
    }

    #[test]
    fn test_socket_backend_has_hub() {
        let server = ProxyServer::new(config(WalletBackend::Socket, false)).unwrap();
        assert!(server.hub().is_some());
        assert!(server.bridge.is_some());
    }

    #[test]
    fn test_payd_backend_has_no_hub() {
        let server = ProxyServer::new(config(WalletBackend::PayD, false)).unwrap();
        assert!(server.hub().is_none());

        let server = ProxyServer::new(config(WalletBackend::PayD, true)).unwrap();
        assert!(server.hub().is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = config(WalletBackend::Socket, false);
        cfg.socket.call_timeout_seconds = 0;
        assert!(matches!(ProxyServer::new(cfg), Err(ServerError::Config(_))));
    }

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let server = ProxyServer::new(config(WalletBackend::PayD, true)).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(server.serve(listener, async move {
            let _ = rx.await;
        }));

        let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, serde_json::json!({"status": "ok"}));

        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
