//! `dpp-proxy` binary.
//!
//! Configuration is read from `DPP_` prefixed environment variables, see
//! [`dpp_proxy::ProxyConfig`].

use anyhow::{Context, Result};
use tracing::info;

use dpp_proxy::{init_tracing, ProxyConfig, ProxyServer, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ProxyConfig::from_env().context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to initialise logging")?;

    info!(
        version = VERSION,
        commit = %config.deployment.commit,
        region = %config.deployment.region,
        "Starting dpp-proxy"
    );

    let server = ProxyServer::new(config).context("failed to build proxy")?;
    server.start().await.context("proxy server failed")?;

    Ok(())
}
