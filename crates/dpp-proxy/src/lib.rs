#![allow(missing_docs)]

//! DPP Proxy - payment protocol requests forwarded to payee wallets.
//!
//! A payer asks for payment terms and submits a payment over HTTP. The proxy
//! validates the request and hands it to the payee wallet, which is either
//! reachable over HTTP (PayD) or connected to the proxy over a socket
//! channel keyed by invoice id.
//!
//! # Architecture
//!
//! ```text
//!  payer ── HTTP ──▶ http (axum) ──▶ service (validation) ──▶ wallet store
//!                        ▲                                        │
//!                        │                 ┌──────────────────────┼─────────────┐
//!                  error mapper            ▼                      ▼             ▼
//!                                    PaymentStore               PayD          Noop
//!                                          │
//!                                  CorrelationBridge ◀── ReplyListener
//!                                          │                   ▲
//!                                     ChannelHub ── /ws/:channelKey ── payee wallet
//! ```
//!
//! Over sockets, a request is published to the invoice's channel with a
//! fresh correlation id and the caller waits for the reply carrying the same
//! id, bounded by a timeout.
//!
//! # Usage
//!
//! ```ignore
//! use dpp_proxy::{ProxyConfig, ProxyServer};
//!
//! let config = ProxyConfig::from_env()?;
//! ProxyServer::new(config)?.start().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod http;
pub mod ipc;
pub mod ports;
pub mod server;
pub mod service;
pub mod telemetry;

pub use domain::config::ProxyConfig;
pub use domain::error::{ClientError, ErrorKind, ProxyError, ProxyResult};
pub use domain::types::*;
pub use ipc::{Broadcaster, CorrelationBridge};
pub use server::{ProxyServer, ServerError};
pub use telemetry::init_tracing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
