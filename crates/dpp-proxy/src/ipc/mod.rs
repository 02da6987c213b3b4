//! Correlation bridge over the socket channel transport.
//!
//! The proxy talks to payee wallets through channels; this module turns a
//! publish plus an eventual reply into a single awaited call.

pub mod bridge;
pub mod listener;

pub use bridge::{BridgeError, Broadcaster, CorrelationBridge};
pub use listener::ReplyListener;
