//! Wallet stores and the outbound HTTP client.

pub mod http_client;
pub mod noop;
pub mod payd;
pub mod sockets;

pub use http_client::ReqwestClient;
pub use noop::Noop;
pub use payd::PayD;
pub use sockets::PaymentStore;
