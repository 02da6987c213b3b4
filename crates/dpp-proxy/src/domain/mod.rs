//! Domain types for the proxy.
//!
//! Error taxonomy, call bookkeeping, validation, configuration and the
//! payment protocol types.

pub mod config;
pub mod context;
pub mod correlation;
pub mod error;
pub mod pending;
pub mod types;
pub mod validation;

pub use config::{ConfigError, ProxyConfig, WalletBackend};
pub use context::{CallContext, CancelHandle};
pub use correlation::CorrelationId;
pub use error::{
    ClientError, ClientErrorRecord, ErrorKind, ProxyError, ProxyResult, ResultExt,
};
pub use pending::{PendingCallStore, PendingStats, Resolution};
pub use types::*;
pub use validation::{not_empty, ValidationError, Validator, MSG_NOT_EMPTY};
