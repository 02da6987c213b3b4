//! Outbound ports for the proxy: the wallet stores and the HTTP client the
//! PayD store talks through.

use async_trait::async_trait;
use reqwest::Method;

use crate::domain::{
    CallContext, JsonEnvelope, Payment, PaymentAck, PaymentCreateArgs, PaymentTermsArgs,
    ProofCreateArgs, ProxyResult, TermsEnvelope,
};

/// Reads payment terms from the payee wallet.
#[async_trait]
pub trait PaymentTermsReader: Send + Sync {
    async fn payment_terms(
        &self,
        ctx: &CallContext,
        args: &PaymentTermsArgs,
    ) -> ProxyResult<TermsEnvelope>;
}

/// Hands a payment to the payee wallet.
#[async_trait]
pub trait PaymentWriter: Send + Sync {
    async fn payment_create(
        &self,
        ctx: &CallContext,
        args: &PaymentCreateArgs,
        payment: &Payment,
    ) -> ProxyResult<PaymentAck>;
}

/// Hands a merkle proof to the payee wallet.
#[async_trait]
pub trait ProofWriter: Send + Sync {
    async fn proof_create(
        &self,
        ctx: &CallContext,
        args: &ProofCreateArgs,
        proof: &JsonEnvelope,
    ) -> ProxyResult<()>;
}

/// A store serving every wallet operation.
pub trait WalletStore: PaymentTermsReader + PaymentWriter + ProofWriter {}

impl<T> WalletStore for T where T: PaymentTermsReader + PaymentWriter + ProofWriter {}

/// Plain JSON-over-HTTP client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send `body` (if any) to `url` and decode the JSON response.
    ///
    /// A status other than `expected_status` is an error. An empty response
    /// body decodes to `Value::Null`.
    async fn request(
        &self,
        method: Method,
        url: &str,
        expected_status: u16,
        body: Option<&serde_json::Value>,
    ) -> ProxyResult<serde_json::Value>;
}
