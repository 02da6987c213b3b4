//! Inbound ports: what the HTTP layer calls.

use async_trait::async_trait;

use crate::domain::{
    CallContext, JsonEnvelope, Payment, PaymentAck, PaymentCreateArgs, PaymentTermsArgs,
    ProofCreateArgs, ProxyResult, TermsEnvelope,
};

/// Returns payment terms for an invoice.
#[async_trait]
pub trait PaymentTermsService: Send + Sync {
    async fn payment_terms(
        &self,
        ctx: &CallContext,
        args: &PaymentTermsArgs,
    ) -> ProxyResult<TermsEnvelope>;
}

/// Accepts a payment for an invoice.
#[async_trait]
pub trait PaymentService: Send + Sync {
    async fn payment_create(
        &self,
        ctx: &CallContext,
        args: &PaymentCreateArgs,
        payment: Payment,
    ) -> ProxyResult<PaymentAck>;
}

/// Accepts a merkle proof for a transaction paying an invoice.
#[async_trait]
pub trait ProofService: Send + Sync {
    async fn proof_create(
        &self,
        ctx: &CallContext,
        args: &ProofCreateArgs,
        proof: JsonEnvelope,
    ) -> ProxyResult<()>;
}
