//! Store that answers without a wallet, for exploring the endpoints.

use async_trait::async_trait;
use tracing::info;

use crate::domain::{
    CallContext, JsonEnvelope, Payment, PaymentAck, PaymentCreateArgs, PaymentTermsArgs,
    ProofCreateArgs, ProxyResult, ResultExt, TermsEnvelope,
};
use crate::ports::{PaymentTermsReader, PaymentWriter, ProofWriter};

const SIGNATURE: &str = "3044022004cf2c5711f34f0de11fd316074c44ce0f63a525840aae0cf61d9dee04b317b102201a56049354449ddce3d8b059403b2d866662b6d1f9d0064365d420406d8d992d";
const PUBLIC_KEY: &str = "03d546057437f3279f66d6ae91a03ffe1120ef3a79b8f186d9b6a8f1e0582ccf78";
const TERMS_PAYLOAD: &str = r#"{"network":"mainnet","creationTimestamp":{},"expirationTimestamp":{},"url":"https://localhost:3443/api/v1/payment/123456","memo":"string","beneficiary":{"name":"beneficiary 1","avatar":"http://url.com","extensions":{"email":"beneficiary@m.com","address":"1 the street, the town, B1 1AA","additionalProp1":{}}},"outputs":[{"amount":100000,"script":"76a91455b61be43392125d127f1780fb038437cd67ef9c88ac","description":"paymentReference 123456"}],"fees":{"data":{"satoshis":0,"bytes":0},"standard":{"satoshis":0,"bytes":0}},"ancestry":{"format":"binary","minDepth":0}}"#;

/// Canned responses for every wallet operation.
#[derive(Debug, Default)]
pub struct Noop;

impl Noop {
    pub fn new() -> Self {
        info!("Using NOOP wallet store");
        Self
    }
}

#[async_trait]
impl PaymentTermsReader for Noop {
    async fn payment_terms(
        &self,
        _ctx: &CallContext,
        args: &PaymentTermsArgs,
    ) -> ProxyResult<TermsEnvelope> {
        info!(payment_id = %args.payment_id, "Noop payment terms");
        let envelope = JsonEnvelope::signed(TERMS_PAYLOAD, SIGNATURE, PUBLIC_KEY);
        TermsEnvelope::from_envelope(&envelope).context("failed to encode noop payment terms")
    }
}

#[async_trait]
impl PaymentWriter for Noop {
    async fn payment_create(
        &self,
        _ctx: &CallContext,
        args: &PaymentCreateArgs,
        _payment: &Payment,
    ) -> ProxyResult<PaymentAck> {
        info!(payment_id = %args.payment_id, "Noop payment create");
        Ok(PaymentAck::default())
    }
}

#[async_trait]
impl ProofWriter for Noop {
    async fn proof_create(
        &self,
        _ctx: &CallContext,
        args: &ProofCreateArgs,
        _proof: &JsonEnvelope,
    ) -> ProxyResult<()> {
        info!(txid = %args.tx_id, payment_reference = %args.payment_reference, "Noop proof create");
        Ok(())
    }
}
