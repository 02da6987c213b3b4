use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{
    not_empty, CallContext, Payment, PaymentAck, PaymentCreateArgs, ProxyResult, ResultExt,
    Validator,
};
use crate::ports::{PaymentService, PaymentWriter};

/// Validates a payment and forwards it to the wallet store.
pub struct PaymentProxy {
    writer: Arc<dyn PaymentWriter>,
}

impl PaymentProxy {
    pub fn new(writer: Arc<dyn PaymentWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl PaymentService for PaymentProxy {
    async fn payment_create(
        &self,
        ctx: &CallContext,
        args: &PaymentCreateArgs,
        payment: Payment,
    ) -> ProxyResult<PaymentAck> {
        Validator::new()
            .validate("paymentID", not_empty(&args.payment_id))
            .finish()?;

        debug!(payment_id = %args.payment_id, mode_id = ?payment.mode_id, "Forwarding payment");

        self.writer
            .payment_create(ctx, args, &payment)
            .await
            .with_context(|| format!("failed to create payment for paymentID {}", args.payment_id))
    }
}
