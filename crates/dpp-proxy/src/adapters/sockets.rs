//! Socket payment store.
//!
//! Forwards payment protocol calls to payee wallets joined to the invoice's
//! channel and classifies their replies.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use channel_bus::{BusError, Message};
use tracing::{debug, info, warn};

use crate::domain::{
    CallContext, ClientError, ClientErrorRecord, CorrelationId, JsonEnvelope, Payment, PaymentAck,
    PaymentCreateArgs, PaymentTermsArgs, ProofCreateArgs, ProxyError, ProxyResult, ResultExt,
    TermsEnvelope,
};
use crate::ipc::{BridgeError, Broadcaster};
use crate::ports::{PaymentTermsReader, PaymentWriter, ProofWriter};

pub const ROUTE_PAYMENT: &str = "payment";
pub const ROUTE_PAYMENT_ACK: &str = "payment.ack";
pub const ROUTE_PAYMENT_ERROR: &str = "payment.error";
pub const ROUTE_PROOF_CREATE: &str = "proof.create";
pub const ROUTE_PAYMENT_TERMS_CREATE: &str = "paymentterms.create";
pub const ROUTE_PAYMENT_TERMS_RESPONSE: &str = "paymentterms.response";
pub const ROUTE_PAYMENT_TERMS_ERROR: &str = "paymentterms.error";

/// Application tag on every message this store sends.
pub const APP_ID: &str = "dpp";

/// Header carrying the transaction id on proof messages.
pub const HEADER_TX_ID: &str = "x-tx-id";

/// How long to wait for a wallet reply unless configured otherwise.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Payment store backed by wallets on the socket channel.
pub struct PaymentStore {
    broadcaster: Arc<dyn Broadcaster>,
    timeout: Duration,
}

impl PaymentStore {
    pub fn new(broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            broadcaster,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request(route: &str, channel_key: &str) -> Message {
        Message::new(route, channel_key)
            .with_app_id(APP_ID)
            .with_correlation_id(CorrelationId::new().to_string())
    }
}

#[async_trait]
impl PaymentTermsReader for PaymentStore {
    async fn payment_terms(
        &self,
        ctx: &CallContext,
        args: &PaymentTermsArgs,
    ) -> ProxyResult<TermsEnvelope> {
        let msg = Self::request(ROUTE_PAYMENT_TERMS_CREATE, &args.payment_id);

        let reply = self
            .broadcaster
            .send_await(ctx, &args.payment_id, msg, self.timeout)
            .await
            .map_err(|e| bridge_error(e, "failed to broadcast message for payment terms (secure)"))?;

        match reply.key() {
            ROUTE_PAYMENT_TERMS_RESPONSE => reply
                .bind::<TermsEnvelope>()
                .context("failed to bind payment terms (secure) response"),
            ROUTE_PAYMENT_TERMS_ERROR => Err(payee_error(&reply)),
            other => Err(ProxyError::UnexpectedRoute(other.to_string())),
        }
    }
}

#[async_trait]
impl PaymentWriter for PaymentStore {
    async fn payment_create(
        &self,
        ctx: &CallContext,
        args: &PaymentCreateArgs,
        payment: &Payment,
    ) -> ProxyResult<PaymentAck> {
        let msg = Self::request(ROUTE_PAYMENT, &args.payment_id)
            .with_body(payment)
            .context("failed to encode payment")?;

        let reply = self
            .broadcaster
            .send_await(ctx, &args.payment_id, msg, self.timeout)
            .await
            .map_err(|e| bridge_error(e, "failed to send payment message for payment"))?;

        match reply.key() {
            ROUTE_PAYMENT_ACK => reply
                .bind::<PaymentAck>()
                .context("failed to bind payment ack response from payee"),
            ROUTE_PAYMENT_ERROR => Err(payee_error(&reply)),
            other => Err(ProxyError::UnexpectedRoute(other.to_string())),
        }
    }
}

#[async_trait]
impl ProofWriter for PaymentStore {
    async fn proof_create(
        &self,
        _ctx: &CallContext,
        args: &ProofCreateArgs,
        proof: &JsonEnvelope,
    ) -> ProxyResult<()> {
        let msg = Message::new(ROUTE_PROOF_CREATE, &args.payment_reference)
            .with_app_id(APP_ID)
            .with_correlation_id(&args.tx_id)
            .with_header(HEADER_TX_ID, &args.tx_id)
            .with_body(proof)
            .context("failed to encode proof")?;

        match self.broadcaster.send(&args.payment_reference, msg).await {
            Ok(()) => {
                debug!(txid = %args.tx_id, channel = %args.payment_reference, "Proof broadcast");
                Ok(())
            }
            Err(e) if e.is_channel_not_found() => {
                info!(
                    txid = %args.tx_id,
                    channel = %args.payment_reference,
                    "No payee listening for proof"
                );
                Ok(())
            }
            // The message itself is unsendable.
            Err(
                e @ BridgeError::Transport(BusError::MessageTooLarge { .. } | BusError::Encode(_)),
            ) => Err(ProxyError::from(e).context("failed to broadcast proof")),
            Err(e) => {
                warn!(
                    txid = %args.tx_id,
                    channel = %args.payment_reference,
                    error = %e,
                    "Proof not delivered"
                );
                Ok(())
            }
        }
    }
}

/// Classify a bridge failure. A missing channel means nobody is serving the
/// invoice.
fn bridge_error(e: BridgeError, context: &str) -> ProxyError {
    if e.is_channel_not_found() {
        return ClientError::not_found("404", "invoice not found").into();
    }
    ProxyError::from(e).context(context)
}

/// Translate an error reply from the payee.
fn payee_error(reply: &Message) -> ProxyError {
    match reply.bind::<ClientErrorRecord>() {
        Ok(record) => ClientError::from_wire(&record).into(),
        Err(e) => ProxyError::from(e).context("failed to bind error response from payee"),
    }
}
