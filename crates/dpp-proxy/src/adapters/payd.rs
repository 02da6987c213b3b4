//! PayD wallet store.
//!
//! Talks to a PayD wallet over its HTTP interface. PayD has no payment terms
//! endpoint, so terms are assembled here from the owner, destinations and
//! fee lookups.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::domain::config::PayDConfig;
use crate::domain::{
    CallContext, Destination, FeeQuote, JsonEnvelope, MerchantData, Output, Payment, PaymentAck,
    PaymentCreateArgs, PaymentTerms, PaymentTermsArgs, ProofCreateArgs, ProxyResult, ResultExt,
    TermsEnvelope,
};
use crate::ports::{HttpClient, PaymentTermsReader, PaymentWriter, ProofWriter};

/// Network advertised in assembled payment terms.
pub const NETWORK: &str = "mainnet";

/// How long assembled payment terms stay valid.
pub const TERMS_VALIDITY_HOURS: i64 = 24;

/// Store backed by a PayD wallet.
pub struct PayD {
    client: Arc<dyn HttpClient>,
    base_url: String,
    public_url: String,
}

impl PayD {
    /// `public_url` is the scheme and host payers reach this proxy on, used
    /// to build the payment url.
    pub fn new(
        cfg: &PayDConfig,
        public_url: impl Into<String>,
        client: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            client,
            base_url: cfg.base_url(),
            public_url: public_url.into(),
        }
    }

    fn payment_url(&self, payment_id: &str) -> String {
        format!("{}/api/v1/payment/{}", self.public_url, payment_id)
    }

    fn payments_url(&self, invoice_id: &str) -> String {
        format!("{}/api/v1/payments?invoiceID={}", self.base_url, invoice_id)
    }

    fn owner_url(&self) -> String {
        format!("{}/api/v1/owner", self.base_url)
    }

    fn destinations_url(&self, invoice_id: &str) -> String {
        format!("{}/api/v1/destinations/{}", self.base_url, invoice_id)
    }

    fn fees_url(&self) -> String {
        format!("{}/api/v1/fees", self.base_url)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> ProxyResult<T> {
        let value = self.client.request(Method::GET, url, 200, None).await?;
        Ok(T::deserialize(value)?)
    }

    /// Owner of the wallet.
    pub async fn owner(&self) -> ProxyResult<MerchantData> {
        self.get(&self.owner_url())
            .await
            .context("failed to read owner from payd")
    }

    /// Outputs the payer has to fund for `invoice_id`.
    pub async fn outputs(&self, invoice_id: &str) -> ProxyResult<Vec<Output>> {
        let destinations: Vec<Destination> = self
            .get(&self.destinations_url(invoice_id))
            .await
            .with_context(|| format!("failed to read destinations for invoice {invoice_id}"))?;
        Ok(destinations.into_iter().map(Output::from).collect())
    }

    /// Fees the wallet currently charges.
    pub async fn fees(&self) -> ProxyResult<FeeQuote> {
        self.get(&self.fees_url())
            .await
            .context("failed to read fees from payd")
    }
}

#[async_trait]
impl PaymentTermsReader for PayD {
    async fn payment_terms(
        &self,
        _ctx: &CallContext,
        args: &PaymentTermsArgs,
    ) -> ProxyResult<TermsEnvelope> {
        let (owner, outputs, fees) = futures::try_join!(
            self.owner(),
            self.outputs(&args.payment_id),
            self.fees()
        )?;

        let now = Utc::now();
        let terms = PaymentTerms {
            network: NETWORK.to_string(),
            creation_timestamp: now.timestamp(),
            expiration_timestamp: (now + ChronoDuration::hours(TERMS_VALIDITY_HOURS)).timestamp(),
            payment_url: self.payment_url(&args.payment_id),
            memo: format!("invoice {}", args.payment_id),
            beneficiary: Some(owner),
            outputs,
            fees,
        };
        debug!(payment_id = %args.payment_id, outputs = terms.outputs.len(), "Assembled payment terms");

        let envelope = JsonEnvelope::new(&terms)?;
        Ok(TermsEnvelope::from_envelope(&envelope)?)
    }
}

#[async_trait]
impl PaymentWriter for PayD {
    async fn payment_create(
        &self,
        _ctx: &CallContext,
        args: &PaymentCreateArgs,
        payment: &Payment,
    ) -> ProxyResult<PaymentAck> {
        let body = serde_json::to_value(payment)?;
        self.client
            .request(
                Method::POST,
                &self.payments_url(&args.payment_id),
                204,
                Some(&body),
            )
            .await
            .context("failed to submit payment to payd")?;
        Ok(PaymentAck::default())
    }
}

#[async_trait]
impl ProofWriter for PayD {
    async fn proof_create(
        &self,
        _ctx: &CallContext,
        args: &ProofCreateArgs,
        _proof: &JsonEnvelope,
    ) -> ProxyResult<()> {
        info!(txid = %args.tx_id, "PayD does not accept proofs, dropping");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::ServerConfig;
    use crate::domain::ProxyError;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Canned responses keyed by url, recording every call.
    #[derive(Default)]
    struct FakeClient {
        responses: HashMap<String, (u16, Value)>,
        calls: Mutex<Vec<(Method, String, Option<Value>)>>,
    }

    impl FakeClient {
        fn with(mut self, url: &str, status: u16, body: Value) -> Self {
            self.responses.insert(url.to_string(), (status, body));
            self
        }
    }

    #[async_trait]
    impl HttpClient for FakeClient {
        async fn request(
            &self,
            method: Method,
            url: &str,
            expected_status: u16,
            body: Option<&Value>,
        ) -> ProxyResult<Value> {
            self.calls
                .lock()
                .unwrap()
                .push((method, url.to_string(), body.cloned()));
            match self.responses.get(url) {
                Some((status, value)) if *status == expected_status => Ok(value.clone()),
                Some((status, _)) => Err(ProxyError::Wallet(format!(
                    "{url} returned {status}, expected {expected_status}"
                ))),
                None => Err(ProxyError::Wallet(format!("cannot connect to {url}"))),
            }
        }
    }

    fn config() -> PayDConfig {
        PayDConfig::default()
    }

    fn payd(client: FakeClient) -> (PayD, Arc<FakeClient>) {
        let client = Arc::new(client);
        (PayD::new(&config(), "http://proxy:8445", client.clone()), client)
    }

    #[tokio::test]
    async fn test_terms_assembled_from_lookups() {
        let (store, _) = payd(
            FakeClient::default()
                .with("http://payd:8443/api/v1/owner", 200, json!({"name": "merchant"}))
                .with(
                    "http://payd:8443/api/v1/destinations/inv-1",
                    200,
                    json!([{"script": "76a9", "satohsis": 1500}]),
                )
                .with(
                    "http://payd:8443/api/v1/fees",
                    200,
                    json!({"data": {"satoshis": 1, "bytes": 2}, "standard": {"satoshis": 3, "bytes": 4}}),
                ),
        );

        let terms = store
            .payment_terms(
                &CallContext::background(),
                &PaymentTermsArgs {
                    payment_id: "inv-1".into(),
                },
            )
            .await
            .unwrap();

        let envelope = terms.envelope().unwrap();
        assert!(!envelope.is_signed());
        let payload: PaymentTerms = serde_json::from_str(&envelope.payload).unwrap();
        assert_eq!(payload.network, NETWORK);
        assert_eq!(payload.payment_url, "http://proxy:8445/api/v1/payment/inv-1");
        assert_eq!(payload.outputs[0].amount, 1500);
        assert_eq!(payload.fees.standard.satoshis, 3);
        assert_eq!(payload.beneficiary.unwrap().name, "merchant");
        assert!(payload.expiration_timestamp > payload.creation_timestamp);
    }

    #[tokio::test]
    async fn test_terms_lookup_failure_is_wallet_error() {
        let (store, _) = payd(FakeClient::default());

        let err = store
            .payment_terms(&CallContext::background(), &PaymentTermsArgs::default())
            .await
            .unwrap_err();

        assert!(matches!(err.root(), ProxyError::Wallet(_)));
        assert!(err.client_error().is_none());
    }

    #[tokio::test]
    async fn test_payment_posted_expecting_no_content() {
        let url = "http://payd:8443/api/v1/payments?invoiceID=inv-1";
        let (store, client) = payd(FakeClient::default().with(url, 204, Value::Null));

        let payment = Payment {
            memo: Some("hi".into()),
            ..Default::default()
        };
        store
            .payment_create(
                &CallContext::background(),
                &PaymentCreateArgs {
                    payment_id: "inv-1".into(),
                },
                &payment,
            )
            .await
            .unwrap();

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Method::POST);
        assert_eq!(calls[0].1, url);
        assert_eq!(calls[0].2, Some(json!({"memo": "hi"})));
    }

    #[tokio::test]
    async fn test_payment_wrong_status() {
        let url = "http://payd:8443/api/v1/payments?invoiceID=inv-1";
        let (store, _) = payd(FakeClient::default().with(url, 400, Value::Null));

        let err = store
            .payment_create(
                &CallContext::background(),
                &PaymentCreateArgs {
                    payment_id: "inv-1".into(),
                },
                &Payment::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err.root(), ProxyError::Wallet(_)));
        assert!(err.to_string().starts_with("failed to submit payment to payd"));
    }

    #[test]
    fn test_secure_base_url() {
        let cfg = PayDConfig {
            secure: true,
            host: "wallet".into(),
            port: ":443".into(),
            ..Default::default()
        };
        let store = PayD::new(&cfg, "http://proxy", Arc::new(FakeClient::default()));
        assert_eq!(store.fees_url(), "https://wallet:443/api/v1/fees");
    }

    #[test]
    fn test_payment_url_follows_proxy_scheme() {
        let server = ServerConfig {
            fqdn: "pay.example.com".into(),
            secure: true,
            ..Default::default()
        };
        let store = PayD::new(&config(), server.public_url(), Arc::new(FakeClient::default()));
        assert_eq!(
            store.payment_url("inv-1"),
            "https://pay.example.com/api/v1/payment/inv-1"
        );
    }
}
