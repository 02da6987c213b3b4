use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    not_empty, CallContext, PaymentTermsArgs, ProxyResult, ResultExt, TermsEnvelope, Validator,
};
use crate::ports::{PaymentTermsReader, PaymentTermsService};

/// Validates the request and passes it through to the wallet store.
pub struct PaymentTermsProxy {
    reader: Arc<dyn PaymentTermsReader>,
}

impl PaymentTermsProxy {
    pub fn new(reader: Arc<dyn PaymentTermsReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl PaymentTermsService for PaymentTermsProxy {
    async fn payment_terms(
        &self,
        ctx: &CallContext,
        args: &PaymentTermsArgs,
    ) -> ProxyResult<TermsEnvelope> {
        Validator::new()
            .validate("paymentID", not_empty(&args.payment_id))
            .finish()?;

        self.reader
            .payment_terms(ctx, args)
            .await
            .with_context(|| format!("failed to get payment terms for paymentID {}", args.payment_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClientError, ProxyError, MSG_NOT_EMPTY};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeReader {
        calls: AtomicUsize,
        result: fn() -> ProxyResult<TermsEnvelope>,
    }

    #[async_trait]
    impl PaymentTermsReader for FakeReader {
        async fn payment_terms(
            &self,
            _ctx: &CallContext,
            _args: &PaymentTermsArgs,
        ) -> ProxyResult<TermsEnvelope> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn service(result: fn() -> ProxyResult<TermsEnvelope>) -> (PaymentTermsProxy, Arc<FakeReader>) {
        let reader = Arc::new(FakeReader {
            calls: AtomicUsize::new(0),
            result,
        });
        (PaymentTermsProxy::new(reader.clone()), reader)
    }

    fn args(id: &str) -> PaymentTermsArgs {
        PaymentTermsArgs {
            payment_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_terms_passed_through() {
        let (svc, reader) = service(|| Ok(json!({"memo": "payment abc123"}).into()));

        let terms = svc
            .payment_terms(&CallContext::background(), &args("abc123"))
            .await
            .unwrap();

        assert_eq!(terms.as_value(), &json!({"memo": "payment abc123"}));
        assert_eq!(reader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_payment_id_never_reaches_store() {
        let (svc, reader) = service(|| Ok(json!({}).into()));

        let err = svc
            .payment_terms(&CallContext::background(), &args(""))
            .await
            .unwrap_err();

        let ProxyError::Validation(validation) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            validation.field("paymentID").unwrap(),
            &[MSG_NOT_EMPTY.to_string()]
        );
        assert_eq!(reader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_error_wrapped() {
        let (svc, _) = service(|| Err(ClientError::not_found("404", "invoice not found").into()));

        let err = svc
            .payment_terms(&CallContext::background(), &args("abc123"))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "failed to get payment terms for paymentID abc123: Not Found: invoice not found"
        );
        assert!(err.client_error().unwrap().is_not_found());
    }
}
