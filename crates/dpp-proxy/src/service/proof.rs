use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    not_empty, CallContext, JsonEnvelope, ProofCreateArgs, ProxyResult, ResultExt, Validator,
};
use crate::ports::{ProofService, ProofWriter};

/// Validates a proof submission and forwards it to the wallet store.
pub struct ProofProxy {
    writer: Arc<dyn ProofWriter>,
}

impl ProofProxy {
    pub fn new(writer: Arc<dyn ProofWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl ProofService for ProofProxy {
    async fn proof_create(
        &self,
        ctx: &CallContext,
        args: &ProofCreateArgs,
        proof: JsonEnvelope,
    ) -> ProxyResult<()> {
        Validator::new()
            .validate("txid", not_empty(&args.tx_id))
            .validate("paymentReference", not_empty(&args.payment_reference))
            .finish()?;

        self.writer
            .proof_create(ctx, args, &proof)
            .await
            .with_context(|| format!("failed to create proof for txid {}", args.tx_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProxyError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingWriter {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProofWriter for CountingWriter {
        async fn proof_create(
            &self,
            _ctx: &CallContext,
            _args: &ProofCreateArgs,
            _proof: &JsonEnvelope,
        ) -> ProxyResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn envelope() -> JsonEnvelope {
        JsonEnvelope::new(&serde_json::json!({"index": 0})).unwrap()
    }

    #[tokio::test]
    async fn test_proof_forwarded() {
        let writer = Arc::new(CountingWriter::default());
        let svc = ProofProxy::new(writer.clone());
        let args = ProofCreateArgs {
            tx_id: "tx-1".into(),
            payment_reference: "inv-1".into(),
        };

        svc.proof_create(&CallContext::background(), &args, envelope())
            .await
            .unwrap();
        assert_eq!(writer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_reference_rejected() {
        let writer = Arc::new(CountingWriter::default());
        let svc = ProofProxy::new(writer.clone());
        let args = ProofCreateArgs {
            tx_id: "tx-1".into(),
            payment_reference: String::new(),
        };

        let err = svc
            .proof_create(&CallContext::background(), &args, envelope())
            .await
            .unwrap_err();

        let ProxyError::Validation(validation) = err else {
            panic!("expected validation error");
        };
        assert!(validation.field("paymentReference").is_some());
        assert!(validation.field("txid").is_none());
        assert_eq!(writer.calls.load(Ordering::SeqCst), 0);
    }
}
