use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::domain::{CallContext, JsonEnvelope, ProofCreateArgs, ProxyError};
use crate::http::payment::bad_body;
use crate::http::AppState;

#[derive(Debug, Deserialize)]
pub struct ProofQuery {
    /// Payment reference, usually the invoice id.
    #[serde(default)]
    pub i: String,
}

/// `POST /api/v1/proofs/:txid?i={paymentReference}`
pub async fn create_proof(
    State(state): State<AppState>,
    Path(tx_id): Path<String>,
    Query(query): Query<ProofQuery>,
    body: Result<Json<JsonEnvelope>, JsonRejection>,
) -> Result<StatusCode, ProxyError> {
    let Json(proof) = body.map_err(bad_body)?;
    let args = ProofCreateArgs {
        tx_id,
        payment_reference: query.i,
    };

    state
        .proofs
        .proof_create(&CallContext::background(), &args, proof)
        .await?;
    Ok(StatusCode::CREATED)
}
