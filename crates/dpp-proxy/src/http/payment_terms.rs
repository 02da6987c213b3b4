use axum::extract::{Path, State};
use axum::Json;

use crate::domain::{CallContext, PaymentTermsArgs, ProxyError, TermsEnvelope};
use crate::http::AppState;

/// `GET /api/v1/payment/:paymentID`
///
/// Returns the payee's terms envelope untouched.
pub async fn get_payment_terms(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<TermsEnvelope>, ProxyError> {
    let args = PaymentTermsArgs { payment_id };
    let terms = state
        .payment_terms
        .payment_terms(&CallContext::background(), &args)
        .await?;
    Ok(Json(terms))
}
