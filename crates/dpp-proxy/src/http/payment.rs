use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::domain::{CallContext, ClientError, Payment, PaymentAck, PaymentCreateArgs, ProxyError};
use crate::http::AppState;

/// `POST /api/v1/payment/:paymentID`
pub async fn create_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    body: Result<Json<Payment>, JsonRejection>,
) -> Result<(StatusCode, Json<PaymentAck>), ProxyError> {
    let Json(payment) = body.map_err(bad_body)?;
    let args = PaymentCreateArgs { payment_id };

    let ack = state
        .payments
        .payment_create(&CallContext::background(), &args, payment)
        .await?;
    Ok((StatusCode::CREATED, Json(ack)))
}

/// A body that failed to parse is the caller's fault.
pub(crate) fn bad_body(rejection: JsonRejection) -> ProxyError {
    ClientError::bad_request("400", rejection.body_text()).into()
}
