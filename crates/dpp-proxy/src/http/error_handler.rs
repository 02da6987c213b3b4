//! Maps [`ProxyError`] to an HTTP status and JSON body.
//!
//! Classification is done on the root of the error chain, first match wins:
//!
//! 1. validation error: 400, `{"errors": {field: [messages]}}`
//! 2. no route matched: treated as a not found client error
//! 3. client error record passed through: 400, its message
//! 4. anything that is not a client error: 500, logged, generic message
//! 5. client error: status by kind, its detail
//!
//! Only the detail of a client error reaches the caller, never its id or code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::domain::{ClientError, ProxyError};

/// Body returned for every internal error.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Status and body for `err`.
pub fn error_response(err: &ProxyError) -> (StatusCode, Value) {
    match err.root() {
        ProxyError::Validation(fields) => (StatusCode::BAD_REQUEST, json!({ "errors": fields })),
        ProxyError::RouteNotFound(path) => {
            debug!(path = %path, "No route matched");
            client_response(&ClientError::not_found("404", "Not Found"))
        }
        ProxyError::ClientRecord(record) => (StatusCode::BAD_REQUEST, json!(record.message)),
        ProxyError::Client(client) => {
            debug!(
                error_id = %client.id(),
                code = %client.code(),
                title = client.title(),
                error = %err,
                "Client error"
            );
            client_response(client)
        }
        _ => {
            error!(error = %err, detail = ?err, "Internal Server Error");
            (StatusCode::INTERNAL_SERVER_ERROR, json!(INTERNAL_ERROR_MESSAGE))
        }
    }
}

fn client_response(client: &ClientError) -> (StatusCode, Value) {
    let status = StatusCode::from_u16(client.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, json!(client.detail()))
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, body) = error_response(&self);
        (status, Json(body)).into_response()
    }
}
