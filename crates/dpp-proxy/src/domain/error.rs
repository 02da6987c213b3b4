//! Error taxonomy for the proxy.
//!
//! [`ClientError`] is the closed set of user-facing failures, each kind with a
//! fixed title and HTTP status affinity. [`ProxyError`] is what every layer
//! returns; the HTTP error mapper classifies it by its root cause.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::validation::ValidationError;
use crate::ipc::BridgeError;

/// Kinds of client error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Duplicate,
    NotAuthenticated,
    NotAuthorised,
    Unprocessable,
    NotAvailable,
}

impl ErrorKind {
    /// Title shared by every error of this kind.
    pub fn title(self) -> &'static str {
        match self {
            Self::BadRequest => "Bad Request",
            Self::NotFound => "Not Found",
            Self::Duplicate => "Conflict",
            Self::NotAuthenticated => "Not Authenticated",
            Self::NotAuthorised => "Permission Denied",
            Self::Unprocessable => "Unprocessable Entity",
            Self::NotAvailable => "Not Available",
        }
    }

    /// HTTP status this kind is reported with.
    pub fn status_code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Duplicate => 409,
            Self::NotAuthenticated => 401,
            Self::NotAuthorised => 403,
            Self::Unprocessable => 422,
            Self::NotAvailable => 503,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// An error that can be returned to a user.
///
/// `title` is fixed by [`ErrorKind`]; callers only pick `code` (an
/// application short code such as `404` or `N0001`) and `detail`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientError {
    id: String,
    kind: ErrorKind,
    code: String,
    detail: String,
}

impl ClientError {
    /// Create an error of `kind` with a fresh id.
    pub fn new(kind: ErrorKind, code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            code: code.into(),
            detail: detail.into(),
        }
    }

    /// Create an error whose detail is built from format arguments.
    ///
    /// ```ignore
    /// ClientError::with_args(ErrorKind::NotFound, "N0001", format_args!("invoice {} not found", id));
    /// ```
    pub fn with_args(kind: ErrorKind, code: impl Into<String>, args: fmt::Arguments<'_>) -> Self {
        Self::new(kind, code, args.to_string())
    }

    pub fn bad_request(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, code, detail)
    }

    pub fn not_found(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, code, detail)
    }

    pub fn duplicate(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Duplicate, code, detail)
    }

    pub fn not_authenticated(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, code, detail)
    }

    pub fn not_authorised(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthorised, code, detail)
    }

    pub fn unprocessable(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unprocessable, code, detail)
    }

    pub fn not_available(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAvailable, code, detail)
    }

    /// Unique per instance, for support and log correlation.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn title(&self) -> &'static str {
        self.kind.title()
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn is_bad_request(&self) -> bool {
        self.kind == ErrorKind::BadRequest
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_duplicate(&self) -> bool {
        self.kind == ErrorKind::Duplicate
    }

    pub fn is_not_authenticated(&self) -> bool {
        self.kind == ErrorKind::NotAuthenticated
    }

    pub fn is_not_authorised(&self) -> bool {
        self.kind == ErrorKind::NotAuthorised
    }

    pub fn is_unprocessable(&self) -> bool {
        self.kind == ErrorKind::Unprocessable
    }

    pub fn is_not_available(&self) -> bool {
        self.kind == ErrorKind::NotAvailable
    }

    /// Translate a wire error record produced by a payee wallet.
    ///
    /// 401 and 403 map to NotAuthorised and NotAuthenticated respectively,
    /// matching what wallets in the field already send.
    pub fn from_wire(record: &ClientErrorRecord) -> Self {
        let kind = match record.code.as_str() {
            "400" => ErrorKind::BadRequest,
            "401" => ErrorKind::NotAuthorised,
            "403" => ErrorKind::NotAuthenticated,
            "404" | "N0001" => ErrorKind::NotFound,
            "409" => ErrorKind::Duplicate,
            "422" => ErrorKind::Unprocessable,
            _ => ErrorKind::BadRequest,
        };
        Self::new(kind, record.code.clone(), record.message.clone())
    }

    /// The wire form of this error.
    pub fn to_record(&self) -> ClientErrorRecord {
        ClientErrorRecord {
            id: self.id.clone(),
            code: self.code.clone(),
            title: self.title().to_string(),
            message: self.detail.clone(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title(), self.detail)
    }
}

impl std::error::Error for ClientError {}

/// Wire representation of a client error.
///
/// Wallets send this as the body of `paymentterms.error` and `payment.error`
/// replies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientErrorRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for ClientErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.title, self.message)
    }
}

/// Errors returned by every layer of the proxy.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Field level validation failure.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Classified client error.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Already formed client error record passed through untouched.
    #[error("{0}")]
    ClientRecord(ClientErrorRecord),

    /// No HTTP route matched the request.
    #[error("route not found: {0}")]
    RouteNotFound(String),

    /// Correlation bridge failure.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// A wallet replied on a route the caller does not understand.
    #[error("unexpected response key '{0}'")]
    UnexpectedRoute(String),

    /// A payload could not be encoded or decoded.
    #[error("{0}")]
    Decode(String),

    /// The HTTP wallet returned an unexpected status or could not be reached.
    #[error("wallet request failed: {0}")]
    Wallet(String),

    /// Anything else.
    #[error("{0}")]
    Internal(String),

    /// A failure wrapped with call-site context.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ProxyError>,
    },
}

impl ProxyError {
    /// Wrap this error with call-site context.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, past any context wrapping.
    pub fn root(&self) -> &ProxyError {
        let mut current = self;
        while let Self::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// The classified client error at the root, if any.
    pub fn client_error(&self) -> Option<&ClientError> {
        match self.root() {
            Self::Client(e) => Some(e),
            _ => None,
        }
    }
}

impl From<channel_bus::BusError> for ProxyError {
    fn from(e: channel_bus::BusError) -> Self {
        match e {
            channel_bus::BusError::Encode(_) | channel_bus::BusError::Decode(_) => {
                Self::Decode(e.to_string())
            }
            other => Self::Bridge(BridgeError::Transport(other)),
        }
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Result alias used throughout the crate.
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Context wrapping for results.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> ProxyResult<T>;

    fn with_context<C, F>(self, f: F) -> ProxyResult<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<ProxyError>,
{
    fn context(self, context: impl Into<String>) -> ProxyResult<T> {
        self.map_err(|e| Into::<ProxyError>::into(e).context(context))
    }

    fn with_context<C, F>(self, f: F) -> ProxyResult<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Into::<ProxyError>::into(e).context(f()))
    }
}
