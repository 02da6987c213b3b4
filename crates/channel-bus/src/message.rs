//! # Message envelope
//!
//! Every frame that crosses the bus, in either direction, is a [`Message`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::BusError;

/// Envelope for a single socket message.
///
/// `correlation_id` is chosen by whoever starts a conversation and must be
/// echoed verbatim by any reply, see [`Message::reply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Intent of the message, e.g. `paymentterms.create`.
    #[serde(rename = "key")]
    pub route: String,

    /// Channel the message targets.
    #[serde(rename = "channelId")]
    pub channel_key: String,

    /// Protocol family tag, lets several protocols share one bus.
    #[serde(default)]
    pub app_id: String,

    /// Pairs a request with its reply.
    #[serde(default)]
    pub correlation_id: String,

    /// Optional metadata.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Protocol specific payload.
    #[serde(default)]
    pub body: serde_json::Value,

    /// When the message was built.
    #[serde(default = "chrono::Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create an empty message for `route` on `channel_key`.
    pub fn new(route: impl Into<String>, channel_key: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            channel_key: channel_key.into(),
            app_id: String::new(),
            correlation_id: String::new(),
            headers: BTreeMap::new(),
            body: serde_json::Value::Null,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Serialise `body` into the message.
    pub fn with_body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, BusError> {
        self.body = serde_json::to_value(body).map_err(BusError::Encode)?;
        Ok(self)
    }

    /// Deserialise the body into `T`.
    pub fn bind<T: DeserializeOwned>(&self) -> Result<T, BusError> {
        T::deserialize(&self.body).map_err(BusError::Decode)
    }

    /// The message route.
    pub fn key(&self) -> &str {
        &self.route
    }

    /// Look up a header value.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Build a reply on the same channel carrying the same app and
    /// correlation ids.
    pub fn reply(&self, route: impl Into<String>) -> Self {
        Self::new(route, self.channel_key.clone())
            .with_app_id(self.app_id.clone())
            .with_correlation_id(self.correlation_id.clone())
    }

    /// Size of the message once encoded as JSON.
    pub fn encoded_len(&self) -> Result<usize, BusError> {
        serde_json::to_vec(self)
            .map(|bytes| bytes.len())
            .map_err(BusError::Encode)
    }
}
