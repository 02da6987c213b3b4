//! Payment protocol types exchanged over HTTP and the socket channel.
//!
//! Field names are camelCase on the wire. Payloads produced by a payee
//! wallet are carried as opaque JSON where the proxy does not need to look
//! inside, so nothing a wallet sends is lost in transit.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arguments for reading payment terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTermsArgs {
    #[serde(rename = "paymentID")]
    pub payment_id: String,
}

/// Arguments for submitting a payment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCreateArgs {
    #[serde(rename = "paymentID")]
    pub payment_id: String,
}

/// Arguments for publishing a merkle proof.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofCreateArgs {
    #[serde(rename = "txid")]
    pub tx_id: String,
    pub payment_reference: String,
}

/// A payment submitted by a payer.
///
/// Only the fields the proxy logs are typed; everything else is kept as-is
/// and forwarded to the payee.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Payee acknowledgement of a payment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A JSON payload with an optional signature over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonEnvelope {
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

fn default_encoding() -> String {
    "UTF-8".to_string()
}

fn default_mime_type() -> String {
    "application/json".to_string()
}

impl JsonEnvelope {
    /// Unsigned envelope around the JSON encoding of `payload`.
    pub fn new<T: Serialize>(payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            payload: serde_json::to_string(payload)?,
            signature: None,
            public_key: None,
            encoding: default_encoding(),
            mime_type: default_mime_type(),
        })
    }

    /// Envelope with a signature and signing key attached.
    pub fn signed(
        payload: impl Into<String>,
        signature: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            payload: payload.into(),
            signature: Some(signature.into()),
            public_key: Some(public_key.into()),
            encoding: default_encoding(),
            mime_type: default_mime_type(),
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some() && self.public_key.is_some()
    }
}

/// Payment terms as returned to the payer.
///
/// Passed through untouched when a payee wallet produced it, so the
/// signature over the payload stays verifiable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermsEnvelope(Value);

impl TermsEnvelope {
    pub fn from_envelope(envelope: &JsonEnvelope) -> Result<Self, serde_json::Error> {
        serde_json::to_value(envelope).map(Self)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The typed envelope, if the payee sent one.
    pub fn envelope(&self) -> Option<JsonEnvelope> {
        JsonEnvelope::deserialize(&self.0).ok()
    }
}

impl From<Value> for TermsEnvelope {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Information about the payee.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantData {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extensions: Map<String, Value>,
}

/// An output the payer must fund.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    pub amount: u64,
    pub script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A destination as listed by the PayD wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub script: String,
    // PayD spells the field "satohsis".
    #[serde(alias = "satohsis")]
    pub satoshis: u64,
}

impl From<Destination> for Output {
    fn from(d: Destination) -> Self {
        Self {
            amount: d.satoshis,
            script: d.script,
            description: None,
        }
    }
}

/// Fee rate for one class of transaction bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    #[serde(default)]
    pub satoshis: u64,
    #[serde(default)]
    pub bytes: u64,
}

/// Fees the payee expects the payer to pay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    #[serde(default)]
    pub data: Fee,
    #[serde(default)]
    pub standard: Fee,
}

/// Payment terms assembled by the proxy from wallet lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTerms {
    pub network: String,
    /// Unix seconds.
    pub creation_timestamp: i64,
    /// Unix seconds.
    pub expiration_timestamp: i64,
    #[serde(rename = "url")]
    pub payment_url: String,
    pub memo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiary: Option<MerchantData>,
    pub outputs: Vec<Output>,
    pub fees: FeeQuote,
}
