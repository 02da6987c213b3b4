//! Field level request validation.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Message used when a required field is empty.
pub const MSG_NOT_EMPTY: &str = "value cannot be empty";

/// Field name to list of violations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationError(BTreeMap<String, Vec<String>>);

impl ValidationError {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Violations recorded against `field`.
    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, msgs)| format!("{}: {}", field, msgs.join(", ")))
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

impl std::error::Error for ValidationError {}

impl From<BTreeMap<String, Vec<String>>> for ValidationError {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Self(map)
    }
}

/// A single rule; `Err` carries the violation message.
pub type Rule = Result<(), String>;

/// The value must not be empty.
pub fn not_empty(value: &str) -> Rule {
    if value.is_empty() {
        Err(MSG_NOT_EMPTY.to_string())
    } else {
        Ok(())
    }
}

/// Collects rule outcomes per field.
///
/// ```ignore
/// Validator::new()
///     .validate("paymentID", not_empty(&args.payment_id))
///     .finish()?;
/// ```
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationError,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn validate(mut self, field: &str, rule: Rule) -> Self {
        if let Err(message) = rule {
            self.errors.add(field, message);
        }
        self
    }

    /// `Err` if any rule failed.
    pub fn finish(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}
