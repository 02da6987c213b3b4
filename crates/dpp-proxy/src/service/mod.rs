//! Validating service layer between the HTTP handlers and the wallet stores.
//!
//! Requests failing validation are rejected here and never reach a store.
//! Store failures are wrapped with the operation and identifier.

pub mod payment;
pub mod payment_terms;
pub mod proof;

pub use payment::PaymentProxy;
pub use payment_terms::PaymentTermsProxy;
pub use proof::ProofProxy;
