//! Ports between the HTTP surface, the service layer and the wallet stores.

pub mod inbound;
pub mod outbound;

pub use inbound::{PaymentService, PaymentTermsService, ProofService};
pub use outbound::{HttpClient, PaymentTermsReader, PaymentWriter, ProofWriter, WalletStore};
