//! d402 admission control for pay-per-call tools.
//!
//! Every priced tool declares an amount, a token asset and a signing domain.
//! A call is admitted either because it carries the operator's service
//! credential, or because it carries a payment proof that covers the tool's
//! price. Everything else is refused with an HTTP 402 challenge describing
//! what payment would be accepted.
//!
//! # Components
//!
//! - [`registry`]: immutable tool → price map ([`PriceRegistryBuilder`])
//! - [`security`]: constant-time credential gate ([`check_credential`])
//! - [`verifier`]: local prechecks, testing mode and the [`PaymentVerifier`] seam
//! - [`facilitator_client`]: production verification against a remote facilitator
//! - [`admission`]: the per-request state machine ([`Admission`])
//! - [`challenge`]: the 402 response body ([`PaymentRequiredBody`])
//!
//! # Quick example
//!
//! ```no_run
//! use std::sync::Arc;
//! use d402::{Admission, AdmissionRequest, PriceRegistryBuilder, ProofInput, ToolDeclaration, VerificationMode};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), d402::ConfigError> {
//! let registry = PriceRegistryBuilder::new()
//!     .register(ToolDeclaration::new(
//!         "quotes_latest",
//!         "1000000000000000",
//!         "0x3e17730bb2ca51a8D5deD7E44c003A2e95a4d822",
//!         6,
//!         "sepolia",
//!         "IATPWallet",
//!         "1",
//!     ))
//!     .build()?;
//!
//! let admission = Admission::new(Arc::new(registry), Some("operator-key".into()), VerificationMode::Testing);
//! let outcome = admission
//!     .decide(AdmissionRequest {
//!         tool_id: "quotes_latest",
//!         credentials: &["operator-key"],
//!         proof: ProofInput::Absent,
//!     })
//!     .await;
//! assert!(outcome.is_admitted());
//! # Ok(())
//! # }
//! ```

pub mod admission;
pub mod challenge;
pub mod constants;
pub mod error;
pub mod facilitator_client;
pub mod hmac;
pub mod price;
pub mod proof;
pub mod registry;
pub mod security;
pub mod verifier;

pub use admission::{
    Admission, AdmissionMode, AdmissionRequest, AuthorizationOutcome, DenialReason, ProofInput,
};
pub use challenge::{AcceptedPayment, PaymentRequiredBody};
pub use constants::*;
pub use error::{ConfigError, D402Error};
pub use facilitator_client::{FacilitatorClient, VerifyResponse};
pub use price::{SigningDomain, TokenAsset, ToolDeclaration, ToolPriceConfig};
pub use proof::{decode_payment_header, encode_payment_header, PaymentProof, ProofAsset};
pub use registry::{PriceRegistry, PriceRegistryBuilder};
pub use security::check_credential;
pub use verifier::{
    precheck, verify_payment, FacilitatorVerdict, PaymentVerifier, VerdictReason,
    VerificationMode,
};
