//! Payment verification: local prechecks plus a pluggable verifier.
//!
//! [`verify_payment`] always runs [`precheck`] first so that expired, underpaid
//! or wrong-asset proofs are refused without a network round trip. Proofs that
//! survive are handed to a [`PaymentVerifier`]. The stock implementation is
//! [`VerificationMode`]: `Testing` accepts after the prechecks, `Facilitator`
//! delegates to a remote [`FacilitatorClient`].

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::admission::DenialReason;
use crate::error::ConfigError;
use crate::facilitator_client::FacilitatorClient;
use crate::price::ToolPriceConfig;
use crate::proof::PaymentProof;

/// Why a proof was accepted or refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    Accepted,
    Expired,
    InsufficientAmount,
    AssetMismatch,
    /// The facilitator examined the proof and refused it.
    Rejected,
    /// The facilitator could not be reached or answered garbage.
    FacilitatorUnavailable,
}

impl VerdictReason {
    pub fn as_str(self) -> &'static str {
        match self {
            VerdictReason::Accepted => "accepted",
            VerdictReason::Expired => "expired",
            VerdictReason::InsufficientAmount => "insufficient_amount",
            VerdictReason::AssetMismatch => "asset_mismatch",
            VerdictReason::Rejected => "rejected",
            VerdictReason::FacilitatorUnavailable => "facilitator_unavailable",
        }
    }
}

/// Result of verifying one proof against one price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilitatorVerdict {
    pub valid: bool,
    pub reason: VerdictReason,
    /// Free-form detail for logs (facilitator reason, transport error). Never sent to callers.
    pub detail: Option<String>,
}

impl FacilitatorVerdict {
    pub fn accepted() -> Self {
        Self {
            valid: true,
            reason: VerdictReason::Accepted,
            detail: None,
        }
    }

    pub fn refused(reason: VerdictReason, detail: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason,
            detail: Some(detail.into()),
        }
    }

    /// Caller-facing denial reason for a refused verdict.
    pub fn denial_reason(&self) -> DenialReason {
        match self.reason {
            VerdictReason::Expired => DenialReason::ExpiredProof,
            _ => DenialReason::InvalidProof,
        }
    }
}

/// Verifies a structurally sound proof against a tool price.
///
/// Implementations must fail closed: any error is a refused verdict, never
/// an implicit acceptance.
pub trait PaymentVerifier: Send + Sync {
    fn verify(
        &self,
        proof: &PaymentProof,
        price: &ToolPriceConfig,
    ) -> impl Future<Output = FacilitatorVerdict> + Send;
}

/// How payment proofs are verified for the lifetime of the process.
#[derive(Debug, Clone)]
pub enum VerificationMode {
    /// Structural checks only; no facilitator is contacted. Development use only.
    Testing,
    /// Delegate to a remote facilitator.
    Facilitator(FacilitatorClient),
}

impl VerificationMode {
    /// Select the mode at startup.
    ///
    /// Production mode without a facilitator URL is a configuration error,
    /// never a silent downgrade to testing mode.
    pub fn from_settings(
        testing_mode: bool,
        facilitator_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        if testing_mode {
            tracing::warn!(
                "⚠️  D402 TESTING MODE ENABLED: payment proofs are only checked structurally \
                 and the facilitator is bypassed. DO NOT use this in production!"
            );
            return Ok(VerificationMode::Testing);
        }

        let url = facilitator_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingRequired("FACILITATOR_URL"))?;

        Ok(VerificationMode::Facilitator(FacilitatorClient::new(
            url, timeout,
        )?))
    }

    pub fn is_testing(&self) -> bool {
        matches!(self, VerificationMode::Testing)
    }
}

impl PaymentVerifier for VerificationMode {
    async fn verify(&self, proof: &PaymentProof, price: &ToolPriceConfig) -> FacilitatorVerdict {
        match self {
            VerificationMode::Testing => {
                tracing::debug!(tool = %price.tool_id, "testing mode: proof accepted structurally");
                FacilitatorVerdict::accepted()
            }
            VerificationMode::Facilitator(client) => client.verify(proof, price).await,
        }
    }
}

/// Local structural checks that need no network access.
///
/// Returns a refused verdict for the first failing check, or `None` when the
/// proof may proceed to the verifier.
pub fn precheck(proof: &PaymentProof, price: &ToolPriceConfig, now: u64) -> Option<FacilitatorVerdict> {
    if proof.valid_before <= now {
        return Some(FacilitatorVerdict::refused(
            VerdictReason::Expired,
            format!("proof expired at {} (now {now})", proof.valid_before),
        ));
    }

    if proof.asset.address != price.asset.address || proof.asset.network != price.asset.network {
        return Some(FacilitatorVerdict::refused(
            VerdictReason::AssetMismatch,
            format!(
                "proof asset {:#x}@{} does not match required {:#x}@{}",
                proof.asset.address, proof.asset.network, price.asset.address, price.asset.network
            ),
        ));
    }

    if proof.amount < price.amount {
        return Some(FacilitatorVerdict::refused(
            VerdictReason::InsufficientAmount,
            format!("proof amount {} below required {}", proof.amount, price.amount),
        ));
    }

    None
}

/// Verify `proof` for `price`: prechecks first, then the verifier.
pub async fn verify_payment<V: PaymentVerifier>(
    proof: &PaymentProof,
    price: &ToolPriceConfig,
    verifier: &V,
    now: u64,
) -> FacilitatorVerdict {
    if let Some(refused) = precheck(proof, price, now) {
        return refused;
    }
    verifier.verify(proof, price).await
}
