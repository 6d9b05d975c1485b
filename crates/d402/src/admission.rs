//! Per-request admission state machine.
//!
//! ```text
//! RESOLVE_TOOL ── unknown ─────────────────────────────► DENY(unknown_tool)
//!      │ known
//!      ▼
//! TRY_CREDENTIAL ── match ─────────────────────────────► ADMIT(credential)
//!      │ absent / mismatch
//!      ▼
//! TRY_PAYMENT ── no proof ─────────────────────────────► DENY(no_proof)
//!      ├──────── verdict valid ────────────────────────► ADMIT(payment)
//!      └──────── verdict invalid ──────────────────────► DENY(invalid_proof | expired_proof)
//! ```
//!
//! The credential is always tried before payment because it needs no network call.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::price::ToolPriceConfig;
use crate::proof::{decode_payment_header, PaymentProof};
use crate::registry::PriceRegistry;
use crate::security::check_credential;
use crate::verifier::{verify_payment, PaymentVerifier, VerdictReason, VerificationMode};

/// How a request got in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionMode {
    Credential,
    Payment,
    Denied,
}

impl AdmissionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AdmissionMode::Credential => "credential",
            AdmissionMode::Payment => "payment",
            AdmissionMode::Denied => "denied",
        }
    }
}

/// Machine-readable reason carried in every 402 body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    NoProof,
    InvalidProof,
    ExpiredProof,
    UnknownTool,
}

impl DenialReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenialReason::NoProof => "no_proof",
            DenialReason::InvalidProof => "invalid_proof",
            DenialReason::ExpiredProof => "expired_proof",
            DenialReason::UnknownTool => "unknown_tool",
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of the admission state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    Admitted {
        mode: AdmissionMode,
        /// Credential the downstream handler uses for the proxied backend call.
        identity: Option<String>,
    },
    Denied {
        reason: DenialReason,
        /// Verifier reason behind an `invalid_proof`/`expired_proof` denial, for diagnostics.
        cause: Option<VerdictReason>,
    },
}

impl AuthorizationOutcome {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AuthorizationOutcome::Admitted { .. })
    }

    pub fn mode(&self) -> AdmissionMode {
        match self {
            AuthorizationOutcome::Admitted { mode, .. } => *mode,
            AuthorizationOutcome::Denied { .. } => AdmissionMode::Denied,
        }
    }

    pub fn resolved_identity(&self) -> Option<&str> {
        match self {
            AuthorizationOutcome::Admitted { identity, .. } => identity.as_deref(),
            AuthorizationOutcome::Denied { .. } => None,
        }
    }

    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            AuthorizationOutcome::Denied { reason, .. } => Some(*reason),
            AuthorizationOutcome::Admitted { .. } => None,
        }
    }

    fn denied(reason: DenialReason) -> Self {
        AuthorizationOutcome::Denied {
            reason,
            cause: None,
        }
    }
}

/// Payment proof as found on the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofInput {
    Absent,
    /// A header was sent but could not be decoded.
    Malformed(String),
    Present(PaymentProof),
}

impl ProofInput {
    /// Interpret an optional `X-PAYMENT` header value.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => ProofInput::Absent,
            Some(raw) => match decode_payment_header(raw) {
                Ok(proof) => ProofInput::Present(proof),
                Err(e) => ProofInput::Malformed(e.to_string()),
            },
        }
    }
}

/// Everything the state machine needs to know about one request.
#[derive(Debug, Clone)]
pub struct AdmissionRequest<'a> {
    pub tool_id: &'a str,
    /// Credentials found on the request, in the order they should be tried.
    pub credentials: &'a [&'a str],
    pub proof: ProofInput,
}

enum Step<'r> {
    ResolveTool,
    TryCredential(&'r ToolPriceConfig),
    TryPayment(&'r ToolPriceConfig),
    Done(AuthorizationOutcome),
}

/// Orchestrates registry lookup, credential gate and payment verification.
pub struct Admission<V = VerificationMode> {
    registry: Arc<PriceRegistry>,
    service_secret: Option<String>,
    verifier: V,
}

impl<V> std::fmt::Debug for Admission<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Admission")
            .field("tools", &self.registry.len())
            .field(
                "service_secret",
                &self.service_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl<V: PaymentVerifier> Admission<V> {
    /// `service_secret` is both the credential callers may present and the
    /// identity handed downstream for paid calls. Empty strings count as unset.
    pub fn new(registry: Arc<PriceRegistry>, service_secret: Option<String>, verifier: V) -> Self {
        Self {
            registry,
            service_secret: service_secret.filter(|s| !s.is_empty()),
            verifier,
        }
    }

    pub fn registry(&self) -> &PriceRegistry {
        &self.registry
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Run the state machine against the current wall clock.
    pub async fn decide(&self, request: AdmissionRequest<'_>) -> AuthorizationOutcome {
        self.decide_at(request, unix_now()).await
    }

    /// Run the state machine with an explicit request time (unix seconds).
    pub async fn decide_at(&self, request: AdmissionRequest<'_>, now: u64) -> AuthorizationOutcome {
        let AdmissionRequest {
            tool_id,
            credentials,
            proof,
        } = request;
        let mut proof = Some(proof);
        let mut step = Step::ResolveTool;

        loop {
            step = match step {
                Step::ResolveTool => match self.registry.get(tool_id) {
                    Some(price) => Step::TryCredential(price),
                    None => {
                        tracing::info!(tool = %tool_id, "admission denied: unknown tool");
                        Step::Done(AuthorizationOutcome::denied(DenialReason::UnknownTool))
                    }
                },

                Step::TryCredential(price) => {
                    let accepted = credentials.iter().copied().find(|&candidate| {
                        check_credential(Some(candidate), self.service_secret.as_deref())
                    });
                    match accepted {
                        Some(credential) => {
                            tracing::debug!(tool = %tool_id, "admitted by service credential");
                            Step::Done(AuthorizationOutcome::Admitted {
                                mode: AdmissionMode::Credential,
                                identity: Some(credential.to_string()),
                            })
                        }
                        None => {
                            if !credentials.is_empty() {
                                tracing::debug!(
                                    tool = %tool_id,
                                    presented = credentials.len(),
                                    "credential presented but not accepted"
                                );
                            }
                            Step::TryPayment(price)
                        }
                    }
                }

                Step::TryPayment(price) => match proof.take().unwrap_or(ProofInput::Absent) {
                    ProofInput::Absent => {
                        tracing::debug!(tool = %tool_id, "admission denied: no proof");
                        Step::Done(AuthorizationOutcome::denied(DenialReason::NoProof))
                    }
                    ProofInput::Malformed(error) => {
                        tracing::warn!(tool = %tool_id, error = %error, "invalid payment header");
                        Step::Done(AuthorizationOutcome::denied(DenialReason::InvalidProof))
                    }
                    ProofInput::Present(proof) => {
                        let verdict = verify_payment(&proof, price, &self.verifier, now).await;
                        if verdict.valid {
                            tracing::info!(tool = %tool_id, payer = %proof.payer, "admitted by payment");
                            Step::Done(AuthorizationOutcome::Admitted {
                                mode: AdmissionMode::Payment,
                                identity: self.service_secret.clone(),
                            })
                        } else {
                            tracing::warn!(
                                tool = %tool_id,
                                payer = %proof.payer,
                                verdict = verdict.reason.as_str(),
                                detail = verdict.detail.as_deref().unwrap_or(""),
                                "payment proof refused"
                            );
                            Step::Done(AuthorizationOutcome::Denied {
                                reason: verdict.denial_reason(),
                                cause: Some(verdict.reason),
                            })
                        }
                    }
                },

                Step::Done(outcome) => return outcome,
            };
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
