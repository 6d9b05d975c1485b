//! HTTP client for a remote facilitator's `/verify` endpoint.
//!
//! Every failure mode (rejection, timeout, transport error, bad status,
//! unparsable body) ends in a refused [`FacilitatorVerdict`]; an unreachable
//! facilitator is never read as approval. A 4xx with an `isValid: false` body
//! counts as a rejection, not as unavailability. Transport failures get one retry
//! after a fixed backoff, and the whole exchange runs under a hard deadline.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    FACILITATOR_AUTH_HEADER, FACILITATOR_MAX_ATTEMPTS, FACILITATOR_RETRY_BACKOFF,
    FACILITATOR_VERIFY_PATH,
};
use crate::error::{ConfigError, D402Error};
use crate::price::ToolPriceConfig;
use crate::proof::PaymentProof;
use crate::verifier::{FacilitatorVerdict, VerdictReason};

/// Response from the facilitator's `/verify` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    payment_payload: &'a PaymentProof,
    payment_requirements: &'a ToolPriceConfig,
}

/// Pooled client for one facilitator endpoint. Cheap to clone.
#[derive(Clone)]
pub struct FacilitatorClient {
    http: reqwest::Client,
    verify_url: Url,
    timeout: Duration,
    hmac_secret: Option<Vec<u8>>,
    api_key: Option<String>,
}

impl std::fmt::Debug for FacilitatorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilitatorClient")
            .field("verify_url", &self.verify_url.as_str())
            .field("timeout", &self.timeout)
            .field("hmac_secret", &self.hmac_secret.as_ref().map(|_| "[REDACTED]"))
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl FacilitatorClient {
    /// Create a client for `base_url` with a per-attempt `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .map_err(|e| ConfigError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "{base_url}: facilitator must be http(s)"
            )));
        }
        let verify_url = base
            .join(FACILITATOR_VERIFY_PATH)
            .map_err(|e| ConfigError::InvalidUrl(format!("{base_url}: {e}")))?;

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                name: "FACILITATOR_URL",
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            verify_url,
            timeout,
            hmac_secret: None,
            api_key: None,
        })
    }

    /// Sign request bodies with HMAC-SHA256 in `X-Facilitator-Auth`.
    pub fn with_hmac_secret(mut self, secret: Vec<u8>) -> Self {
        self.hmac_secret = Some(secret);
        self
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn with_api_key(mut self, key: String) -> Self {
        self.api_key = Some(key);
        self
    }

    pub fn verify_url(&self) -> &str {
        self.verify_url.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Upper bound on the time a single [`verify`](Self::verify) call may take.
    pub fn deadline(&self) -> Duration {
        self.timeout * FACILITATOR_MAX_ATTEMPTS + FACILITATOR_RETRY_BACKOFF
    }

    /// Ask the facilitator whether `proof` pays for `price`.
    pub async fn verify(&self, proof: &PaymentProof, price: &ToolPriceConfig) -> FacilitatorVerdict {
        let body = match serde_json::to_vec(&VerifyRequest {
            payment_payload: proof,
            payment_requirements: price,
        }) {
            Ok(b) => b,
            Err(e) => {
                return FacilitatorVerdict::refused(
                    VerdictReason::FacilitatorUnavailable,
                    format!("serialization failed: {e}"),
                )
            }
        };

        let result = tokio::time::timeout(self.deadline(), self.post_with_retry(&body)).await;

        match result {
            Ok(Ok(resp)) if resp.is_valid => FacilitatorVerdict::accepted(),
            Ok(Ok(resp)) => {
                let reason = resp
                    .invalid_reason
                    .unwrap_or_else(|| "unspecified".to_string());
                tracing::info!(tool = %price.tool_id, reason = %reason, "facilitator rejected proof");
                FacilitatorVerdict::refused(VerdictReason::Rejected, reason)
            }
            Ok(Err(e)) => {
                tracing::error!(tool = %price.tool_id, error = %e, "facilitator communication error");
                FacilitatorVerdict::refused(VerdictReason::FacilitatorUnavailable, e.to_string())
            }
            Err(_) => {
                tracing::error!(
                    tool = %price.tool_id,
                    deadline_ms = self.deadline().as_millis() as u64,
                    "facilitator deadline exceeded"
                );
                FacilitatorVerdict::refused(
                    VerdictReason::FacilitatorUnavailable,
                    "facilitator deadline exceeded",
                )
            }
        }
    }

    async fn post_with_retry(&self, body: &[u8]) -> Result<VerifyResponse, D402Error> {
        let mut attempt = 1;
        loop {
            match self.post_verify(body).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() && attempt < FACILITATOR_MAX_ATTEMPTS => {
                    tracing::warn!(attempt, error = %e, "facilitator call failed, retrying");
                    tokio::time::sleep(FACILITATOR_RETRY_BACKOFF).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_verify(&self, body: &[u8]) -> Result<VerifyResponse, D402Error> {
        let mut request = self
            .http
            .post(self.verify_url.clone())
            .header("Content-Type", "application/json")
            .timeout(self.timeout);

        if let Some(secret) = &self.hmac_secret {
            request = request.header(FACILITATOR_AUTH_HEADER, crate::hmac::compute_hmac(secret, body));
        }
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| D402Error::FacilitatorTransport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<VerifyResponse>()
                .await
                .map_err(|e| D402Error::FacilitatorResponse(e.to_string()));
        }

        // A 4xx carrying a verify body is the facilitator refusing the proof.
        // Anything else means it could not give an answer.
        if status.is_client_error() {
            if let Ok(verdict) = resp.json::<VerifyResponse>().await {
                if !verdict.is_valid {
                    return Ok(verdict);
                }
            }
        }
        Err(D402Error::FacilitatorStatus(status.as_u16()))
    }
}
