//! actix-web adapter for the d402 admission state machine.
//!
//! [`admission_gate`] wraps the `/tools/{tool_id}` scope. Admitted requests
//! reach the handler with a [`ResolvedIdentity`] in their extensions; denied
//! requests are answered with a 402 challenge and never reach the handler.

use std::time::Instant;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use actix_web::middleware::Next;
use actix_web::{web, Error, HttpMessage, HttpResponse};
use d402::{
    AdmissionMode, AdmissionRequest, AuthorizationOutcome, DenialReason, PaymentRequiredBody,
    ProofInput, ToolPriceConfig, API_KEY_HEADER, PAYMENT_HEADER,
};

use crate::error::GatewayError;
use crate::metrics::{ADMISSIONS_TOTAL, ADMISSION_LATENCY, DENIALS_TOTAL, VERIFICATION_FAILURES};
use crate::state::AppState;

/// Who the proxied call runs as, attached to admitted requests.
#[derive(Clone)]
pub struct ResolvedIdentity {
    pub mode: AdmissionMode,
    /// Credential for the upstream call: the caller's own key in credential
    /// mode, the operator's service key in payment mode.
    pub credential: Option<String>,
}

impl std::fmt::Debug for ResolvedIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedIdentity")
            .field("mode", &self.mode)
            .field("credential", &self.credential.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Build a 402 Payment Required HTTP response
pub fn build_402(price: Option<&ToolPriceConfig>, reason: DenialReason) -> HttpResponse {
    HttpResponse::PaymentRequired()
        .content_type("application/json")
        .json(PaymentRequiredBody::new(price, reason))
}

/// Credential already resolved by an earlier middleware, such as a session
/// layer. Tried before the request headers.
#[derive(Clone)]
pub struct PresentedCredential(pub String);

impl std::fmt::Debug for PresentedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PresentedCredential([REDACTED])")
    }
}

/// Token of an `Authorization: Bearer <token>` value. The scheme name is
/// case-insensitive.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Every service credential the caller sent, in the order they are tried:
/// `Authorization: Bearer` first, then `X-API-Key`.
pub fn presented_credentials(headers: &HeaderMap) -> Vec<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token);
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    bearer.into_iter().chain(api_key).map(String::from).collect()
}

/// Read the `X-PAYMENT` header. A header that is present but not valid
/// ASCII is malformed, not absent.
pub fn presented_proof(headers: &HeaderMap) -> ProofInput {
    match headers.get(PAYMENT_HEADER) {
        None => ProofInput::Absent,
        Some(value) => match value.to_str() {
            Ok(raw) => ProofInput::from_header(Some(raw)),
            Err(_) => ProofInput::Malformed("X-PAYMENT header is not valid ASCII".to_string()),
        },
    }
}

fn record(tool_id: &str, outcome: &AuthorizationOutcome) {
    match outcome {
        AuthorizationOutcome::Admitted { mode, .. } => {
            ADMISSIONS_TOTAL.with_label_values(&[mode.as_str()]).inc();
        }
        AuthorizationOutcome::Denied { reason, cause } => {
            DENIALS_TOTAL.with_label_values(&[reason.as_str()]).inc();
            if let Some(cause) = cause {
                VERIFICATION_FAILURES
                    .with_label_values(&[cause.as_str()])
                    .inc();
            }
            tracing::info!(tool = %tool_id, reason = %reason, cause = ?cause, "tool call refused with 402");
        }
    }
}

pub async fn admission_gate(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| GatewayError::Internal("application state not configured".to_string()))?;

    let tool_id = req.match_info().get("tool_id").unwrap_or_default().to_string();
    let resolved = req
        .extensions()
        .get::<PresentedCredential>()
        .map(|c| c.0.clone())
        .filter(|c| !c.is_empty());
    let credentials: Vec<String> = resolved
        .into_iter()
        .chain(presented_credentials(req.headers()))
        .collect();
    let candidates: Vec<&str> = credentials.iter().map(String::as_str).collect();
    let proof = presented_proof(req.headers());

    let started = Instant::now();
    let outcome = state
        .admission
        .decide(AdmissionRequest {
            tool_id: &tool_id,
            credentials: &candidates,
            proof,
        })
        .await;
    ADMISSION_LATENCY.observe(started.elapsed().as_secs_f64());
    record(&tool_id, &outcome);

    match outcome {
        AuthorizationOutcome::Admitted { mode, identity } => {
            req.extensions_mut().insert(ResolvedIdentity {
                mode,
                credential: identity,
            });
            Ok(next.call(req).await?.map_into_boxed_body())
        }
        AuthorizationOutcome::Denied { reason, .. } => {
            let price = state.admission.registry().get(&tool_id);
            let response = build_402(price, reason);
            Ok(req.into_response(response).map_into_boxed_body())
        }
    }
}
