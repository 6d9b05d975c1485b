use actix_web::{web, HttpRequest, HttpResponse};
use d402::security::constant_time_eq;

use crate::metrics::REGISTRY;
use crate::middleware::bearer_token;
use crate::state::AppState;

/// GET /health - Health check endpoint
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let verification = if state.admission.verifier().is_testing() {
        "testing"
    } else {
        "facilitator"
    };

    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "d402-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "verification": verification,
        "tools": state.admission.registry().len(),
    }))
}

/// GET /metrics - Prometheus metrics endpoint.
///
/// Requires `Authorization: Bearer <METRICS_TOKEN>` when a token is configured;
/// without a token it is only served when public metrics are enabled.
pub async fn metrics(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    match state.config.metrics_token {
        Some(ref expected_token) => {
            let authorized = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(bearer_token)
                .map(|token| constant_time_eq(token.as_bytes(), expected_token.as_bytes()))
                .unwrap_or(false);

            if !authorized {
                return HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "unauthorized",
                    "message": "Valid Bearer token required for /metrics"
                }));
            }
        }
        None if !state.config.public_metrics => {
            return HttpResponse::NotFound().finish();
        }
        None => {}
    }

    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return HttpResponse::InternalServerError().body("Failed to encode metrics");
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics));
}
