use crate::config::GatewayConfig;
use crate::error::GatewayError;
use d402::{Admission, PriceRegistry};
use std::sync::Arc;
use std::time::Duration;

/// Upstream calls get the same 30s budget the catalogue tools always had.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub admission: Arc<Admission>,
    pub http_client: reqwest::Client,
}

impl AppState {
    /// Wire the admission state machine for `registry` using the verifier and
    /// service secret from `config`.
    pub fn new(config: GatewayConfig, registry: PriceRegistry) -> Result<Self, GatewayError> {
        let verifier = config
            .verification_mode()
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        let admission = Admission::new(
            Arc::new(registry),
            config.service_api_key.clone(),
            verifier,
        );
        Self::with_admission(config, admission)
    }

    pub fn with_admission(config: GatewayConfig, admission: Admission) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            admission: Arc::new(admission),
            http_client,
        })
    }
}
