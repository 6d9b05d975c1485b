use std::env;
use std::time::Duration;

use d402::{ConfigError, VerificationMode, DEFAULT_FACILITATOR_TIMEOUT};
use url::Url;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_UPSTREAM_BASE_URL: &str = "https://pro-api.coinmarketcap.com";
const DEFAULT_RATE_LIMIT_RPM: u64 = 120;
/// Timeouts above this still work but hold request workers for too long.
const FACILITATOR_TIMEOUT_WARN_MS: u64 = 10_000;

#[derive(Clone)]
pub struct GatewayConfig {
    /// Server port
    pub port: u16,
    /// Operator secret: accepted as a caller credential and used for upstream calls
    pub service_api_key: Option<String>,
    /// Facilitator base URL (None only in testing mode)
    pub facilitator_url: Option<String>,
    /// Structural-only proof checks, facilitator bypassed
    pub testing_mode: bool,
    /// Per-attempt facilitator timeout
    pub facilitator_timeout: Duration,
    /// HMAC shared secret for facilitator request signing
    pub facilitator_shared_secret: Option<Vec<u8>>,
    /// Bearer token for the facilitator
    pub facilitator_api_key: Option<String>,
    /// Base URL of the proxied API
    pub upstream_base_url: Url,
    /// CORS allowed origins
    pub allowed_origins: Vec<String>,
    /// Rate limit requests per minute per IP
    pub rate_limit_rpm: u64,
    /// Bearer token required for /metrics
    pub metrics_token: Option<String>,
    /// Serve /metrics without a token
    pub public_metrics: bool,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("port", &self.port)
            .field(
                "service_api_key",
                &self.service_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("facilitator_url", &self.facilitator_url)
            .field("testing_mode", &self.testing_mode)
            .field("facilitator_timeout", &self.facilitator_timeout)
            .field(
                "facilitator_shared_secret",
                &self.facilitator_shared_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "facilitator_api_key",
                &self.facilitator_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("upstream_base_url", &self.upstream_base_url.as_str())
            .field("allowed_origins", &self.allowed_origins)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("public_metrics", &self.public_metrics)
            .finish()
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup (the process
    /// environment in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("PORT") {
            Some(p) => p.parse().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                reason: format!("'{p}' is not a port number"),
            })?,
            None => DEFAULT_PORT,
        };

        let service_api_key = get("SERVICE_API_KEY");

        // Off unless explicitly enabled.
        let testing_mode = match get("D402_TESTING_MODE") {
            Some(v) => parse_bool("D402_TESTING_MODE", &v)?,
            None => false,
        };

        let facilitator_url = get("FACILITATOR_URL").or_else(|| get("D402_FACILITATOR_URL"));
        if let Some(ref url) = facilitator_url {
            Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.clone()))?;
        }
        if facilitator_url.is_none() && !testing_mode {
            return Err(ConfigError::MissingRequired("FACILITATOR_URL"));
        }

        let facilitator_timeout_ms = match get("FACILITATOR_TIMEOUT_MS") {
            Some(v) => match v.parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "FACILITATOR_TIMEOUT_MS",
                        reason: format!("'{v}' is not a positive number of milliseconds"),
                    })
                }
            },
            None => DEFAULT_FACILITATOR_TIMEOUT.as_millis() as u64,
        };
        if facilitator_timeout_ms > FACILITATOR_TIMEOUT_WARN_MS {
            tracing::warn!(
                facilitator_timeout_ms,
                "FACILITATOR_TIMEOUT_MS is long; a slow facilitator will hold request workers"
            );
        }

        let facilitator_shared_secret = get("FACILITATOR_SHARED_SECRET").map(String::into_bytes);
        if let Some(ref secret) = facilitator_shared_secret {
            if secret.len() < 32 {
                tracing::warn!(
                    "FACILITATOR_SHARED_SECRET is too short ({} bytes, minimum 32); \
                     use `openssl rand -hex 32` to generate a secure secret",
                    secret.len()
                );
            }
        }
        let facilitator_api_key = get("D402_FACILITATOR_API_KEY");

        let upstream_raw =
            get("UPSTREAM_BASE_URL").unwrap_or_else(|| DEFAULT_UPSTREAM_BASE_URL.to_string());
        let upstream_base_url =
            Url::parse(&upstream_raw).map_err(|_| ConfigError::InvalidUrl(upstream_raw.clone()))?;

        let allowed_origins: Vec<String> = get("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ]
            });
        if allowed_origins.iter().any(|o| o == "*") {
            tracing::warn!("ALLOWED_ORIGINS contains '*': any website can call paid tools from a browser");
        }

        let rate_limit_rpm = match get("RATE_LIMIT_RPM") {
            Some(v) => match v.parse::<u64>() {
                Ok(rpm) if rpm > 0 => rpm,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "RATE_LIMIT_RPM",
                        reason: format!("'{v}' is not a positive integer"),
                    })
                }
            },
            None => DEFAULT_RATE_LIMIT_RPM,
        };

        let metrics_token = get("METRICS_TOKEN");
        let public_metrics = match get("D402_PUBLIC_METRICS") {
            Some(v) => parse_bool("D402_PUBLIC_METRICS", &v)?,
            None => false,
        };

        if service_api_key.is_none() {
            tracing::warn!("SERVICE_API_KEY not set, every tool call must carry a payment proof");
        }

        Ok(Self {
            port,
            service_api_key,
            facilitator_url,
            testing_mode,
            facilitator_timeout: Duration::from_millis(facilitator_timeout_ms),
            facilitator_shared_secret,
            facilitator_api_key,
            upstream_base_url,
            allowed_origins,
            rate_limit_rpm,
            metrics_token,
            public_metrics,
        })
    }

    /// Build the proof verifier described by this configuration.
    pub fn verification_mode(&self) -> Result<VerificationMode, ConfigError> {
        let mode = VerificationMode::from_settings(
            self.testing_mode,
            self.facilitator_url.as_deref(),
            self.facilitator_timeout,
        )?;

        Ok(match mode {
            VerificationMode::Facilitator(mut client) => {
                if let Some(ref secret) = self.facilitator_shared_secret {
                    client = client.with_hmac_secret(secret.clone());
                }
                if let Some(ref key) = self.facilitator_api_key {
                    client = client.with_api_key(key.clone());
                }
                VerificationMode::Facilitator(client)
            }
            testing => testing,
        })
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            name,
            reason: format!("'{other}' is not a boolean"),
        }),
    }
}
