use thiserror::Error;

/// Startup-time configuration errors. The process must refuse to start on any of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("invalid price declaration for tool '{tool}': {reason}")]
    InvalidPrice { tool: String, reason: String },

    #[error("tool '{0}' is declared more than once")]
    DuplicateTool(String),
}

/// Per-request errors raised while decoding proofs or talking to the facilitator.
///
/// None of these leave the admission boundary: they are folded into a denial.
#[derive(Debug, Error)]
pub enum D402Error {
    #[error("invalid payment header: {0}")]
    InvalidHeader(String),

    #[error("facilitator request failed: {0}")]
    FacilitatorTransport(String),

    #[error("facilitator returned HTTP {0}")]
    FacilitatorStatus(u16),

    #[error("facilitator response parse failed: {0}")]
    FacilitatorResponse(String),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl D402Error {
    /// Whether another attempt could plausibly succeed (timeouts and connection failures).
    pub fn is_retryable(&self) -> bool {
        matches!(self, D402Error::FacilitatorTransport(_))
    }
}
