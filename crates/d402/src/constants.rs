use std::time::Duration;

/// Header carrying the base64-encoded JSON [`PaymentProof`](crate::PaymentProof).
pub const PAYMENT_HEADER: &str = "X-PAYMENT";

/// Alternative header for the service credential (besides `Authorization: Bearer`).
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Header carrying the HMAC-SHA256 of a facilitator request body.
pub const FACILITATOR_AUTH_HEADER: &str = "X-Facilitator-Auth";

/// Facilitator verification path, appended to the configured base URL.
pub const FACILITATOR_VERIFY_PATH: &str = "verify";

/// Default per-attempt timeout for a facilitator call.
pub const DEFAULT_FACILITATOR_TIMEOUT: Duration = Duration::from_millis(3_000);

/// Facilitator attempts per request: the first call plus one retry.
pub const FACILITATOR_MAX_ATTEMPTS: u32 = 2;

/// Fixed pause before the single retry.
pub const FACILITATOR_RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// HTTP status of every admission refusal.
pub const PAYMENT_REQUIRED_STATUS: u16 = 402;
