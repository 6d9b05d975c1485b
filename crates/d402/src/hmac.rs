//! Request signing for the facilitator's `X-Facilitator-Auth` header.

use alloy::primitives::hex;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of a facilitator request body under the shared secret.
pub fn compute_hmac(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc4231_case_2() {
        assert_eq!(
            compute_hmac(b"Jefe", b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_signature_depends_on_secret_and_body() {
        let body = b"{\"paymentPayload\":{}}";
        let sig = compute_hmac(b"shared", body);
        assert_eq!(sig.len(), 64);
        assert_ne!(sig, compute_hmac(b"other", body));
        assert_ne!(sig, compute_hmac(b"shared", b"{}"));
    }

    #[test]
    fn test_empty_secret_is_accepted() {
        assert_eq!(compute_hmac(b"", b"body").len(), 64);
    }
}
