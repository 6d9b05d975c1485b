//! Credential gate and the constant-time comparison it relies on.
//!
//! Comparisons use the `subtle` crate so that neither the content nor the
//! length of the configured secret leaks through response timing.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Constant-time byte comparison that does not leak input lengths or content.
///
/// Both inputs are hashed to fixed-length SHA-256 digests before comparison,
/// so timing reveals neither the content nor the length of either input.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let ha = Sha256::digest(a);
    let hb = Sha256::digest(b);
    ha.ct_eq(&hb).into()
}

/// Check a presented service credential against the operator secret.
///
/// Returns `true` only on an exact match with a configured, non-empty secret.
/// An unset or empty secret never matches anything, including an empty
/// presented value.
pub fn check_credential(presented: Option<&str>, configured: Option<&str>) -> bool {
    let Some(secret) = configured.filter(|s| !s.is_empty()) else {
        return false;
    };
    match presented {
        Some(value) => constant_time_eq(value.as_bytes(), secret.as_bytes()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_match() {
        assert!(constant_time_eq(b"hello", b"hello"));
    }

    #[test]
    fn different_length_inputs_do_not_match() {
        assert!(!constant_time_eq(b"short", b"much longer string"));
    }

    #[test]
    fn exact_credential_matches() {
        assert!(check_credential(Some("op-secret"), Some("op-secret")));
    }

    #[test]
    fn wrong_credential_does_not_match() {
        assert!(!check_credential(Some("op-secret2"), Some("op-secret")));
        assert!(!check_credential(Some("OP-SECRET"), Some("op-secret")));
    }

    #[test]
    fn absent_credential_does_not_match() {
        assert!(!check_credential(None, Some("op-secret")));
    }

    #[test]
    fn unset_secret_never_matches() {
        assert!(!check_credential(Some("anything"), None));
        assert!(!check_credential(None, None));
    }

    #[test]
    fn empty_secret_never_matches_empty_credential() {
        assert!(!check_credential(Some(""), Some("")));
        assert!(!check_credential(Some(""), None));
    }
}
