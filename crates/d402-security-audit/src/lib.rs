//! Test-only crate; see `tests/security_invariants.rs`.
