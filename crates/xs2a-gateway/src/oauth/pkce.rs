//! PKCE (Proof Key for Code Exchange) helpers.
//!
//! Implements the S256 challenge derivation per RFC 7636.
//!
//! The verifier produced by [`generate_code_verifier`] is itself
//! `BASE64URL(SHA256(random))`, and the challenge hashes that string again.
//! The bank sandbox accepts this, and it stays within the RFC's verifier
//! alphabet and length bounds, but it is not the usual recipe (raw random
//! verifier, single-hashed challenge). Changing it requires the bank side to
//! agree, so it is kept as is.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Number of random bytes drawn for each verifier.
const VERIFIER_ENTROPY_BYTES: usize = 64;

/// SHA-256 of `bytes`.
#[must_use]
pub fn hash(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Base64url without padding (RFC 7636 §4.2 / RFC 4648 §5).
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a fresh code verifier.
#[must_use]
pub fn generate_code_verifier() -> String {
    let mut random = [0u8; VERIFIER_ENTROPY_BYTES];
    rand::rng().fill(&mut random[..]);
    encode(&hash(&random))
}

/// Derive the S256 code challenge for a verifier.
#[must_use]
pub fn code_challenge(code_verifier: &str) -> String {
    encode(&hash(code_verifier.as_bytes()))
}

/// Verify a PKCE S256 code challenge.
///
/// Computes `BASE64URL(SHA256(code_verifier))` and compares to the expected challenge.
#[must_use]
pub fn verify_s256(code_verifier: &str, code_challenge_value: &str) -> bool {
    code_challenge(code_verifier) == code_challenge_value
}
