//! Property-based tests for the PKCE encoding.

use proptest::prelude::*;
use xs2a_gateway::oauth::pkce::{code_challenge, encode, hash, verify_s256};

proptest! {
    /// Encoded digests never contain characters outside the base64url alphabet.
    #[test]
    fn encoded_hash_is_url_safe(input in proptest::collection::vec(any::<u8>(), 0..512)) {
        let encoded = encode(&hash(&input));
        prop_assert_eq!(encoded.len(), 43);
        prop_assert!(!encoded.contains('+'));
        prop_assert!(!encoded.contains('/'));
        prop_assert!(!encoded.contains('='));
    }

    /// Encoding the same input twice gives the same result.
    #[test]
    fn encoded_hash_is_deterministic(input in proptest::collection::vec(any::<u8>(), 0..512)) {
        prop_assert_eq!(encode(&hash(&input)), encode(&hash(&input)));
    }

    /// Any verifier verifies against its own challenge and not against another's.
    #[test]
    fn challenge_roundtrip(verifier in "[A-Za-z0-9._~-]{43,128}", other in "[A-Za-z0-9._~-]{43,128}") {
        let challenge = code_challenge(&verifier);
        prop_assert!(verify_s256(&verifier, &challenge));
        if other != verifier {
            prop_assert!(!verify_s256(&other, &challenge));
        }
    }
}
