//! PKCE (Proof Key for Code Exchange) verification, RFC 7636.

use base64::prelude::*;
use sha2::{Digest, Sha256};

use crate::oauth::types::CodeChallengeMethod;

/// Verify a code verifier against the challenge stored at authorization time.
///
/// `plain` compares the verifier to the challenge directly; `S256` compares
/// the base64url (no padding) SHA-256 digest of the verifier.
pub fn verify_pkce_challenge(
    code_verifier: &str,
    code_challenge: &str,
    method: CodeChallengeMethod,
) -> bool {
    match method {
        CodeChallengeMethod::Plain => code_verifier == code_challenge,
        CodeChallengeMethod::S256 => {
            let digest = Sha256::digest(code_verifier.as_bytes());
            BASE64_URL_SAFE_NO_PAD.encode(digest) == code_challenge
        }
    }
}

/// Compute the S256 challenge for a verifier. Used by clients of this crate
/// and by tests; the server itself only verifies.
pub fn compute_s256_challenge(code_verifier: &str) -> String {
    let digest = Sha256::digest(code_verifier.as_bytes());
    BASE64_URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7636 Appendix B reference values.
    const RFC_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const RFC_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn test_s256_rfc7636_vector() {
        assert_eq!(compute_s256_challenge(RFC_VERIFIER), RFC_CHALLENGE);
        assert!(verify_pkce_challenge(
            RFC_VERIFIER,
            RFC_CHALLENGE,
            CodeChallengeMethod::S256
        ));
    }

    #[test]
    fn test_s256_rejects_wrong_verifier() {
        assert!(!verify_pkce_challenge(
            "wrong-verifier-wrong-verifier-wrong-verifier",
            RFC_CHALLENGE,
            CodeChallengeMethod::S256
        ));
    }

    #[test]
    fn test_plain_exact_equality() {
        assert!(verify_pkce_challenge(
            "some-verifier",
            "some-verifier",
            CodeChallengeMethod::Plain
        ));
        assert!(!verify_pkce_challenge(
            "some-verifier",
            "other-verifier",
            CodeChallengeMethod::Plain
        ));
    }

    #[test]
    fn test_plain_never_hashes() {
        // A plain challenge equal to the S256 digest of the verifier must not
        // verify under the plain method.
        let challenge = compute_s256_challenge(RFC_VERIFIER);
        assert!(!verify_pkce_challenge(
            RFC_VERIFIER,
            &challenge,
            CodeChallengeMethod::Plain
        ));
    }
}
