//! Webhook signature computation and verification

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The inbound header carrying a hex-encoded HMAC-SHA256 digest of the body
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Verifies webhook payloads against a shared secret
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: String,
}

impl SignatureVerifier {
    /// Create a verifier with the given secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Compute the hex-encoded HMAC-SHA256 digest of a payload
    pub fn sign(&self, payload: &[u8]) -> String {
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).expect("HMAC can take any size key");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify a hex-encoded signature against the payload.
    ///
    /// An empty secret means no signing is configured and every payload is
    /// treated as trusted. Malformed signatures never error; they simply fail
    /// the comparison.
    pub fn verify(&self, payload: &[u8], signature_hex: &str) -> bool {
        if self.secret.is_empty() {
            return true;
        }

        constant_time_compare(signature_hex, &self.sign(payload))
    }
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let verifier = SignatureVerifier::new("test-secret");
        let payload = b"Hello, World!";

        let signature = verifier.sign(payload);
        assert_eq!(signature.len(), 64);
        assert!(verifier.verify(payload, &signature));
    }

    #[test]
    fn test_sign_is_deterministic() {
        let verifier = SignatureVerifier::new("test-secret");
        assert_eq!(verifier.sign(b"payload"), verifier.sign(b"payload"));
    }

    #[test]
    fn test_verify_wrong_secret() {
        let signer = SignatureVerifier::new("secret1");
        let verifier = SignatureVerifier::new("secret2");

        let payload = b"test payload";
        let signature = signer.sign(payload);

        assert!(!verifier.verify(payload, &signature));
    }

    #[test]
    fn test_empty_secret_trusts_everything() {
        let verifier = SignatureVerifier::new("");

        assert!(verifier.verify(b"payload", "anything"));
        assert!(verifier.verify(b"payload", ""));
        assert!(verifier.verify(b"", "not even hex!"));
    }

    #[test]
    fn test_malformed_signature_fails_without_error() {
        let verifier = SignatureVerifier::new("test-secret");

        assert!(!verifier.verify(b"payload", "not hex at all"));
        assert!(!verifier.verify(b"payload", ""));
        assert!(!verifier.verify(b"payload", "zz".repeat(32).as_str()));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let verifier = SignatureVerifier::new("test-secret");
        let signature = verifier.sign(b"original");

        assert!(!verifier.verify(b"tampered", &signature));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "ab"));
        assert!(!constant_time_compare("", "a"));
    }
}
