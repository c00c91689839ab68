//! # Content Digest — Credential Commitments
//!
//! Defines `ContentDigest`, the fixed-size commitment anchored to the
//! ledger for each issued credential.
//!
//! A digest can only be computed from [`CanonicalBytes`], so every digest
//! in the system is produced through the canonicalization pipeline. This is
//! enforced by the signature of [`sha256_digest()`].

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// The hash algorithm used to produce a content digest.
///
/// The registry uses SHA-256 exclusively; the algorithm tag is carried in
/// every stored digest so a future rotation does not require reinterpreting
/// historical anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256 — standard 256-bit content addressing.
    Sha256,
}

impl DigestAlgorithm {
    /// The algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content digest with its algorithm tag.
///
/// Produced exclusively from `CanonicalBytes` via [`sha256_digest()`].
/// The 32-byte digest and algorithm tag together form a self-describing
/// commitment, rendered as `sha256:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a content digest from raw bytes and algorithm.
    ///
    /// Prefer [`sha256_digest()`] for constructing digests from
    /// `CanonicalBytes`.
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a digest from its `<algorithm>:<hex>` display form.
    pub fn parse(s: &str) -> Option<Self> {
        let (alg, hex) = s.split_once(':')?;
        if alg != "sha256" || hex.len() != 64 {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in bytes.iter_mut().enumerate() {
            *chunk = u8::from_str_radix(hex.get(i * 2..i * 2 + 2)?, 16).ok()?;
        }
        Some(Self::new(DigestAlgorithm::Sha256, bytes))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// Compute a SHA-256 content digest from canonical bytes.
///
/// Accepts only `&CanonicalBytes`, not raw `&[u8]` — no code path can
/// compute a commitment over non-canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::new(DigestAlgorithm::Sha256, bytes)
}

/// Compute a SHA-256 hex string from canonical bytes.
///
/// Convenience wrapper for contexts that need the digest as a bare hex
/// string (e.g. persistence columns).
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_deterministic() {
        let cb = CanonicalBytes::new(&serde_json::json!({"a": 1, "b": 2})).unwrap();
        let d1 = sha256_digest(&cb);
        let d2 = sha256_digest(&cb);
        assert_eq!(d1, d2);
        assert_eq!(d1.algorithm, DigestAlgorithm::Sha256);
    }

    #[test]
    fn hex_format() {
        let cb = CanonicalBytes::new(&serde_json::json!({"key": "value"})).unwrap();
        let hex = sha256_hex(&cb);
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn display_prefixed_with_algorithm() {
        let cb = CanonicalBytes::new(&serde_json::json!({"a": 1})).unwrap();
        let digest = sha256_digest(&cb);
        let s = format!("{digest}");
        assert!(s.starts_with("sha256:"));
        assert_eq!(s.len(), 7 + 64);
    }

    #[test]
    fn parse_roundtrip() {
        let cb = CanonicalBytes::new(&serde_json::json!({"x": "y"})).unwrap();
        let digest = sha256_digest(&cb);
        let parsed = ContentDigest::parse(&digest.to_string()).unwrap();
        assert_eq!(parsed, digest);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(ContentDigest::parse("not-a-digest").is_none());
        assert!(ContentDigest::parse("sha256:short").is_none());
        assert!(ContentDigest::parse(&format!("md5:{}", "a".repeat(64))).is_none());
        assert!(ContentDigest::parse(&format!("sha256:{}", "z".repeat(64))).is_none());
    }

    #[test]
    fn different_inputs_different_digests() {
        let cb1 = CanonicalBytes::new(&serde_json::json!({"a": 1})).unwrap();
        let cb2 = CanonicalBytes::new(&serde_json::json!({"a": 2})).unwrap();
        assert_ne!(sha256_digest(&cb1), sha256_digest(&cb2));
    }

    #[test]
    fn known_sha256_vector() {
        // SHA256 of the empty JSON object "{}" is a known value.
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        assert_eq!(cb.as_bytes(), b"{}");
        let digest = sha256_digest(&cb);
        assert_eq!(
            digest.to_hex(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }
}
