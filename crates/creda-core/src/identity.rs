//! # Domain Identity Newtypes
//!
//! Newtype wrappers for all identifiers in the registry. These prevent
//! accidental identifier confusion — you cannot pass an `EnrollmentId`
//! where a `CredentialId` is expected, and a verification code can never
//! be mistaken for a certificate number at a call site.
//!
//! Two identifiers are externally visible and deserve care:
//!
//! - [`CertificateNumber`] — human-readable, printed on the document,
//!   sequential per institution. Guessable by design.
//! - [`VerificationCode`] — the public lookup key embedded in the
//!   verification URL/QR payload. Minted from OS randomness so that
//!   holding one credential's code reveals nothing about any other.

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Unique identifier for an issued credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialId(pub Uuid);

/// Unique identifier for an issuing institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstitutionId(pub Uuid);

/// Unique identifier for a student enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnrollmentId(pub Uuid);

/// Unique identifier for a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseId(pub Uuid);

/// Unique identifier for an academic result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultId(pub Uuid);

macro_rules! uuid_id {
    ($name:ident, $prefix:literal) => {
        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_id!(CredentialId, "credential");
uuid_id!(InstitutionId, "institution");
uuid_id!(EnrollmentId, "enrollment");
uuid_id!(CourseId, "course");
uuid_id!(ResultId, "result");

/// Human-readable certificate number, unique per institution.
///
/// Format: `{institution prefix}-{year}-{sequence:05}`, e.g.
/// `UOA-2026-00417`. Sequential and guessable; uniqueness is enforced by
/// the credential store's index, not by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CertificateNumber(String);

impl CertificateNumber {
    /// Compose a certificate number from an institution prefix, issuance
    /// year, and per-institution sequence value.
    pub fn compose(prefix: &str, year: i32, sequence: u64) -> Self {
        Self(format!("{prefix}-{year}-{sequence:05}"))
    }

    /// Wrap an externally supplied certificate number string.
    ///
    /// Rejects empty or whitespace-only input; no further format check,
    /// since historical numbers predate the composed format.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingField {
                field: "certificate_number",
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The certificate number string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CertificateNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Alphabet for verification codes: uppercase letters and digits with the
/// ambiguous characters (0/O, 1/I/L) removed, since codes are retyped from
/// printed documents.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Length of the random portion of a verification code.
///
/// 10 symbols over a 31-character alphabet is ~49.5 bits — far beyond
/// online-guessing reach for a rate-limited public endpoint.
const CODE_LENGTH: usize = 10;

/// Opaque, unguessable public lookup key for a credential.
///
/// Rendered as `VC-` followed by ten symbols from an unambiguous
/// alphabet, e.g. `VC-7KQM2XWP9A`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationCode(String);

impl VerificationCode {
    /// Mint a fresh verification code from OS randomness.
    pub fn mint() -> Self {
        let mut rng = rand::rngs::OsRng;
        let body: String = (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        Self(format!("VC-{body}"))
    }

    /// Wrap an externally supplied verification code string.
    ///
    /// Normalizes to uppercase; rejects empty input. Unknown codes are a
    /// lookup miss, not a parse error, so no alphabet check is applied.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingField {
                field: "verification_code",
            });
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    /// The verification code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
