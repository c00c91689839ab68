//! # Verification Attempts
//!
//! Every verification call — including lookups that resolve nothing —
//! appends one immutable attempt record capturing who asked, which key
//! they used, and what they were told. The log exists for abuse
//! monitoring (code scanning, enumeration of certificate numbers) and is
//! never read on the verification hot path.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use creda_core::Timestamp;

use crate::verify::VerificationStatus;

/// Which public lookup key a verification request used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    /// Lookup by opaque verification code.
    VerificationCode,
    /// Lookup by human-readable certificate number.
    CertificateNumber,
}

impl LookupKind {
    /// String form used in persistence and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerificationCode => "verification_code",
            Self::CertificateNumber => "certificate_number",
        }
    }
}

/// Requester fingerprint captured with each attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequesterInfo {
    /// Network origin (forwarded-for or peer address).
    pub origin: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// Self-declared requesting organization.
    pub organization: Option<String>,
}

/// An immutable audit record of one verification call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationAttempt {
    /// Attempt identifier.
    pub id: Uuid,
    /// Which key kind was used.
    pub lookup_kind: LookupKind,
    /// The lookup value as presented.
    pub lookup_value: String,
    /// The outcome returned to the caller.
    pub outcome: VerificationStatus,
    /// Requester fingerprint.
    pub requester: RequesterInfo,
    /// When the attempt occurred.
    pub occurred_at: Timestamp,
}

impl VerificationAttempt {
    /// Build an attempt record for the given lookup and outcome.
    pub fn record(
        lookup_kind: LookupKind,
        lookup_value: impl Into<String>,
        outcome: VerificationStatus,
        requester: RequesterInfo,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            lookup_kind,
            lookup_value: lookup_value.into(),
            outcome,
            requester,
            occurred_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_captures_fields() {
        let attempt = VerificationAttempt::record(
            LookupKind::VerificationCode,
            "VC-ABC123XYZ9",
            VerificationStatus::NotFound,
            RequesterInfo {
                origin: Some("203.0.113.7".to_string()),
                user_agent: Some("curl/8.4".to_string()),
                organization: None,
            },
        );
        assert_eq!(attempt.lookup_kind, LookupKind::VerificationCode);
        assert_eq!(attempt.lookup_value, "VC-ABC123XYZ9");
        assert_eq!(attempt.outcome, VerificationStatus::NotFound);
        assert_eq!(attempt.requester.origin.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn lookup_kind_strings() {
        assert_eq!(LookupKind::VerificationCode.as_str(), "verification_code");
        assert_eq!(LookupKind::CertificateNumber.as_str(), "certificate_number");
    }
}
