//! # Credential Record and Status Machine
//!
//! ## States
//!
//! ```text
//! Issued ──▶ PendingAnchor ──▶ Anchored
//!    │             │               │
//!    ◀─────────────┘ (rejected)    │
//!    │             │               │
//!    └─────────────┴───────────────┴──▶ Revoked (terminal for trust)
//! ```
//!
//! A credential in `Anchored` always has a current anchor row. A revoked
//! credential keeps its anchor — ledger history is immutable — but is
//! reported invalid by the verification engine. The row itself is never
//! deleted; revocation is terminal for trust purposes only.
//!
//! Every transition is appended to an in-row log with a timestamp and
//! reason, so the full history of a credential is reconstructible from
//! the record alone.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use creda_core::{
    sha256_digest, CanonicalBytes, CanonicalizationError, CertificateNumber, ContentDigest,
    CredentialId, InstitutionId, Timestamp, VerificationCode,
};

// ─── Status ──────────────────────────────────────────────────────────

/// The lifecycle state of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialStatus {
    /// Issued and locally valid; no anchoring attempt has concluded.
    Issued,
    /// An anchoring attempt is in flight or awaiting retry.
    PendingAnchor,
    /// Anchored on the ledger; the current anchor row holds the commitment.
    Anchored,
    /// Revoked by the issuing institution. Terminal for trust purposes.
    Revoked,
}

impl CredentialStatus {
    /// Whether the credential has a concluded ledger anchor.
    pub fn is_anchored(&self) -> bool {
        matches!(self, Self::Anchored)
    }

    /// Whether the credential has been revoked.
    pub fn is_revoked(&self) -> bool {
        matches!(self, Self::Revoked)
    }

    /// String form used in API responses and persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issued => "ISSUED",
            Self::PendingAnchor => "PENDING_ANCHOR",
            Self::Anchored => "ANCHORED",
            Self::Revoked => "REVOKED",
        }
    }
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from credential state transitions.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// Attempted transition is not valid from the current state.
    #[error("invalid credential transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: CredentialStatus,
        /// Attempted target state.
        to: CredentialStatus,
    },
}

// ─── Payload components ──────────────────────────────────────────────

/// Identity of the credential holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Full legal name as it appears on the document.
    pub full_name: String,
    /// Institution-local student number, if one exists.
    pub student_number: Option<String>,
    /// National identity number, if recorded.
    pub national_id: Option<String>,
    /// Date of birth.
    pub date_of_birth: NaiveDate,
}

/// The academic program the credential attests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Program name, e.g. "BSc Computer Science".
    pub name: String,
    /// Program type, e.g. "bachelor", "master", "diploma".
    pub program_type: String,
    /// Class/grade honor, e.g. "First Class Honours".
    pub honors: Option<String>,
    /// Final numeric score, carried as a decimal string so canonical
    /// payloads stay float-free.
    pub final_score: Option<String>,
}

/// Revocation bookkeeping, retained on the row for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revocation {
    /// Why the credential was revoked.
    pub reason: String,
    /// Who revoked it (principal subject).
    pub revoked_by: String,
    /// When revocation took effect.
    pub revoked_at: Timestamp,
}

/// Record of a credential status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    /// State before the transition.
    pub from_status: CredentialStatus,
    /// State after the transition.
    pub to_status: CredentialStatus,
    /// When the transition occurred.
    pub timestamp: Timestamp,
    /// Reason for the transition.
    pub reason: String,
}

// ─── Credential ──────────────────────────────────────────────────────

/// One issued academic credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Internal unique identifier.
    pub id: CredentialId,
    /// The issuing institution.
    pub institution_id: InstitutionId,
    /// Human-readable document number, unique per institution.
    pub certificate_number: CertificateNumber,
    /// Opaque public lookup key.
    pub verification_code: VerificationCode,
    /// Holder identity.
    pub subject: Subject,
    /// Program descriptor.
    pub program: Program,
    /// Program start date, when recorded.
    pub started_on: Option<NaiveDate>,
    /// Graduation date.
    pub graduated_on: NaiveDate,
    /// Free-form institution metadata. Not part of the canonical payload.
    pub metadata: serde_json::Value,
    /// Current lifecycle state.
    pub status: CredentialStatus,
    /// Revocation details, present iff status is `Revoked`.
    pub revocation: Option<Revocation>,
    /// Ordered log of all status transitions.
    pub transitions: Vec<StatusTransition>,
    /// Row creation time.
    pub created_at: Timestamp,
    /// Last mutation time.
    pub updated_at: Timestamp,
}

impl Credential {
    /// Create a freshly issued credential.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        institution_id: InstitutionId,
        certificate_number: CertificateNumber,
        verification_code: VerificationCode,
        subject: Subject,
        program: Program,
        started_on: Option<NaiveDate>,
        graduated_on: NaiveDate,
        metadata: serde_json::Value,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: CredentialId::new(),
            institution_id,
            certificate_number,
            verification_code,
            subject,
            program,
            started_on,
            graduated_on,
            metadata,
            status: CredentialStatus::Issued,
            revocation: None,
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The year used when composing certificate numbers for this record.
    pub fn issuance_year(&self) -> i32 {
        self.created_at.as_datetime().year()
    }

    /// Begin an anchoring attempt (ISSUED or PENDING_ANCHOR → PENDING_ANCHOR).
    ///
    /// Re-entering `PendingAnchor` on a retry is a no-op transition and is
    /// not logged twice.
    pub fn begin_anchoring(&mut self, reason: &str) -> Result<(), CredentialError> {
        match self.status {
            CredentialStatus::Issued => {
                self.do_transition(CredentialStatus::PendingAnchor, reason);
                Ok(())
            }
            CredentialStatus::PendingAnchor => Ok(()),
            from => Err(CredentialError::InvalidTransition {
                from,
                to: CredentialStatus::PendingAnchor,
            }),
        }
    }

    /// Conclude anchoring (PENDING_ANCHOR → ANCHORED).
    pub fn mark_anchored(&mut self, reason: &str) -> Result<(), CredentialError> {
        match self.status {
            CredentialStatus::PendingAnchor => {
                self.do_transition(CredentialStatus::Anchored, reason);
                Ok(())
            }
            from => Err(CredentialError::InvalidTransition {
                from,
                to: CredentialStatus::Anchored,
            }),
        }
    }

    /// Abandon a pending attempt after a fatal rejection
    /// (PENDING_ANCHOR → ISSUED).
    ///
    /// `PendingAnchor` is reserved for retriable failures; a rejected
    /// submission returns the credential to `Issued` so the retry sweep
    /// never re-submits a payload the ledger has refused.
    pub fn clear_pending(&mut self, reason: &str) -> Result<(), CredentialError> {
        match self.status {
            CredentialStatus::PendingAnchor => {
                self.do_transition(CredentialStatus::Issued, reason);
                Ok(())
            }
            from => Err(CredentialError::InvalidTransition {
                from,
                to: CredentialStatus::Issued,
            }),
        }
    }

    /// Revoke the credential from any non-revoked state.
    ///
    /// The anchor row is untouched; revocation is recorded on the
    /// relational side only.
    pub fn revoke(&mut self, reason: &str, revoked_by: &str) -> Result<(), CredentialError> {
        if self.status.is_revoked() {
            return Err(CredentialError::InvalidTransition {
                from: self.status,
                to: CredentialStatus::Revoked,
            });
        }
        self.revocation = Some(Revocation {
            reason: reason.to_string(),
            revoked_by: revoked_by.to_string(),
            revoked_at: Timestamp::now(),
        });
        self.do_transition(CredentialStatus::Revoked, reason);
        Ok(())
    }

    /// The canonical payload: the order-stable set of trust-relevant
    /// fields that participate in the anchored digest.
    ///
    /// Includes subject identity, program descriptor, issuing institution,
    /// certificate number, and graduation date. Excludes status,
    /// bookkeeping timestamps, the verification code (a lookup key, not
    /// trust content), and free-form metadata — changing any of those must
    /// not change the digest.
    pub fn canonical_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "institution_id": self.institution_id.as_uuid(),
            "certificate_number": self.certificate_number.as_str(),
            "subject": {
                "full_name": self.subject.full_name,
                "student_number": self.subject.student_number,
                "national_id": self.subject.national_id,
                "date_of_birth": self.subject.date_of_birth,
            },
            "program": {
                "name": self.program.name,
                "program_type": self.program.program_type,
                "honors": self.program.honors,
                "final_score": self.program.final_score,
            },
            "graduated_on": self.graduated_on,
        })
    }

    /// Compute the content digest of the canonical payload.
    pub fn digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        let canonical = CanonicalBytes::from_value(self.canonical_payload())?;
        Ok(sha256_digest(&canonical))
    }

    /// Record a status transition.
    fn do_transition(&mut self, to: CredentialStatus, reason: &str) {
        let now = Timestamp::now();
        self.transitions.push(StatusTransition {
            from_status: self.status,
            to_status: to,
            timestamp: now,
            reason: reason.to_string(),
        });
        self.status = to;
        self.updated_at = now;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_credential() -> Credential {
        Credential::new(
            InstitutionId::new(),
            CertificateNumber::compose("UOA", 2026, 1),
            VerificationCode::mint(),
            Subject {
                full_name: "Amina Diallo".to_string(),
                student_number: Some("S-2020-1187".to_string()),
                national_id: None,
                date_of_birth: NaiveDate::from_ymd_opt(1999, 4, 12).unwrap(),
            },
            Program {
                name: "BSc Computer Science".to_string(),
                program_type: "bachelor".to_string(),
                honors: Some("First Class Honours".to_string()),
                final_score: Some("78.5".to_string()),
            },
            NaiveDate::from_ymd_opt(2020, 9, 1),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            serde_json::json!({}),
        )
    }

    // ── Status machine ───────────────────────────────────────────────

    #[test]
    fn new_credential_is_issued() {
        let c = sample_credential();
        assert_eq!(c.status, CredentialStatus::Issued);
        assert!(c.revocation.is_none());
        assert!(c.transitions.is_empty());
    }

    #[test]
    fn issued_to_pending_to_anchored() {
        let mut c = sample_credential();
        c.begin_anchoring("anchor submission").unwrap();
        assert_eq!(c.status, CredentialStatus::PendingAnchor);
        c.mark_anchored("ledger receipt tx-1").unwrap();
        assert_eq!(c.status, CredentialStatus::Anchored);
        assert_eq!(c.transitions.len(), 2);
    }

    #[test]
    fn retry_does_not_duplicate_pending_transition() {
        let mut c = sample_credential();
        c.begin_anchoring("first attempt").unwrap();
        c.begin_anchoring("retry").unwrap();
        assert_eq!(c.status, CredentialStatus::PendingAnchor);
        assert_eq!(c.transitions.len(), 1);
    }

    #[test]
    fn rejected_submission_returns_to_issued() {
        let mut c = sample_credential();
        c.begin_anchoring("anchor submission").unwrap();
        c.clear_pending("ledger rejected payload").unwrap();
        assert_eq!(c.status, CredentialStatus::Issued);
    }

    #[test]
    fn cannot_anchor_without_pending() {
        let mut c = sample_credential();
        assert!(c.mark_anchored("no attempt started").is_err());
    }

    #[test]
    fn cannot_begin_anchoring_when_anchored() {
        let mut c = sample_credential();
        c.begin_anchoring("a").unwrap();
        c.mark_anchored("b").unwrap();
        assert!(c.begin_anchoring("again").is_err());
    }

    #[test]
    fn revoke_from_any_live_state() {
        let setups: [fn(&mut Credential); 3] = [
            |_c| {},
            |c| c.begin_anchoring("a").unwrap(),
            |c| {
                c.begin_anchoring("a").unwrap();
                c.mark_anchored("b").unwrap();
            },
        ];
        for setup in setups {
            let mut c = sample_credential();
            setup(&mut c);
            c.revoke("administrative error", "registrar@uoa").unwrap();
            assert_eq!(c.status, CredentialStatus::Revoked);
            let rev = c.revocation.as_ref().unwrap();
            assert_eq!(rev.reason, "administrative error");
            assert_eq!(rev.revoked_by, "registrar@uoa");
        }
    }

    #[test]
    fn double_revoke_is_rejected_at_record_level() {
        // Idempotent success lives in the lifecycle manager; the record
        // itself refuses the second transition.
        let mut c = sample_credential();
        c.revoke("first", "registrar@uoa").unwrap();
        assert!(c.revoke("second", "registrar@uoa").is_err());
    }

    #[test]
    fn cannot_anchor_revoked_credential() {
        let mut c = sample_credential();
        c.revoke("gone", "registrar@uoa").unwrap();
        assert!(c.begin_anchoring("too late").is_err());
    }

    // ── Canonical payload / digest ───────────────────────────────────

    #[test]
    fn digest_is_deterministic() {
        let c = sample_credential();
        assert_eq!(c.digest().unwrap(), c.digest().unwrap());
    }

    #[test]
    fn trust_field_change_changes_digest() {
        let c = sample_credential();
        let original = c.digest().unwrap();

        let mut renamed = c.clone();
        renamed.subject.full_name = "Amina Dialo".to_string();
        assert_ne!(renamed.digest().unwrap(), original);

        let mut rescored = c.clone();
        rescored.program.final_score = Some("91.0".to_string());
        assert_ne!(rescored.digest().unwrap(), original);

        let mut redated = c.clone();
        redated.graduated_on = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert_ne!(redated.digest().unwrap(), original);
    }

    #[test]
    fn excluded_field_change_does_not_change_digest() {
        let c = sample_credential();
        let original = c.digest().unwrap();

        let mut mutated = c.clone();
        mutated.status = CredentialStatus::Anchored;
        mutated.metadata = serde_json::json!({"printed": true});
        mutated.updated_at = Timestamp::now();
        assert_eq!(mutated.digest().unwrap(), original);
    }

    #[test]
    fn revocation_does_not_change_digest() {
        let c = sample_credential();
        let original = c.digest().unwrap();
        let mut revoked = c.clone();
        revoked.revoke("data entry error", "registrar@uoa").unwrap();
        assert_eq!(revoked.digest().unwrap(), original);
    }

    #[test]
    fn canonical_payload_excludes_verification_code() {
        let c = sample_credential();
        let payload = serde_json::to_string(&c.canonical_payload()).unwrap();
        assert!(!payload.contains(c.verification_code.as_str()));
    }

    #[test]
    fn status_display() {
        assert_eq!(CredentialStatus::Issued.to_string(), "ISSUED");
        assert_eq!(CredentialStatus::PendingAnchor.to_string(), "PENDING_ANCHOR");
        assert_eq!(CredentialStatus::Anchored.to_string(), "ANCHORED");
        assert_eq!(CredentialStatus::Revoked.to_string(), "REVOKED");
    }

    #[test]
    fn serde_roundtrip() {
        let c = sample_credential();
        let json = serde_json::to_string(&c).unwrap();
        let parsed: Credential = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, c.id);
        assert_eq!(parsed.status, c.status);
        assert_eq!(parsed.digest().unwrap(), c.digest().unwrap());
    }
}
