//! # Verification Engine
//!
//! The public read path. Resolves a credential by exactly one of its two
//! lookup keys, reconciles local status with the ledger anchor, and
//! returns a structured outcome — never an exception for "not found" or
//! "tampered", which are first-class answers to a legitimate question.
//!
//! ## Decision table
//!
//! | Status              | Anchor digest matches payload | Outcome                  |
//! |---------------------|-------------------------------|--------------------------|
//! | REVOKED             | any                           | INVALID (revoked)        |
//! | ANCHORED            | yes                           | VALID                    |
//! | ANCHORED            | no / missing                  | INVALID (tampered)       |
//! | ISSUED / PENDING    | n/a                           | UNCONFIRMED              |
//! | —                   | —                             | NOT_FOUND                |
//!
//! The engine never blocks on ledger writes. A live ledger read may
//! enrich a VALID outcome but can never downgrade it: if the ledger is
//! momentarily unreachable the response degrades to "locally anchored,
//! ledger unreachable for live confirmation".

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use creda_core::{CertificateNumber, InstitutionId, Timestamp, ValidationError, VerificationCode};
use creda_ledger::{LedgerClient, LedgerError};

use crate::attempt::{LookupKind, RequesterInfo, VerificationAttempt};
use crate::credential::{Credential, CredentialStatus};
use crate::store::{Anchor, AnchorStore, AttemptStore, CredentialStore};

// ─── Lookup ──────────────────────────────────────────────────────────

/// A verification lookup: exactly one of the two public keys.
///
/// The sum type is built at the boundary via [`CredentialLookup::from_parts`],
/// which rejects requests carrying both keys or neither — downstream code
/// never re-checks field presence.
#[derive(Debug, Clone)]
pub enum CredentialLookup {
    /// By opaque verification code.
    ByVerificationCode(VerificationCode),
    /// By human-readable certificate number.
    ByCertificateNumber(CertificateNumber),
}

impl CredentialLookup {
    /// Build a lookup from optional request fields, enforcing that exactly
    /// one was supplied.
    pub fn from_parts(
        verification_code: Option<String>,
        certificate_number: Option<String>,
    ) -> Result<Self, ValidationError> {
        match (verification_code, certificate_number) {
            (Some(code), None) => Ok(Self::ByVerificationCode(VerificationCode::parse(&code)?)),
            (None, Some(number)) => Ok(Self::ByCertificateNumber(CertificateNumber::parse(
                &number,
            )?)),
            _ => Err(ValidationError::AmbiguousLookup),
        }
    }

    /// The key kind, for the attempt log.
    pub fn kind(&self) -> LookupKind {
        match self {
            Self::ByVerificationCode(_) => LookupKind::VerificationCode,
            Self::ByCertificateNumber(_) => LookupKind::CertificateNumber,
        }
    }

    /// The key value as presented.
    pub fn value(&self) -> &str {
        match self {
            Self::ByVerificationCode(code) => code.as_str(),
            Self::ByCertificateNumber(number) => number.as_str(),
        }
    }
}

// ─── Report ──────────────────────────────────────────────────────────

/// The verification outcome category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    /// Anchored and the recomputed digest matches the ledger commitment.
    Valid,
    /// Revoked, tampered, or otherwise not to be trusted.
    Invalid,
    /// Issued but not yet anchored — not invalid, not fully valid.
    Unconfirmed,
    /// No credential matched the lookup key.
    NotFound,
}

impl VerificationStatus {
    /// Whether this outcome means the credential should be trusted.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// String form used in responses, persistence, and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
            Self::Unconfirmed => "UNCONFIRMED",
            Self::NotFound => "NOT_FOUND",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public summary of the credential, returned on any outcome that
/// resolved one. Excludes the holder's date of birth and identifiers
/// beyond what the printed document already shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSummary {
    /// Certificate number as printed.
    pub certificate_number: String,
    /// Issuing institution.
    pub institution_id: InstitutionId,
    /// Holder name.
    pub holder_name: String,
    /// Program name.
    pub program_name: String,
    /// Program type.
    pub program_type: String,
    /// Class/grade honor, if any.
    pub honors: Option<String>,
    /// Graduation date.
    pub graduated_on: NaiveDate,
    /// Credential lifecycle status string.
    pub status: String,
}

impl CredentialSummary {
    fn from_credential(credential: &Credential) -> Self {
        Self {
            certificate_number: credential.certificate_number.as_str().to_string(),
            institution_id: credential.institution_id,
            holder_name: credential.subject.full_name.clone(),
            program_name: credential.program.name.clone(),
            program_type: credential.program.program_type.clone(),
            honors: credential.program.honors.clone(),
            graduated_on: credential.graduated_on,
            status: credential.status.to_string(),
        }
    }
}

/// Anchor details included with VALID (and tampered-INVALID) outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorDetails {
    /// `{network}:{transactionId}:{blockHeight}` explorer reference.
    pub reference: String,
    /// Ledger transaction identifier.
    pub transaction_id: String,
    /// Height of the including block/slot.
    pub block_height: u64,
    /// Network identifier.
    pub network: String,
    /// Live ledger confirmation: `Some(true)` when the transaction was
    /// fetched and carries the expected digest, `Some(false)` when the
    /// ledger answered but could not confirm, `None` when the ledger was
    /// unreachable.
    pub ledger_confirmed: Option<bool>,
    /// Free-text note about the live confirmation outcome.
    pub ledger_note: Option<String>,
}

impl AnchorDetails {
    fn from_anchor(anchor: &Anchor) -> Self {
        Self {
            reference: anchor.reference.to_string(),
            transaction_id: anchor.reference.transaction_id.clone(),
            block_height: anchor.reference.block_height,
            network: anchor.reference.network.clone(),
            ledger_confirmed: None,
            ledger_note: None,
        }
    }
}

/// The structured verification outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Outcome category.
    pub status: VerificationStatus,
    /// Convenience flag, true only for `Valid`.
    pub valid: bool,
    /// Human-readable reason for non-valid outcomes.
    pub reason: Option<String>,
    /// Credential summary, when a credential was resolved.
    pub credential: Option<CredentialSummary>,
    /// Anchor details, when an anchor exists.
    pub anchor: Option<AnchorDetails>,
    /// When the check was performed.
    pub checked_at: Timestamp,
}

impl VerificationReport {
    fn outcome(status: VerificationStatus) -> Self {
        Self {
            status,
            valid: status.is_valid(),
            reason: None,
            credential: None,
            anchor: None,
            checked_at: Timestamp::now(),
        }
    }

    fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    fn with_credential(mut self, credential: &Credential) -> Self {
        self.credential = Some(CredentialSummary::from_credential(credential));
        self
    }

    fn with_anchor(mut self, anchor: AnchorDetails) -> Self {
        self.anchor = Some(anchor);
        self
    }
}

// ─── Engine ──────────────────────────────────────────────────────────

/// The verification read path.
///
/// Read-only with respect to credential and anchor state; write-only
/// with respect to the attempt log.
pub struct VerificationEngine {
    credentials: Arc<CredentialStore>,
    anchors: Arc<AnchorStore>,
    attempts: Arc<AttemptStore>,
    ledger: Arc<LedgerClient>,
    /// Deadline for the best-effort live ledger read.
    fetch_timeout: Duration,
}

impl VerificationEngine {
    /// Construct an engine over the given stores and ledger client.
    pub fn new(
        credentials: Arc<CredentialStore>,
        anchors: Arc<AnchorStore>,
        attempts: Arc<AttemptStore>,
        ledger: Arc<LedgerClient>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            credentials,
            anchors,
            attempts,
            ledger,
            fetch_timeout,
        }
    }

    /// Verify a credential and log the attempt.
    ///
    /// Always returns a report; the attempt log write happens for every
    /// outcome (including `NotFound`, for abuse monitoring) and its
    /// failure is logged rather than surfaced.
    pub async fn verify(
        &self,
        lookup: CredentialLookup,
        requester: RequesterInfo,
    ) -> VerificationReport {
        let report = self.evaluate(&lookup).await;
        self.log_attempt(&lookup, report.status, requester);
        report
    }

    async fn evaluate(&self, lookup: &CredentialLookup) -> VerificationReport {
        let credential = match lookup {
            CredentialLookup::ByVerificationCode(code) => {
                self.credentials.find_by_verification_code(code.as_str())
            }
            CredentialLookup::ByCertificateNumber(number) => {
                self.credentials.find_by_certificate_number(number.as_str())
            }
        };

        let Some(credential) = credential else {
            return VerificationReport::outcome(VerificationStatus::NotFound)
                .with_reason("no credential matches the supplied key");
        };

        match credential.status {
            CredentialStatus::Revoked => {
                let reason = credential
                    .revocation
                    .as_ref()
                    .map(|r| format!("revoked: {}", r.reason))
                    .unwrap_or_else(|| "revoked".to_string());
                let mut report = VerificationReport::outcome(VerificationStatus::Invalid)
                    .with_reason(reason)
                    .with_credential(&credential);
                // The anchor is reported even for revoked credentials;
                // ledger history is immutable and auditors want the link.
                if let Some(anchor) = self.anchors.current(&credential.id) {
                    report = report.with_anchor(AnchorDetails::from_anchor(&anchor));
                }
                report
            }
            CredentialStatus::Issued | CredentialStatus::PendingAnchor => {
                VerificationReport::outcome(VerificationStatus::Unconfirmed)
                    .with_reason("pending anchoring; the institution record is not yet ledger-confirmed")
                    .with_credential(&credential)
            }
            CredentialStatus::Anchored => self.evaluate_anchored(&credential).await,
        }
    }

    async fn evaluate_anchored(&self, credential: &Credential) -> VerificationReport {
        let Some(anchor) = self.anchors.current(&credential.id) else {
            // Status says anchored but no anchor row exists: the record
            // pair is inconsistent, which is indistinguishable from
            // tampering for a verifier.
            tracing::error!(
                credential_id = %credential.id,
                "credential is ANCHORED but has no anchor row"
            );
            return VerificationReport::outcome(VerificationStatus::Invalid)
                .with_reason("tampered: no ledger anchor found for an anchored credential")
                .with_credential(credential);
        };

        let recomputed = match credential.digest() {
            Ok(digest) => digest,
            Err(e) => {
                tracing::error!(
                    credential_id = %credential.id,
                    error = %e,
                    "digest recomputation failed"
                );
                return VerificationReport::outcome(VerificationStatus::Invalid)
                    .with_reason("tampered: stored payload cannot be canonicalized")
                    .with_credential(credential);
            }
        };

        if recomputed != anchor.digest {
            return VerificationReport::outcome(VerificationStatus::Invalid)
                .with_reason("tampered: payload digest does not match the ledger anchor")
                .with_credential(credential)
                .with_anchor(AnchorDetails::from_anchor(&anchor));
        }

        let details = self.enrich_from_ledger(&anchor).await;
        VerificationReport::outcome(VerificationStatus::Valid)
            .with_credential(credential)
            .with_anchor(details)
    }

    /// Best-effort live ledger read. Can annotate, never downgrade.
    async fn enrich_from_ledger(&self, anchor: &Anchor) -> AnchorDetails {
        let mut details = AnchorDetails::from_anchor(anchor);
        let fetch = self
            .ledger
            .fetch(&anchor.reference.transaction_id);
        match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(Ok(tx)) => {
                if tx.digest == anchor.digest.to_string() {
                    details.ledger_confirmed = Some(true);
                } else {
                    details.ledger_confirmed = Some(false);
                    details.ledger_note =
                        Some("ledger transaction found but digest differs from local anchor".to_string());
                }
            }
            Ok(Err(LedgerError::NotFound(_))) => {
                details.ledger_confirmed = Some(false);
                details.ledger_note =
                    Some("local anchor is authoritative; transaction not found on ledger".to_string());
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "live ledger confirmation unavailable");
                details.ledger_note =
                    Some("locally anchored; ledger unreachable for live confirmation".to_string());
            }
            Err(_) => {
                details.ledger_note =
                    Some("locally anchored; ledger confirmation timed out".to_string());
            }
        }
        details
    }

    fn log_attempt(
        &self,
        lookup: &CredentialLookup,
        outcome: VerificationStatus,
        requester: RequesterInfo,
    ) {
        let attempt =
            VerificationAttempt::record(lookup.kind(), lookup.value(), outcome, requester);
        if let Err(e) = self.attempts.append(attempt) {
            // Audit coverage degrades; the verification response does not.
            tracing::warn!(error = %e, "verification attempt not recorded");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
