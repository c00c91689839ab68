//! # Credential Lifecycle Manager
//!
//! The sole mutator of credential/anchor state. Issuance persists the
//! credential first and then attempts anchoring, so a ledger outage can
//! never lose an issued credential — it merely leaves it retriable.
//!
//! ## Anchoring protocol
//!
//! ```text
//! digest(canonical payload) ─▶ ledger.submit ─▶ anchor row ─▶ ANCHORED
//!                                   │
//!                                   ├─ Unavailable/Timeout ─▶ PENDING_ANCHOR (retriable)
//!                                   └─ Rejected ────────────▶ ISSUED (operator action needed)
//! ```
//!
//! Anchoring attempts for one credential are serialized through a
//! per-credential async mutex: a concurrent second attempt waits for the
//! in-flight attempt and then observes its anchor row instead of
//! submitting a duplicate ledger transaction.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use dashmap::DashMap;
use thiserror::Error;

use creda_core::{
    CanonicalBytes, CanonicalizationError, CertificateNumber, CredentialId, InstitutionId,
    Principal, Timestamp, ValidationError, VerificationCode,
};
use creda_ledger::{AnchorRef, AnchorSubmission, LedgerClient, LedgerError};

use crate::credential::{Credential, CredentialStatus, Program, Subject};
use crate::store::{Anchor, AnchorStore, CredentialStore, StoreError};

/// How many fresh verification codes to mint before giving up on a
/// store-level collision. At ~50 bits per code this retry loop exists for
/// correctness, not because collisions are expected.
const CODE_MINT_ATTEMPTS: usize = 4;

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from lifecycle operations.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// The principal lacks the required capability for the institution.
    #[error("{subject} lacks {action} capability for this institution")]
    Forbidden {
        /// The denied principal's subject.
        subject: String,
        /// The capability that was required.
        action: &'static str,
    },

    /// No credential with the given id.
    #[error("credential not found: {0}")]
    NotFound(CredentialId),

    /// Input validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The operation conflicts with the credential's current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The canonical payload could not be serialized.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Credential persistence failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

// ─── Requests and outcomes ───────────────────────────────────────────

/// Issuance request payload.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    /// Holder identity.
    pub subject: Subject,
    /// Program descriptor.
    pub program: Program,
    /// Program start date, when recorded.
    pub started_on: Option<NaiveDate>,
    /// Graduation date.
    pub graduated_on: NaiveDate,
    /// Free-form institution metadata.
    pub metadata: serde_json::Value,
}

impl IssueRequest {
    /// Validate the payload before any state is touched.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.subject.full_name.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "full_name" });
        }
        if self.program.name.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "program_name",
            });
        }
        if self.program.program_type.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "program_type",
            });
        }
        if let Some(score) = &self.program.final_score {
            let parsed: f64 = score.parse().map_err(|_| {
                ValidationError::invalid("final_score", "not a decimal number")
            })?;
            if !parsed.is_finite() || !(0.0..=100.0).contains(&parsed) {
                return Err(ValidationError::invalid(
                    "final_score",
                    "must be between 0 and 100",
                ));
            }
        }
        Ok(())
    }
}

/// How the anchoring leg of an operation concluded.
#[derive(Debug, Clone)]
pub enum AnchorOutcome {
    /// Anchored; the row is current.
    Anchored(Anchor),
    /// Transient ledger failure; the credential is `PendingAnchor` and
    /// safe to retry.
    Deferred {
        /// The transient error, for operator logs and API details.
        error: String,
    },
    /// The ledger refused the submission; the credential returned to
    /// `Issued` and needs operator attention before a retry.
    Rejected {
        /// The fatal error.
        error: String,
    },
}

impl AnchorOutcome {
    /// Whether the credential ended the operation anchored.
    pub fn is_anchored(&self) -> bool {
        matches!(self, Self::Anchored(_))
    }
}

/// Result of an issuance: the persisted credential plus how its first
/// anchoring attempt went.
#[derive(Debug, Clone)]
pub struct Issuance {
    /// The issued credential (post-anchoring snapshot).
    pub credential: Credential,
    /// Outcome of the inline anchoring attempt.
    pub anchoring: AnchorOutcome,
}

// ─── Manager ─────────────────────────────────────────────────────────

/// Orchestrates issuance, anchoring, and revocation.
///
/// Constructed once at process start and shared by reference; holds no
/// global state.
pub struct LifecycleManager {
    credentials: Arc<CredentialStore>,
    anchors: Arc<AnchorStore>,
    ledger: Arc<LedgerClient>,
    /// Per-credential anchoring locks. Entries are never removed; the map
    /// is bounded by the credential count.
    anchor_locks: DashMap<CredentialId, Arc<tokio::sync::Mutex<()>>>,
    /// Certificate number prefix per institution.
    prefixes: std::collections::HashMap<InstitutionId, String>,
    /// Overall deadline for one ledger submission.
    submit_timeout: Duration,
}

impl LifecycleManager {
    /// Construct a manager over the given stores and ledger client.
    pub fn new(
        credentials: Arc<CredentialStore>,
        anchors: Arc<AnchorStore>,
        ledger: Arc<LedgerClient>,
        prefixes: std::collections::HashMap<InstitutionId, String>,
        submit_timeout: Duration,
    ) -> Self {
        Self {
            credentials,
            anchors,
            ledger,
            anchor_locks: DashMap::new(),
            prefixes,
            submit_timeout,
        }
    }

    /// Issue a credential and attempt to anchor it inline.
    ///
    /// The credential is persisted in `Issued` status before the ledger is
    /// contacted; anchoring failure downgrades to a status, never to a
    /// lost credential.
    pub async fn issue(
        &self,
        institution_id: InstitutionId,
        issuer: &Principal,
        request: IssueRequest,
    ) -> Result<Issuance, LifecycleError> {
        if !issuer.can_issue(&institution_id) {
            return Err(LifecycleError::Forbidden {
                subject: issuer.subject.clone(),
                action: "issue",
            });
        }
        request.validate()?;

        let sequence = self.credentials.next_sequence(&institution_id);
        let prefix = self
            .prefixes
            .get(&institution_id)
            .map(String::as_str)
            .unwrap_or("CRD");
        let year = Timestamp::now().as_datetime().year();
        let certificate_number = CertificateNumber::compose(prefix, year, sequence);

        let credential_id = self.insert_with_fresh_code(
            institution_id,
            certificate_number,
            &request,
        )?;

        tracing::info!(
            credential_id = %credential_id,
            institution_id = %institution_id,
            issuer = %issuer.subject,
            "credential issued"
        );

        let anchoring = self.anchor(credential_id).await?;
        let credential = self
            .credentials
            .get(&credential_id)
            .ok_or(LifecycleError::NotFound(credential_id))?;

        Ok(Issuance {
            credential,
            anchoring,
        })
    }

    /// Attempt (or re-attempt) anchoring for a credential.
    ///
    /// Serialized per credential id; a concurrent attempt waits for the
    /// in-flight one and then short-circuits on its anchor row.
    pub async fn anchor(&self, credential_id: CredentialId) -> Result<AnchorOutcome, LifecycleError> {
        let lock = self.anchor_lock(credential_id);
        let _guard = lock.lock().await;

        let credential = self
            .credentials
            .get(&credential_id)
            .ok_or(LifecycleError::NotFound(credential_id))?;

        if credential.status.is_revoked() {
            return Err(LifecycleError::Conflict(
                "revoked credentials cannot be anchored".to_string(),
            ));
        }

        let digest = credential.digest()?;

        // Idempotency: a concluded attempt for the same payload wins.
        if let Some(current) = self.anchors.current(&credential_id) {
            if current.digest == digest {
                return Ok(AnchorOutcome::Anchored(current));
            }
            if credential.status.is_anchored() {
                // The stored payload no longer matches its anchor. That is
                // the tampered state; re-anchoring here would mask it.
                return Err(LifecycleError::Conflict(
                    "current anchor does not match the stored payload".to_string(),
                ));
            }
        }

        self.credentials
            .update(&credential_id, |c| c.begin_anchoring("anchor submission"))?
            .map_err(|e| LifecycleError::Conflict(e.to_string()))?;

        let submission = AnchorSubmission {
            digest: digest.clone(),
            memo: credential.certificate_number.as_str().to_string(),
        };

        let submit_result = match tokio::time::timeout(
            self.submit_timeout,
            self.ledger.submit(&submission),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(LedgerError::Timeout {
                elapsed_ms: self.submit_timeout.as_millis() as u64,
            }),
        };

        match submit_result {
            Ok(receipt) => {
                let anchor = Anchor {
                    credential_id,
                    digest,
                    reference: AnchorRef::new(
                        self.ledger.network(),
                        receipt.transaction_id,
                        receipt.block_height,
                    ),
                    created_at: Timestamp::now(),
                };
                let recorded = self.anchors.record(anchor);
                self.credentials
                    .update(&credential_id, |c| c.mark_anchored("ledger receipt"))?
                    .map_err(|e| LifecycleError::Conflict(e.to_string()))?;
                let anchor = recorded.into_anchor();
                tracing::info!(
                    credential_id = %credential_id,
                    reference = %anchor.reference,
                    "credential anchored"
                );
                Ok(AnchorOutcome::Anchored(anchor))
            }
            Err(e) if e.is_retriable() => {
                tracing::warn!(
                    credential_id = %credential_id,
                    error = %e,
                    "anchoring deferred"
                );
                Ok(AnchorOutcome::Deferred {
                    error: e.to_string(),
                })
            }
            Err(e) => {
                self.credentials
                    .update(&credential_id, |c| c.clear_pending("ledger rejection"))?
                    .map_err(|err| LifecycleError::Conflict(err.to_string()))?;
                tracing::error!(
                    credential_id = %credential_id,
                    error = %e,
                    "anchoring rejected"
                );
                Ok(AnchorOutcome::Rejected {
                    error: e.to_string(),
                })
            }
        }
    }

    /// Revoke a credential.
    ///
    /// Idempotent: revoking an already-revoked credential is a no-op
    /// success so that client retries do not surface spurious conflicts.
    /// The anchor row is never deleted.
    pub async fn revoke(
        &self,
        credential_id: CredentialId,
        revoker: &Principal,
        reason: &str,
    ) -> Result<(), LifecycleError> {
        let credential = self
            .credentials
            .get(&credential_id)
            .ok_or(LifecycleError::NotFound(credential_id))?;

        if !revoker.can_revoke(&credential.institution_id) {
            return Err(LifecycleError::Forbidden {
                subject: revoker.subject.clone(),
                action: "revoke",
            });
        }
        if reason.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "reason" }.into());
        }

        if credential.status.is_revoked() {
            return Ok(());
        }

        let revoked_by = revoker.subject.clone();
        self.credentials
            .update(&credential_id, |c| c.revoke(reason, &revoked_by))?
            .map_err(|e| LifecycleError::Conflict(e.to_string()))?;

        tracing::info!(
            credential_id = %credential_id,
            revoker = %revoker.subject,
            reason = %reason,
            "credential revoked"
        );
        Ok(())
    }

    /// Re-attempt anchoring for every `PendingAnchor` credential.
    ///
    /// Invoked by the periodic retry sweep; per-credential serialization
    /// makes overlap with concurrent explicit retries harmless.
    pub async fn retry_pending(&self) -> usize {
        let pending = self
            .credentials
            .ids_with_status(CredentialStatus::PendingAnchor);
        let mut anchored = 0;
        for id in pending {
            match self.anchor(id).await {
                Ok(outcome) if outcome.is_anchored() => anchored += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(credential_id = %id, error = %e, "retry sweep failed");
                }
            }
        }
        anchored
    }

    /// Digest of a request's would-be canonical payload, for preview
    /// tooling. Does not persist anything.
    pub fn preview_digest(payload: &serde_json::Value) -> Result<String, CanonicalizationError> {
        let canonical = CanonicalBytes::from_value(payload.clone())?;
        Ok(creda_core::sha256_digest(&canonical).to_string())
    }

    fn anchor_lock(&self, id: CredentialId) -> Arc<tokio::sync::Mutex<()>> {
        // Clone the Arc out so the DashMap shard guard is dropped before
        // any await point.
        self.anchor_locks.entry(id).or_default().clone()
    }

    /// Insert the credential, re-minting the verification code on the
    /// (astronomically unlikely) store-level collision.
    fn insert_with_fresh_code(
        &self,
        institution_id: InstitutionId,
        certificate_number: CertificateNumber,
        request: &IssueRequest,
    ) -> Result<CredentialId, LifecycleError> {
        let mut last_err = None;
        for _ in 0..CODE_MINT_ATTEMPTS {
            let credential = Credential::new(
                institution_id,
                certificate_number.clone(),
                VerificationCode::mint(),
                request.subject.clone(),
                request.program.clone(),
                request.started_on,
                request.graduated_on,
                request.metadata.clone(),
            );
            let id = credential.id;
            match self.credentials.insert(credential) {
                Ok(()) => return Ok(id),
                Err(StoreError::DuplicateVerificationCode(code)) => {
                    tracing::warn!(code = %code, "verification code collision; re-minting");
                    last_err = Some(StoreError::DuplicateVerificationCode(code));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(last_err
            .map(LifecycleError::Store)
            .unwrap_or_else(|| LifecycleError::Conflict("code minting failed".to_string())))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
