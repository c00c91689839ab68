//! # In-Memory Stores
//!
//! The credential and anchor stores are the only shared mutable state in
//! the subsystem. Uniqueness constraints (certificate number and
//! verification code per credential, at-most-one current anchor per
//! credential) are enforced inside a single write-lock section — a
//! conditional insert, not an application-level check-then-write.
//!
//! Durable persistence is a write-through concern layered on at the API
//! boundary; these stores are the authoritative working set.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use creda_core::{ContentDigest, CredentialId, InstitutionId, Timestamp};
use creda_ledger::AnchorRef;

use crate::attempt::VerificationAttempt;
use crate::credential::Credential;

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A credential with this certificate number already exists.
    #[error("duplicate certificate number: {0}")]
    DuplicateCertificateNumber(String),

    /// A credential with this verification code already exists.
    #[error("duplicate verification code: {0}")]
    DuplicateVerificationCode(String),

    /// No credential with the given id.
    #[error("credential not found: {0}")]
    NotFound(CredentialId),

    /// The bounded attempt log is full.
    #[error("verification attempt log is at capacity ({capacity})")]
    AttemptLogFull {
        /// Configured capacity.
        capacity: usize,
    },
}

// ─── Credential store ────────────────────────────────────────────────

#[derive(Default)]
struct CredentialIndex {
    by_id: HashMap<CredentialId, Credential>,
    by_certificate: HashMap<String, CredentialId>,
    by_code: HashMap<String, CredentialId>,
    sequences: HashMap<InstitutionId, u64>,
}

/// Credential rows with unique indexes on certificate number and
/// verification code, plus the per-institution issuance sequence.
#[derive(Default)]
pub struct CredentialStore {
    inner: RwLock<CredentialIndex>,
}

impl CredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next certificate sequence value for an institution.
    pub fn next_sequence(&self, institution: &InstitutionId) -> u64 {
        let mut inner = self.inner.write();
        let seq = inner.sequences.entry(*institution).or_insert(0);
        *seq += 1;
        *seq
    }

    /// Insert a new credential, enforcing both unique indexes atomically.
    pub fn insert(&self, credential: Credential) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let cert_key = credential.certificate_number.as_str().to_string();
        let code_key = credential.verification_code.as_str().to_string();

        if inner.by_certificate.contains_key(&cert_key) {
            return Err(StoreError::DuplicateCertificateNumber(cert_key));
        }
        if inner.by_code.contains_key(&code_key) {
            return Err(StoreError::DuplicateVerificationCode(code_key));
        }

        inner.by_certificate.insert(cert_key, credential.id);
        inner.by_code.insert(code_key, credential.id);
        inner.by_id.insert(credential.id, credential);
        Ok(())
    }

    /// Fetch a credential by id.
    pub fn get(&self, id: &CredentialId) -> Option<Credential> {
        self.inner.read().by_id.get(id).cloned()
    }

    /// Fetch a credential by certificate number.
    pub fn find_by_certificate_number(&self, number: &str) -> Option<Credential> {
        let inner = self.inner.read();
        let id = inner.by_certificate.get(number)?;
        inner.by_id.get(id).cloned()
    }

    /// Fetch a credential by verification code.
    pub fn find_by_verification_code(&self, code: &str) -> Option<Credential> {
        let inner = self.inner.read();
        let id = inner.by_code.get(code)?;
        inner.by_id.get(id).cloned()
    }

    /// Mutate a credential in place under the write lock.
    ///
    /// The closure's return value is passed through, so callers can both
    /// transition the record and extract a snapshot in one lock section.
    pub fn update<R>(
        &self,
        id: &CredentialId,
        f: impl FnOnce(&mut Credential) -> R,
    ) -> Result<R, StoreError> {
        let mut inner = self.inner.write();
        let credential = inner.by_id.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        Ok(f(credential))
    }

    /// Number of stored credentials.
    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of credentials currently in the given status.
    ///
    /// Used by the anchoring retry sweep to find `PendingAnchor` rows.
    pub fn ids_with_status(&self, status: crate::credential::CredentialStatus) -> Vec<CredentialId> {
        self.inner
            .read()
            .by_id
            .values()
            .filter(|c| c.status == status)
            .map(|c| c.id)
            .collect()
    }

    /// Credential counts per status string, for the metrics scrape.
    pub fn status_counts(&self) -> HashMap<&'static str, usize> {
        let inner = self.inner.read();
        let mut counts = HashMap::new();
        for credential in inner.by_id.values() {
            *counts.entry(credential.status.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

// ─── Anchor store ────────────────────────────────────────────────────

/// The ledger-side commitment for a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    /// The anchored credential.
    pub credential_id: CredentialId,
    /// Digest of the canonical payload at anchoring time.
    pub digest: ContentDigest,
    /// Explorer-linkable `{network}:{transactionId}:{blockHeight}` reference.
    pub reference: AnchorRef,
    /// When the anchor row was written.
    pub created_at: Timestamp,
}

/// Result of recording an anchor.
#[derive(Debug, Clone)]
pub enum Recorded {
    /// A new anchor row was written.
    New(Anchor),
    /// The current anchor already carries this digest; nothing was written.
    Existing(Anchor),
}

impl Recorded {
    /// The anchor, whether freshly written or pre-existing.
    pub fn into_anchor(self) -> Anchor {
        match self {
            Self::New(a) | Self::Existing(a) => a,
        }
    }

    /// Whether a new row was written.
    pub fn is_new(&self) -> bool {
        matches!(self, Self::New(_))
    }
}

/// Per-credential anchor history. The latest entry is the current anchor;
/// history is retained for audit and never deleted.
#[derive(Default)]
pub struct AnchorStore {
    inner: RwLock<HashMap<CredentialId, Vec<Anchor>>>,
}

impl AnchorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an anchor, idempotently.
    ///
    /// If the credential's current anchor already carries the same digest
    /// the existing row is returned and nothing is written — a retried
    /// anchoring attempt never produces a second row for the same payload.
    pub fn record(&self, anchor: Anchor) -> Recorded {
        let mut inner = self.inner.write();
        let history = inner.entry(anchor.credential_id).or_default();
        if let Some(current) = history.last() {
            if current.digest == anchor.digest {
                return Recorded::Existing(current.clone());
            }
        }
        history.push(anchor.clone());
        Recorded::New(anchor)
    }

    /// The current (latest) anchor for a credential.
    pub fn current(&self, id: &CredentialId) -> Option<Anchor> {
        self.inner.read().get(id).and_then(|h| h.last().cloned())
    }

    /// Full anchor history for a credential, oldest first.
    pub fn history(&self, id: &CredentialId) -> Vec<Anchor> {
        self.inner.read().get(id).cloned().unwrap_or_default()
    }

    /// Total anchor rows across all credentials.
    pub fn len(&self) -> usize {
        self.inner.read().values().map(Vec::len).sum()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── Attempt store ───────────────────────────────────────────────────

/// Append-only, bounded log of verification attempts.
///
/// The bound protects the process from an unmetered public endpoint
/// filling memory; hitting it degrades audit coverage, never the
/// verification responses themselves.
pub struct AttemptStore {
    inner: RwLock<Vec<VerificationAttempt>>,
    capacity: usize,
}

impl AttemptStore {
    /// Default capacity of the in-memory attempt log.
    pub const DEFAULT_CAPACITY: usize = 100_000;

    /// Create a log with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a log bounded at `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Vec::new()),
            capacity,
        }
    }

    /// Append an attempt record.
    pub fn append(&self, attempt: VerificationAttempt) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.len() >= self.capacity {
            return Err(StoreError::AttemptLogFull {
                capacity: self.capacity,
            });
        }
        inner.push(attempt);
        Ok(())
    }

    /// Number of recorded attempts.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of recorded attempts, oldest first.
    pub fn snapshot(&self) -> Vec<VerificationAttempt> {
        self.inner.read().clone()
    }

    /// Attempt counts per outcome string, for the metrics scrape.
    pub fn outcome_counts(&self) -> HashMap<&'static str, usize> {
        let inner = self.inner.read();
        let mut counts = HashMap::new();
        for attempt in inner.iter() {
            *counts.entry(attempt.outcome.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

impl Default for AttemptStore {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempt::{LookupKind, RequesterInfo};
    use crate::credential::{Program, Subject};
    use crate::verify::VerificationStatus;
    use chrono::NaiveDate;
    use creda_core::{CertificateNumber, VerificationCode};

    fn credential_with(cert: &str, code: &str) -> Credential {
        Credential::new(
            InstitutionId::new(),
            CertificateNumber::parse(cert).unwrap(),
            VerificationCode::parse(code).unwrap(),
            Subject {
                full_name: "Test Holder".to_string(),
                student_number: None,
                national_id: None,
                date_of_birth: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            },
            Program {
                name: "BSc Mathematics".to_string(),
                program_type: "bachelor".to_string(),
                honors: None,
                final_score: None,
            },
            None,
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            serde_json::json!({}),
        )
    }

    fn anchor_for(credential: &Credential, height: u64) -> Anchor {
        Anchor {
            credential_id: credential.id,
            digest: credential.digest().unwrap(),
            reference: AnchorRef::new("mock", format!("tx-{height}"), height),
            created_at: Timestamp::now(),
        }
    }

    // ── CredentialStore ──────────────────────────────────────────────

    #[test]
    fn insert_and_lookup_by_all_keys() {
        let store = CredentialStore::new();
        let c = credential_with("UOA-2026-00001", "VC-AAAAAAAAAA");
        let id = c.id;
        store.insert(c).unwrap();

        assert_eq!(store.get(&id).unwrap().id, id);
        assert_eq!(
            store
                .find_by_certificate_number("UOA-2026-00001")
                .unwrap()
                .id,
            id
        );
        assert_eq!(
            store.find_by_verification_code("VC-AAAAAAAAAA").unwrap().id,
            id
        );
    }

    #[test]
    fn duplicate_certificate_number_rejected() {
        let store = CredentialStore::new();
        store
            .insert(credential_with("UOA-2026-00001", "VC-AAAAAAAAAA"))
            .unwrap();
        let err = store
            .insert(credential_with("UOA-2026-00001", "VC-BBBBBBBBBB"))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCertificateNumber(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_verification_code_rejected() {
        let store = CredentialStore::new();
        store
            .insert(credential_with("UOA-2026-00001", "VC-AAAAAAAAAA"))
            .unwrap();
        let err = store
            .insert(credential_with("UOA-2026-00002", "VC-AAAAAAAAAA"))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateVerificationCode(_)));
    }

    #[test]
    fn rejected_insert_leaves_no_index_residue() {
        let store = CredentialStore::new();
        store
            .insert(credential_with("UOA-2026-00001", "VC-AAAAAAAAAA"))
            .unwrap();
        let _ = store.insert(credential_with("UOA-2026-00001", "VC-BBBBBBBBBB"));
        // The failed row's verification code must not resolve.
        assert!(store.find_by_verification_code("VC-BBBBBBBBBB").is_none());
    }

    #[test]
    fn sequences_are_per_institution() {
        let store = CredentialStore::new();
        let a = InstitutionId::new();
        let b = InstitutionId::new();
        assert_eq!(store.next_sequence(&a), 1);
        assert_eq!(store.next_sequence(&a), 2);
        assert_eq!(store.next_sequence(&b), 1);
    }

    #[test]
    fn update_mutates_in_place() {
        let store = CredentialStore::new();
        let c = credential_with("UOA-2026-00001", "VC-AAAAAAAAAA");
        let id = c.id;
        store.insert(c).unwrap();

        store
            .update(&id, |c| c.begin_anchoring("attempt").unwrap())
            .unwrap();
        assert_eq!(
            store.get(&id).unwrap().status,
            crate::credential::CredentialStatus::PendingAnchor
        );
    }

    #[test]
    fn update_missing_is_not_found() {
        let store = CredentialStore::new();
        let err = store.update(&CredentialId::new(), |_| ()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn status_counts_reflect_store() {
        let store = CredentialStore::new();
        store
            .insert(credential_with("UOA-2026-00001", "VC-AAAAAAAAAA"))
            .unwrap();
        store
            .insert(credential_with("UOA-2026-00002", "VC-BBBBBBBBBB"))
            .unwrap();
        let counts = store.status_counts();
        assert_eq!(counts.get("ISSUED"), Some(&2));
    }

    // ── AnchorStore ──────────────────────────────────────────────────

    #[test]
    fn record_then_current() {
        let store = AnchorStore::new();
        let c = credential_with("UOA-2026-00001", "VC-AAAAAAAAAA");
        let recorded = store.record(anchor_for(&c, 1));
        assert!(recorded.is_new());
        assert_eq!(store.current(&c.id).unwrap().reference.block_height, 1);
    }

    #[test]
    fn same_digest_recorded_once() {
        let store = AnchorStore::new();
        let c = credential_with("UOA-2026-00001", "VC-AAAAAAAAAA");
        store.record(anchor_for(&c, 1));
        let second = store.record(anchor_for(&c, 2));
        assert!(!second.is_new());
        // The original row survives; the retry's receipt is discarded.
        assert_eq!(second.into_anchor().reference.block_height, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn changed_digest_appends_history() {
        let store = AnchorStore::new();
        let mut c = credential_with("UOA-2026-00001", "VC-AAAAAAAAAA");
        store.record(anchor_for(&c, 1));
        c.subject.full_name = "Corrected Name".to_string();
        store.record(anchor_for(&c, 2));

        assert_eq!(store.history(&c.id).len(), 2);
        assert_eq!(store.current(&c.id).unwrap().reference.block_height, 2);
    }

    #[test]
    fn missing_credential_has_no_anchor() {
        let store = AnchorStore::new();
        assert!(store.current(&CredentialId::new()).is_none());
        assert!(store.history(&CredentialId::new()).is_empty());
    }

    // ── AttemptStore ─────────────────────────────────────────────────

    fn sample_attempt() -> VerificationAttempt {
        VerificationAttempt::record(
            LookupKind::VerificationCode,
            "VC-AAAAAAAAAA",
            VerificationStatus::NotFound,
            RequesterInfo::default(),
        )
    }

    #[test]
    fn append_and_snapshot() {
        let store = AttemptStore::new();
        store.append(sample_attempt()).unwrap();
        store.append(sample_attempt()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn capacity_bound_enforced() {
        let store = AttemptStore::with_capacity(1);
        store.append(sample_attempt()).unwrap();
        let err = store.append(sample_attempt()).unwrap_err();
        assert!(matches!(err, StoreError::AttemptLogFull { capacity: 1 }));
        assert_eq!(store.len(), 1);
    }
}
