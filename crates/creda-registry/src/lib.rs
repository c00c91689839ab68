//! # creda-registry — Credential Lifecycle and Verification
//!
//! The registry keeps two sources of truth consistent: a mutable
//! relational record (the credential row) and an immutable ledger entry
//! (the anchor). This crate owns every write to that pair and the public
//! read path that reconciles them.
//!
//! ## Components
//!
//! - [`credential`] — the credential record and its status machine
//!   (`ISSUED → PENDING_ANCHOR → ANCHORED`, `REVOKED` from any state).
//! - [`store`] — in-memory stores: credentials with unique indexes on
//!   certificate number and verification code, anchor history with
//!   idempotent recording, and the bounded verification-attempt log.
//! - [`lifecycle`] — the sole mutator of credential/anchor state:
//!   issuance, serialized anchoring, revocation.
//! - [`verify`] — the read path: lookup by exactly one public key,
//!   the verification decision table, best-effort ledger enrichment,
//!   and attempt logging that never fails the response.
//!
//! ## Write/read split
//!
//! All writes to a credential's status/anchor pair go through
//! [`lifecycle::LifecycleManager`]. [`verify::VerificationEngine`] is
//! read-only with respect to credentials and anchors, and write-only with
//! respect to the attempt log.

pub mod attempt;
pub mod credential;
pub mod lifecycle;
pub mod store;
pub mod verify;

pub use attempt::{LookupKind, RequesterInfo, VerificationAttempt};
pub use credential::{
    Credential, CredentialError, CredentialStatus, Program, Revocation, StatusTransition, Subject,
};
pub use lifecycle::{AnchorOutcome, IssueRequest, Issuance, LifecycleError, LifecycleManager};
pub use store::{Anchor, AnchorStore, AttemptStore, CredentialStore, Recorded, StoreError};
pub use verify::{
    AnchorDetails, CredentialLookup, CredentialSummary, VerificationEngine, VerificationReport,
    VerificationStatus,
};
