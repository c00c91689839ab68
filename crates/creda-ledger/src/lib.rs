//! # creda-ledger — Ledger Gateway Boundary
//!
//! The registry anchors credential digests to an external append-only
//! ledger, but never embeds ledger-specific semantics beyond three calls:
//! submit a transaction, fetch a transaction, report network status. This
//! crate is that boundary.
//!
//! ## Adapters
//!
//! - [`HttpLedger`] — REST adapter against a ledger node
//!   (`POST /transactions`, `GET /transactions/{id}`, `GET /status`).
//! - [`MockLedger`] — deterministic in-process ledger for development and
//!   tests, with scriptable failure modes for exercising the
//!   unavailable/rejected/timeout paths.
//!
//! Both are dispatched through the [`LedgerClient`] enum. No adapter
//! outside this crate can be wired in; the set of ways a digest reaches
//! the ledger is closed and auditable.
//!
//! ## What this crate does NOT do
//!
//! At-most-once anchoring per credential is enforced by the anchor store
//! and lifecycle manager, not here. Submitting the same digest twice is
//! always safe to attempt.

pub mod anchor_ref;
pub mod gateway;
pub mod http;
pub mod mock;

pub use anchor_ref::AnchorRef;
pub use gateway::{
    AnchorSubmission, LedgerClient, LedgerError, NetworkStatus, SubmitReceipt, TransactionDetails,
};
pub use http::HttpLedger;
pub use mock::{FailureMode, MockLedger};
