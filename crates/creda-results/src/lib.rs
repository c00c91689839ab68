//! # creda-results — Academic Result Ledger
//!
//! Per-course score submission with deterministic grade derivation and an
//! approval workflow gating visibility. Independent of the credential
//! lifecycle, but feeds it: a credential's program data (final score,
//! honors) is drawn from published results.
//!
//! ## Components
//!
//! - [`grade`] — the total, deterministic step function from a raw score
//!   to a letter grade and grade point.
//! - [`result`] — the result row and its
//!   `PENDING → APPROVED → PUBLISHED` / `DISPUTED` status machine.
//! - [`ledger`] — the keyed upsert store and the batched transition
//!   operation with per-id reporting.

pub mod grade;
pub mod ledger;
pub mod result;

pub use grade::Grade;
pub use ledger::{BatchOutcome, CourseDirectory, ResultError, ResultLedger, SubmitResult};
pub use result::{AcademicResult, ResultKey, ResultStatus, ResultTransition, TransitionAction};
