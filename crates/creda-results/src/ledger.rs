//! # Result Ledger
//!
//! Keyed upsert store for academic results and the batched moderation
//! operation. The upsert is performed entirely inside one write-lock
//! section — the composite natural key acts as a unique index, so
//! re-submission can never create a duplicate row regardless of
//! interleaving.
//!
//! ## Batch transition contract
//!
//! `transition()` reports per id: every id either appears in `applied`
//! or in `failures` with its own error. A missing id or an invalid
//! transition never aborts the remainder of the batch and is never
//! silently dropped.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use creda_core::{CourseId, Principal, ResultId, ValidationError};

use crate::grade::Grade;
use crate::result::{AcademicResult, ResultKey, TransitionAction};

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from result ledger operations.
#[derive(Error, Debug)]
pub enum ResultError {
    /// Input validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The principal may not moderate results.
    #[error("{subject} lacks result moderation capability")]
    Forbidden {
        /// The denied principal's subject.
        subject: String,
    },

    /// No result with the given id.
    #[error("result not found: {0}")]
    NotFound(ResultId),

    /// The course is not known to the directory.
    #[error("course not found: {0}")]
    UnknownCourse(CourseId),

    /// The operation conflicts with the row's current status.
    #[error("conflict: {0}")]
    Conflict(String),
}

// ─── Course directory ────────────────────────────────────────────────

/// Lookup of a course's current credit weight.
///
/// The course catalog itself is an external collaborator; the ledger
/// only needs the credit weight at submission time, which it copies onto
/// the row and never re-derives.
#[derive(Debug, Default)]
pub struct CourseDirectory {
    credits: RwLock<HashMap<CourseId, u8>>,
}

impl CourseDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update a course's credit weight.
    pub fn register(&self, course_id: CourseId, credit_weight: u8) {
        self.credits.write().insert(course_id, credit_weight);
    }

    /// The course's current credit weight.
    pub fn credit_weight(&self, course_id: &CourseId) -> Option<u8> {
        self.credits.read().get(course_id).copied()
    }
}

// ─── Requests and outcomes ───────────────────────────────────────────

/// A result submission.
#[derive(Debug, Clone)]
pub struct SubmitResult {
    /// Natural key of the row.
    pub key: ResultKey,
    /// Raw score on the 0–100 scale.
    pub score: f64,
    /// Free-form remarks.
    pub remarks: Option<String>,
}

impl SubmitResult {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.key.academic_year.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "academic_year",
            });
        }
        if !(1..=3).contains(&self.key.semester) {
            return Err(ValidationError::invalid("semester", "must be 1, 2, or 3"));
        }
        // Score range is validated by grade derivation.
        Ok(())
    }
}

/// Per-id outcome of a batched transition.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Ids whose transition was applied.
    pub applied: Vec<ResultId>,
    /// Ids that failed, each with its own error.
    pub failures: Vec<(ResultId, ResultError)>,
}

impl BatchOutcome {
    /// Whether every id in the batch was applied.
    pub fn all_applied(&self) -> bool {
        self.failures.is_empty()
    }
}

// ─── Ledger ──────────────────────────────────────────────────────────

/// The academic result store.
pub struct ResultLedger {
    courses: Arc<CourseDirectory>,
    inner: RwLock<ResultIndex>,
}

#[derive(Default)]
struct ResultIndex {
    by_key: HashMap<ResultKey, AcademicResult>,
    by_id: HashMap<ResultId, ResultKey>,
}

impl ResultLedger {
    /// Construct a ledger over the given course directory.
    pub fn new(courses: Arc<CourseDirectory>) -> Self {
        Self {
            courses,
            inner: RwLock::new(ResultIndex::default()),
        }
    }

    /// Submit a score: insert on first sight of the key, overwrite
    /// otherwise.
    ///
    /// The first submission copies the course's current credit weight
    /// onto the row and sets status `Pending`. A resubmission overwrites
    /// score, grade, and remarks and resets status to `Pending` — an
    /// approved-then-corrected result re-enters the approval queue. A
    /// `Published` row refuses resubmission with a conflict.
    pub fn submit(&self, submission: SubmitResult) -> Result<AcademicResult, ResultError> {
        submission.validate()?;
        let grade = Grade::from_score(submission.score)?;

        let mut inner = self.inner.write();
        if let Some(existing) = inner.by_key.get_mut(&submission.key) {
            if !existing.status.accepts_resubmission() {
                return Err(ResultError::Conflict(format!(
                    "result {} is published; corrections require an unpublish workflow",
                    existing.id
                )));
            }
            existing.resubmit(submission.score, grade, submission.remarks);
            tracing::debug!(result_id = %existing.id, key = %existing.key, "result resubmitted");
            return Ok(existing.clone());
        }

        let credit_weight = self
            .courses
            .credit_weight(&submission.key.course_id)
            .ok_or(ResultError::UnknownCourse(submission.key.course_id))?;

        let result = AcademicResult::new(
            submission.key.clone(),
            submission.score,
            grade,
            credit_weight,
            submission.remarks,
        );
        inner.by_id.insert(result.id, submission.key.clone());
        inner.by_key.insert(submission.key, result.clone());
        tracing::debug!(result_id = %result.id, key = %result.key, "result created");
        Ok(result)
    }

    /// Apply one action to a batch of result ids, reporting per id.
    pub fn transition(
        &self,
        ids: &[ResultId],
        action: TransitionAction,
        approver: &Principal,
    ) -> Result<BatchOutcome, ResultError> {
        if !approver.can_moderate_results() {
            return Err(ResultError::Forbidden {
                subject: approver.subject.clone(),
            });
        }

        let mut inner = self.inner.write();
        let mut outcome = BatchOutcome {
            applied: Vec::new(),
            failures: Vec::new(),
        };

        for id in ids {
            let Some(key) = inner.by_id.get(id).cloned() else {
                outcome.failures.push((*id, ResultError::NotFound(*id)));
                continue;
            };
            // by_id and by_key are maintained together; a dangling id
            // would be a ledger bug, reported as NotFound rather than
            // poisoning the batch.
            let Some(result) = inner.by_key.get_mut(&key) else {
                outcome.failures.push((*id, ResultError::NotFound(*id)));
                continue;
            };
            match result.apply(action, &approver.subject) {
                Ok(()) => outcome.applied.push(*id),
                Err(e) => outcome
                    .failures
                    .push((*id, ResultError::Conflict(e.to_string()))),
            }
        }

        tracing::info!(
            action = %action,
            applied = outcome.applied.len(),
            failed = outcome.failures.len(),
            approver = %approver.subject,
            "result batch transition"
        );
        Ok(outcome)
    }

    /// Fetch a result by id.
    pub fn get(&self, id: &ResultId) -> Option<AcademicResult> {
        let inner = self.inner.read();
        let key = inner.by_id.get(id)?;
        inner.by_key.get(key).cloned()
    }

    /// Fetch a result by its natural key.
    pub fn get_by_key(&self, key: &ResultKey) -> Option<AcademicResult> {
        self.inner.read().by_key.get(key).cloned()
    }

    /// Number of result rows.
    pub fn len(&self) -> usize {
        self.inner.read().by_key.len()
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Result counts per status string, for the metrics scrape.
    pub fn status_counts(&self) -> HashMap<&'static str, usize> {
        let inner = self.inner.read();
        let mut counts = HashMap::new();
        for result in inner.by_key.values() {
            *counts.entry(result.status.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
