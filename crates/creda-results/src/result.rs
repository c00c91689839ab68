//! # Academic Result Row and Status Machine
//!
//! ## States
//!
//! ```text
//! Pending ──▶ Approved ──▶ Published (terminal)
//!    │            │
//!    └────────────┴──▶ Disputed
//! ```
//!
//! Transitions are one-directional; a disputed result re-enters the
//! workflow only through resubmission, which resets it to `Pending`.
//! There is no direct `Disputed → Published` path.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use creda_core::{CourseId, EnrollmentId, ResultId, Timestamp};

use crate::grade::Grade;

// ─── Key ─────────────────────────────────────────────────────────────

/// The natural key of a result row: one score per enrollment, course,
/// academic year, and semester.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultKey {
    /// The enrollment the score belongs to.
    pub enrollment_id: EnrollmentId,
    /// The course.
    pub course_id: CourseId,
    /// Academic year label, e.g. `"2024/2025"`.
    pub academic_year: String,
    /// Semester within the year (1-based).
    pub semester: u8,
}

impl std::fmt::Display for ResultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/s{}",
            self.enrollment_id, self.course_id, self.academic_year, self.semester
        )
    }
}

// ─── Status ──────────────────────────────────────────────────────────

/// Workflow state of a result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultStatus {
    /// Awaiting approval; not visible to students.
    Pending,
    /// Approved by the examinations office; awaiting publication.
    Approved,
    /// Published and visible. Terminal.
    Published,
    /// Disputed; exits only via resubmission (back to `Pending`).
    Disputed,
}

impl ResultStatus {
    /// Whether resubmission may overwrite a row in this state.
    pub fn accepts_resubmission(&self) -> bool {
        !matches!(self, Self::Published)
    }

    /// String form used in responses and persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Published => "PUBLISHED",
            Self::Disputed => "DISPUTED",
        }
    }
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moderation action applied to a batch of result ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    /// `Pending → Approved`.
    Approve,
    /// `Approved → Published`.
    Publish,
    /// `Pending | Approved → Disputed`.
    Dispute,
}

impl std::fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Approve => "approve",
            Self::Publish => "publish",
            Self::Dispute => "dispute",
        };
        f.write_str(s)
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from result status transitions.
#[derive(Error, Debug)]
pub enum ResultStateError {
    /// The action is not valid from the row's current status.
    #[error("invalid result transition: {from} -> {action}")]
    InvalidTransition {
        /// Current status.
        from: ResultStatus,
        /// Attempted action.
        action: TransitionAction,
    },
}

/// Record of a result status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultTransition {
    /// Status before.
    pub from_status: ResultStatus,
    /// Status after.
    pub to_status: ResultStatus,
    /// Who moderated (principal subject), or `submission` for upserts.
    pub actor: String,
    /// When the transition occurred.
    pub timestamp: Timestamp,
}

// ─── Result row ──────────────────────────────────────────────────────

/// One (enrollment, course, year, semester) score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcademicResult {
    /// Row identifier.
    pub id: ResultId,
    /// Natural key.
    pub key: ResultKey,
    /// Raw score on the 0–100 scale.
    pub score: f64,
    /// Derived letter grade.
    pub grade: Grade,
    /// Derived grade point.
    pub grade_point: f64,
    /// Credit weight, copied from the course at first submission and
    /// never re-derived afterwards.
    pub credit_weight: u8,
    /// Free-form remarks from the submitting lecturer.
    pub remarks: Option<String>,
    /// Workflow status.
    pub status: ResultStatus,
    /// Ordered log of all status transitions.
    pub transitions: Vec<ResultTransition>,
    /// Row creation time.
    pub created_at: Timestamp,
    /// Last mutation time.
    pub updated_at: Timestamp,
}

impl AcademicResult {
    /// Create a freshly submitted result in `Pending`.
    pub fn new(
        key: ResultKey,
        score: f64,
        grade: Grade,
        credit_weight: u8,
        remarks: Option<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: ResultId::new(),
            key,
            score,
            grade,
            grade_point: grade.grade_point(),
            credit_weight,
            remarks,
            status: ResultStatus::Pending,
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite score, grade, and remarks on resubmission, resetting the
    /// workflow to `Pending`. The credit weight is deliberately untouched.
    pub fn resubmit(&mut self, score: f64, grade: Grade, remarks: Option<String>) {
        self.score = score;
        self.grade = grade;
        self.grade_point = grade.grade_point();
        self.remarks = remarks;
        if self.status != ResultStatus::Pending {
            self.do_transition(ResultStatus::Pending, "submission");
        } else {
            self.updated_at = Timestamp::now();
        }
    }

    /// Apply a moderation action.
    pub fn apply(&mut self, action: TransitionAction, actor: &str) -> Result<(), ResultStateError> {
        let to = match (self.status, action) {
            (ResultStatus::Pending, TransitionAction::Approve) => ResultStatus::Approved,
            (ResultStatus::Approved, TransitionAction::Publish) => ResultStatus::Published,
            (ResultStatus::Pending | ResultStatus::Approved, TransitionAction::Dispute) => {
                ResultStatus::Disputed
            }
            (from, action) => return Err(ResultStateError::InvalidTransition { from, action }),
        };
        self.do_transition(to, actor);
        Ok(())
    }

    fn do_transition(&mut self, to: ResultStatus, actor: &str) {
        let now = Timestamp::now();
        self.transitions.push(ResultTransition {
            from_status: self.status,
            to_status: to,
            actor: actor.to_string(),
            timestamp: now,
        });
        self.status = to;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key() -> ResultKey {
        ResultKey {
            enrollment_id: EnrollmentId::new(),
            course_id: CourseId::new(),
            academic_year: "2024/2025".to_string(),
            semester: 1,
        }
    }

    fn pending_result() -> AcademicResult {
        AcademicResult::new(sample_key(), 72.0, Grade::A, 3, None)
    }

    #[test]
    fn new_result_is_pending() {
        let r = pending_result();
        assert_eq!(r.status, ResultStatus::Pending);
        assert_eq!(r.grade_point, 4.0);
        assert!(r.transitions.is_empty());
    }

    #[test]
    fn approve_then_publish() {
        let mut r = pending_result();
        r.apply(TransitionAction::Approve, "exams@uoa").unwrap();
        assert_eq!(r.status, ResultStatus::Approved);
        r.apply(TransitionAction::Publish, "exams@uoa").unwrap();
        assert_eq!(r.status, ResultStatus::Published);
        assert_eq!(r.transitions.len(), 2);
    }

    #[test]
    fn publish_requires_approval_first() {
        let mut r = pending_result();
        assert!(r.apply(TransitionAction::Publish, "exams@uoa").is_err());
    }

    #[test]
    fn dispute_from_pending_and_approved() {
        let mut r = pending_result();
        r.apply(TransitionAction::Dispute, "exams@uoa").unwrap();
        assert_eq!(r.status, ResultStatus::Disputed);

        let mut r = pending_result();
        r.apply(TransitionAction::Approve, "exams@uoa").unwrap();
        r.apply(TransitionAction::Dispute, "exams@uoa").unwrap();
        assert_eq!(r.status, ResultStatus::Disputed);
    }

    #[test]
    fn no_direct_disputed_to_published() {
        let mut r = pending_result();
        r.apply(TransitionAction::Dispute, "exams@uoa").unwrap();
        assert!(r.apply(TransitionAction::Publish, "exams@uoa").is_err());
        assert!(r.apply(TransitionAction::Approve, "exams@uoa").is_err());
    }

    #[test]
    fn published_is_terminal() {
        let mut r = pending_result();
        r.apply(TransitionAction::Approve, "exams@uoa").unwrap();
        r.apply(TransitionAction::Publish, "exams@uoa").unwrap();
        assert!(r.apply(TransitionAction::Dispute, "exams@uoa").is_err());
        assert!(!r.status.accepts_resubmission());
    }

    #[test]
    fn resubmit_resets_to_pending_and_keeps_credit_weight() {
        let mut r = pending_result();
        r.apply(TransitionAction::Approve, "exams@uoa").unwrap();
        r.resubmit(58.0, Grade::CPlus, Some("regrade".to_string()));

        assert_eq!(r.status, ResultStatus::Pending);
        assert_eq!(r.score, 58.0);
        assert_eq!(r.grade, Grade::CPlus);
        assert_eq!(r.grade_point, 2.5);
        assert_eq!(r.credit_weight, 3);
        assert_eq!(r.remarks.as_deref(), Some("regrade"));
    }

    #[test]
    fn resubmit_from_disputed_reenters_pending() {
        let mut r = pending_result();
        r.apply(TransitionAction::Dispute, "exams@uoa").unwrap();
        r.resubmit(65.0, Grade::BPlus, None);
        assert_eq!(r.status, ResultStatus::Pending);
    }

    #[test]
    fn status_display() {
        assert_eq!(ResultStatus::Pending.to_string(), "PENDING");
        assert_eq!(ResultStatus::Published.to_string(), "PUBLISHED");
        assert_eq!(TransitionAction::Publish.to_string(), "publish");
    }

    #[test]
    fn result_serialization_roundtrip() {
        let mut r = pending_result();
        r.apply(TransitionAction::Approve, "exams@uoa").unwrap();

        let json = serde_json::to_string(&r).unwrap();
        let parsed: AcademicResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, r.id);
        assert_eq!(parsed.status, ResultStatus::Approved);
        assert_eq!(parsed.grade, r.grade);
        assert_eq!(parsed.transitions.len(), 1);
    }

    #[test]
    fn transition_action_wire_format() {
        assert_eq!(
            serde_json::to_string(&TransitionAction::Approve).unwrap(),
            "\"approve\""
        );
        let parsed: TransitionAction = serde_json::from_str("\"publish\"").unwrap();
        assert_eq!(parsed, TransitionAction::Publish);
    }
}
