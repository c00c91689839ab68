//! # Academic Result Routes
//!
//! Lecturer submission and examinations-office moderation. The batch
//! transition endpoint reports per id: a stale or mistyped id shows up in
//! `failures` while the rest of the batch proceeds.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use creda_core::{CourseId, EnrollmentId, ResultId};
use creda_results::{AcademicResult, ResultKey, SubmitResult, TransitionAction};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

// ─── DTOs ────────────────────────────────────────────────────────────

/// Result submission body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitResultRequest {
    /// The enrollment the score belongs to.
    pub enrollment_id: Uuid,
    /// The course.
    pub course_id: Uuid,
    /// Academic year label, e.g. `2024/2025`.
    pub academic_year: String,
    /// Semester within the year (1-based).
    pub semester: u8,
    /// Raw score on the 0–100 scale.
    pub score: f64,
    /// Free-form remarks.
    #[serde(default)]
    pub remarks: Option<String>,
}

impl Validate for SubmitResultRequest {
    fn validate(&self) -> Result<(), String> {
        if self.academic_year.trim().is_empty() {
            return Err("academic_year must not be empty".to_string());
        }
        if self.academic_year.len() > 16 {
            return Err("academic_year must not exceed 16 characters".to_string());
        }
        if let Some(remarks) = &self.remarks {
            if remarks.len() > 1024 {
                return Err("remarks must not exceed 1024 characters".to_string());
            }
        }
        Ok(())
    }
}

/// Batch transition body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionRequest {
    /// Result ids to transition.
    pub result_ids: Vec<Uuid>,
    /// `approve`, `publish`, or `dispute`.
    pub action: TransitionActionDto,
}

/// Wire form of the moderation action.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransitionActionDto {
    /// `Pending → Approved`.
    Approve,
    /// `Approved → Published`.
    Publish,
    /// `Pending | Approved → Disputed`.
    Dispute,
}

impl From<TransitionActionDto> for TransitionAction {
    fn from(dto: TransitionActionDto) -> Self {
        match dto {
            TransitionActionDto::Approve => Self::Approve,
            TransitionActionDto::Publish => Self::Publish,
            TransitionActionDto::Dispute => Self::Dispute,
        }
    }
}

impl Validate for TransitionRequest {
    fn validate(&self) -> Result<(), String> {
        if self.result_ids.is_empty() {
            return Err("result_ids must not be empty".to_string());
        }
        if self.result_ids.len() > 500 {
            return Err("result_ids must not exceed 500 entries per call".to_string());
        }
        Ok(())
    }
}

/// Result row response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResultDto {
    /// Row id.
    pub id: Uuid,
    /// Enrollment.
    pub enrollment_id: Uuid,
    /// Course.
    pub course_id: Uuid,
    /// Academic year label.
    pub academic_year: String,
    /// Semester.
    pub semester: u8,
    /// Raw score.
    pub score: f64,
    /// Derived letter grade.
    pub grade: String,
    /// Derived grade point.
    pub grade_point: f64,
    /// Credit weight copied at first submission.
    pub credit_weight: u8,
    /// Workflow status string.
    pub status: String,
    /// Remarks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl From<&AcademicResult> for ResultDto {
    fn from(result: &AcademicResult) -> Self {
        Self {
            id: *result.id.as_uuid(),
            enrollment_id: *result.key.enrollment_id.as_uuid(),
            course_id: *result.key.course_id.as_uuid(),
            academic_year: result.key.academic_year.clone(),
            semester: result.key.semester,
            score: result.score,
            grade: result.grade.to_string(),
            grade_point: result.grade_point,
            credit_weight: result.credit_weight,
            status: result.status.to_string(),
            remarks: result.remarks.clone(),
        }
    }
}

/// Per-id batch outcome response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransitionResponse {
    /// Ids whose transition was applied.
    pub applied: Vec<Uuid>,
    /// Ids that failed, each with its own error message.
    pub failures: Vec<TransitionFailure>,
}

/// One failed id in a batch.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransitionFailure {
    /// The failed result id.
    pub id: Uuid,
    /// Why it failed.
    pub error: String,
}

// ─── Router ──────────────────────────────────────────────────────────

/// Build the results router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/results", post(submit_result))
        .route("/v1/results/transition", post(transition_results))
        .route("/v1/results/:id", get(get_result))
}

/// POST /v1/results — submit or correct a score (upsert).
#[utoipa::path(
    post,
    path = "/v1/results",
    request_body = SubmitResultRequest,
    responses(
        (status = 201, description = "Result created or updated", body = ResultDto),
        (status = 404, description = "Unknown course", body = crate::error::ErrorBody),
        (status = 409, description = "Result already published", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid score or key", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "results"
)]
pub(crate) async fn submit_result(
    State(state): State<AppState>,
    CallerIdentity(_principal): CallerIdentity,
    body: Result<Json<SubmitResultRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ResultDto>), AppError> {
    let req = extract_validated_json(body)?;

    let submission = SubmitResult {
        key: ResultKey {
            enrollment_id: EnrollmentId::from(req.enrollment_id),
            course_id: CourseId::from(req.course_id),
            academic_year: req.academic_year,
            semester: req.semester,
        },
        score: req.score,
        remarks: req.remarks,
    };

    let result = state.results.submit(submission)?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::results::upsert(pool, &result).await {
            tracing::error!(result_id = %result.id, error = %e, "result database write failed");
        }
    }

    Ok((StatusCode::CREATED, Json(ResultDto::from(&result))))
}

/// POST /v1/results/transition — apply one action to a batch of ids.
#[utoipa::path(
    post,
    path = "/v1/results/transition",
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Per-id batch outcome", body = TransitionResponse),
        (status = 403, description = "Caller lacks moderation capability", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "results"
)]
pub(crate) async fn transition_results(
    State(state): State<AppState>,
    CallerIdentity(principal): CallerIdentity,
    body: Result<Json<TransitionRequest>, JsonRejection>,
) -> Result<Json<TransitionResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let ids: Vec<ResultId> = req.result_ids.iter().copied().map(ResultId::from).collect();

    let outcome = state
        .results
        .transition(&ids, req.action.into(), &principal)?;

    if let Some(pool) = &state.db_pool {
        for id in &outcome.applied {
            if let Some(result) = state.results.get(id) {
                if let Err(e) = crate::db::results::update_status(pool, &result).await {
                    tracing::error!(result_id = %id, error = %e, "result status database write failed");
                }
            }
        }
    }

    Ok(Json(TransitionResponse {
        applied: outcome.applied.iter().map(|id| *id.as_uuid()).collect(),
        failures: outcome
            .failures
            .into_iter()
            .map(|(id, error)| TransitionFailure {
                id: *id.as_uuid(),
                error: error.to_string(),
            })
            .collect(),
    }))
}

/// GET /v1/results/{id} — fetch a result row.
#[utoipa::path(
    get,
    path = "/v1/results/{id}",
    params(("id" = Uuid, Path, description = "Result id")),
    responses(
        (status = 200, description = "Result found", body = ResultDto),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "results"
)]
pub(crate) async fn get_result(
    State(state): State<AppState>,
    CallerIdentity(_principal): CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ResultDto>, AppError> {
    let id = ResultId::from(id);
    let result = state
        .results
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("result {id} not found")))?;
    Ok(Json(ResultDto::from(&result)))
}
