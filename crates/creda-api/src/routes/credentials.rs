//! # Credential Routes
//!
//! Registrar-facing lifecycle operations. Issuance returns 201 with the
//! anchoring outcome inline: a ledger outage downgrades the outcome to
//! `DEFERRED` rather than failing the issuance, matching the invariant
//! that an issued credential exists and is checkable even while
//! unanchored.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use creda_core::{CredentialId, InstitutionId};
use creda_registry::{AnchorOutcome, Credential, IssueRequest, Program, Subject};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

// ─── DTOs ────────────────────────────────────────────────────────────

/// Issuance request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueCredentialRequest {
    /// Issuing institution.
    pub institution_id: Uuid,
    /// Holder identity.
    pub subject: SubjectDto,
    /// Program descriptor.
    pub program: ProgramDto,
    /// Program start date.
    #[serde(default)]
    pub started_on: Option<NaiveDate>,
    /// Graduation date.
    pub graduated_on: NaiveDate,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Holder identity fields.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubjectDto {
    /// Full legal name.
    pub full_name: String,
    /// Institution-local student number.
    #[serde(default)]
    pub student_number: Option<String>,
    /// National identity number.
    #[serde(default)]
    pub national_id: Option<String>,
    /// Date of birth.
    pub date_of_birth: NaiveDate,
}

/// Program descriptor fields.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProgramDto {
    /// Program name.
    pub name: String,
    /// Program type, e.g. `bachelor`.
    pub program_type: String,
    /// Class/grade honor.
    #[serde(default)]
    pub honors: Option<String>,
    /// Final numeric score as a decimal string.
    #[serde(default)]
    pub final_score: Option<String>,
}

impl Validate for IssueCredentialRequest {
    fn validate(&self) -> Result<(), String> {
        if self.subject.full_name.trim().is_empty() {
            return Err("subject.full_name must not be empty".to_string());
        }
        if self.subject.full_name.len() > 255 {
            return Err("subject.full_name must not exceed 255 characters".to_string());
        }
        if self.program.name.trim().is_empty() {
            return Err("program.name must not be empty".to_string());
        }
        if self.program.program_type.trim().is_empty() {
            return Err("program.program_type must not be empty".to_string());
        }
        Ok(())
    }
}

/// Revocation request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RevokeRequest {
    /// Why the credential is being revoked. Required, non-empty.
    pub reason: String,
}

impl Validate for RevokeRequest {
    fn validate(&self) -> Result<(), String> {
        if self.reason.trim().is_empty() {
            return Err("reason must not be empty".to_string());
        }
        Ok(())
    }
}

/// Anchoring leg outcome, serialized with issuance and retry responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnchoringDto {
    /// `ANCHORED`, `DEFERRED`, or `REJECTED`.
    pub state: String,
    /// Anchor reference details when anchored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<AnchorDto>,
    /// Error detail when deferred or rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Anchor row details.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnchorDto {
    /// `{network}:{transactionId}:{blockHeight}` reference.
    pub reference: String,
    /// Committed digest, `sha256:<hex>`.
    pub digest: String,
    /// Ledger transaction id.
    pub transaction_id: String,
    /// Including block height.
    pub block_height: u64,
    /// Network identifier.
    pub network: String,
}

impl From<&creda_registry::Anchor> for AnchorDto {
    fn from(anchor: &creda_registry::Anchor) -> Self {
        Self {
            reference: anchor.reference.to_string(),
            digest: anchor.digest.to_string(),
            transaction_id: anchor.reference.transaction_id.clone(),
            block_height: anchor.reference.block_height,
            network: anchor.reference.network.clone(),
        }
    }
}

impl From<&AnchorOutcome> for AnchoringDto {
    fn from(outcome: &AnchorOutcome) -> Self {
        match outcome {
            AnchorOutcome::Anchored(anchor) => Self {
                state: "ANCHORED".to_string(),
                anchor: Some(AnchorDto::from(anchor)),
                error: None,
            },
            AnchorOutcome::Deferred { error } => Self {
                state: "DEFERRED".to_string(),
                anchor: None,
                error: Some(error.clone()),
            },
            AnchorOutcome::Rejected { error } => Self {
                state: "REJECTED".to_string(),
                anchor: None,
                error: Some(error.clone()),
            },
        }
    }
}

/// Credential record response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CredentialDto {
    /// Credential id.
    pub id: Uuid,
    /// Issuing institution.
    pub institution_id: Uuid,
    /// Printed certificate number.
    pub certificate_number: String,
    /// Public lookup key. Returned only to the issuing institution.
    pub verification_code: String,
    /// Holder name.
    pub holder_name: String,
    /// Program name.
    pub program_name: String,
    /// Program type.
    pub program_type: String,
    /// Lifecycle status string.
    pub status: String,
    /// Graduation date.
    pub graduated_on: NaiveDate,
    /// Revocation reason when revoked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
}

impl From<&Credential> for CredentialDto {
    fn from(credential: &Credential) -> Self {
        Self {
            id: *credential.id.as_uuid(),
            institution_id: *credential.institution_id.as_uuid(),
            certificate_number: credential.certificate_number.as_str().to_string(),
            verification_code: credential.verification_code.as_str().to_string(),
            holder_name: credential.subject.full_name.clone(),
            program_name: credential.program.name.clone(),
            program_type: credential.program.program_type.clone(),
            status: credential.status.to_string(),
            graduated_on: credential.graduated_on,
            revocation_reason: credential.revocation.as_ref().map(|r| r.reason.clone()),
        }
    }
}

/// Issuance response: the credential plus its anchoring outcome.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssueCredentialResponse {
    /// The issued credential.
    pub credential: CredentialDto,
    /// How the inline anchoring attempt concluded.
    pub anchoring: AnchoringDto,
}

// ─── Router ──────────────────────────────────────────────────────────

/// Build the credentials router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/credentials", post(issue_credential))
        .route("/v1/credentials/:id", get(get_credential))
        .route("/v1/credentials/:id/revoke", post(revoke_credential))
        .route("/v1/credentials/:id/anchor", post(retry_anchor))
}

/// POST /v1/credentials — issue a credential and anchor it inline.
#[utoipa::path(
    post,
    path = "/v1/credentials",
    request_body = IssueCredentialRequest,
    responses(
        (status = 201, description = "Credential issued", body = IssueCredentialResponse),
        (status = 403, description = "Caller lacks issue capability", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid payload", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "credentials"
)]
pub(crate) async fn issue_credential(
    State(state): State<AppState>,
    CallerIdentity(principal): CallerIdentity,
    body: Result<Json<IssueCredentialRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IssueCredentialResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let institution_id = InstitutionId::from(req.institution_id);

    let request = IssueRequest {
        subject: Subject {
            full_name: req.subject.full_name,
            student_number: req.subject.student_number,
            national_id: req.subject.national_id,
            date_of_birth: req.subject.date_of_birth,
        },
        program: Program {
            name: req.program.name,
            program_type: req.program.program_type,
            honors: req.program.honors,
            final_score: req.program.final_score,
        },
        started_on: req.started_on,
        graduated_on: req.graduated_on,
        metadata: req.metadata,
    };

    let issuance = state.lifecycle.issue(institution_id, &principal, request).await?;

    // Write-through persistence. Failure is surfaced: the in-memory row
    // would be lost on restart, which is silent data loss for a record
    // whose whole purpose is durability.
    if let Some(pool) = &state.db_pool {
        crate::db::credentials::insert(pool, &issuance.credential)
            .await
            .map_err(|e| {
                tracing::error!(credential_id = %issuance.credential.id, error = %e,
                    "credential persisted in-memory but database write failed");
                AppError::Internal("credential recorded but persistence failed".to_string())
            })?;
        if let AnchorOutcome::Anchored(anchor) = &issuance.anchoring {
            if let Err(e) = crate::db::credentials::insert_anchor(pool, anchor).await {
                tracing::error!(credential_id = %issuance.credential.id, error = %e,
                    "anchor row database write failed");
            }
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(IssueCredentialResponse {
            credential: CredentialDto::from(&issuance.credential),
            anchoring: AnchoringDto::from(&issuance.anchoring),
        }),
    ))
}

/// GET /v1/credentials/{id} — fetch a credential record.
#[utoipa::path(
    get,
    path = "/v1/credentials/{id}",
    params(("id" = Uuid, Path, description = "Credential id")),
    responses(
        (status = 200, description = "Credential found", body = CredentialDto),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "credentials"
)]
pub(crate) async fn get_credential(
    State(state): State<AppState>,
    CallerIdentity(principal): CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<CredentialDto>, AppError> {
    let id = CredentialId::from(id);
    let credential = state
        .credentials
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("credential {id} not found")))?;

    // 404 rather than 403 for other institutions' records, to prevent
    // credential id enumeration.
    if credential.institution_id != principal.institution_id {
        return Err(AppError::NotFound(format!("credential {id} not found")));
    }

    Ok(Json(CredentialDto::from(&credential)))
}

/// POST /v1/credentials/{id}/revoke — revoke a credential.
#[utoipa::path(
    post,
    path = "/v1/credentials/{id}/revoke",
    params(("id" = Uuid, Path, description = "Credential id")),
    request_body = RevokeRequest,
    responses(
        (status = 200, description = "Credential revoked (idempotent)", body = CredentialDto),
        (status = 403, description = "Caller lacks revoke capability", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "credentials"
)]
pub(crate) async fn revoke_credential(
    State(state): State<AppState>,
    CallerIdentity(principal): CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<RevokeRequest>, JsonRejection>,
) -> Result<Json<CredentialDto>, AppError> {
    let req = extract_validated_json(body)?;
    let id = CredentialId::from(id);

    state.lifecycle.revoke(id, &principal, &req.reason).await?;

    let credential = state
        .credentials
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("credential {id} not found")))?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::credentials::update_status(pool, &credential).await {
            tracing::error!(credential_id = %id, error = %e, "revocation database write failed");
        }
    }

    Ok(Json(CredentialDto::from(&credential)))
}

/// POST /v1/credentials/{id}/anchor — explicitly retry anchoring.
///
/// A `DEFERRED` outcome is a 200 (the credential stays retriable); a
/// ledger rejection is surfaced as a 502 so operators see the failure.
#[utoipa::path(
    post,
    path = "/v1/credentials/{id}/anchor",
    params(("id" = Uuid, Path, description = "Credential id")),
    responses(
        (status = 200, description = "Anchoring attempted", body = AnchoringDto),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 502, description = "Ledger rejected the submission", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "credentials"
)]
pub(crate) async fn retry_anchor(
    State(state): State<AppState>,
    CallerIdentity(principal): CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<AnchoringDto>, AppError> {
    let id = CredentialId::from(id);
    let credential = state
        .credentials
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("credential {id} not found")))?;
    if credential.institution_id != principal.institution_id {
        return Err(AppError::NotFound(format!("credential {id} not found")));
    }

    let outcome = state.lifecycle.anchor(id).await?;

    if let AnchorOutcome::Rejected { error } = &outcome {
        return Err(AppError::Ledger(error.clone()));
    }

    if let (Some(pool), AnchorOutcome::Anchored(anchor)) = (&state.db_pool, &outcome) {
        if let Err(e) = crate::db::credentials::insert_anchor(pool, anchor).await {
            tracing::error!(credential_id = %id, error = %e, "anchor row database write failed");
        }
        if let Some(credential) = state.credentials.get(&id) {
            if let Err(e) = crate::db::credentials::update_status(pool, &credential).await {
                tracing::error!(credential_id = %id, error = %e, "status database write failed");
            }
        }
    }

    Ok(Json(AnchoringDto::from(&outcome)))
}
