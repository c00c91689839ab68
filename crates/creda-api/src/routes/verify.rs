//! # Public Verification Route
//!
//! The one endpoint safe to expose to the open internet. Every outcome —
//! valid, invalid, unconfirmed, not found — is a structured 200 response;
//! only a malformed request (both lookup keys, neither, or unparseable
//! JSON) produces an error status.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use creda_registry::{CredentialLookup, RequesterInfo, VerificationReport};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

// ─── DTOs ────────────────────────────────────────────────────────────

/// Verification request: exactly one of the two lookup keys.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRequest {
    /// Opaque verification code from the document's QR payload.
    #[serde(default)]
    pub verification_code: Option<String>,
    /// Printed certificate number.
    #[serde(default)]
    pub certificate_number: Option<String>,
    /// Self-declared requesting organization.
    #[serde(default)]
    pub organization: Option<String>,
}

impl Validate for VerifyRequest {
    fn validate(&self) -> Result<(), String> {
        // Key-arity is enforced by CredentialLookup::from_parts; only
        // size sanity lives here.
        for (field, value) in [
            ("verification_code", &self.verification_code),
            ("certificate_number", &self.certificate_number),
        ] {
            if let Some(value) = value {
                if value.len() > 128 {
                    return Err(format!("{field} must not exceed 128 characters"));
                }
            }
        }
        Ok(())
    }
}

/// Verification response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyResponse {
    /// `VALID`, `INVALID`, `UNCONFIRMED`, or `NOT_FOUND`.
    pub status: String,
    /// True only for `VALID`.
    pub valid: bool,
    /// Reason for non-valid outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Credential summary when one was resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<VerifiedCredentialDto>,
    /// Anchor details when an anchor exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<VerifiedAnchorDto>,
    /// When the check was performed (ISO 8601, UTC).
    pub checked_at: String,
}

/// Public credential summary.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifiedCredentialDto {
    /// Printed certificate number.
    pub certificate_number: String,
    /// Issuing institution.
    pub institution_id: Uuid,
    /// Holder name.
    pub holder_name: String,
    /// Program name.
    pub program_name: String,
    /// Program type.
    pub program_type: String,
    /// Class/grade honor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub honors: Option<String>,
    /// Graduation date.
    pub graduated_on: NaiveDate,
    /// Lifecycle status string.
    pub status: String,
}

/// Anchor details with live-confirmation annotation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifiedAnchorDto {
    /// `{network}:{transactionId}:{blockHeight}` explorer reference.
    pub reference: String,
    /// Ledger transaction id.
    pub transaction_id: String,
    /// Including block height.
    pub block_height: u64,
    /// Network identifier.
    pub network: String,
    /// Live ledger confirmation, when attempted and conclusive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_confirmed: Option<bool>,
    /// Note about the live confirmation outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_note: Option<String>,
}

impl From<VerificationReport> for VerifyResponse {
    fn from(report: VerificationReport) -> Self {
        Self {
            status: report.status.to_string(),
            valid: report.valid,
            reason: report.reason,
            credential: report.credential.map(|c| VerifiedCredentialDto {
                certificate_number: c.certificate_number,
                institution_id: *c.institution_id.as_uuid(),
                holder_name: c.holder_name,
                program_name: c.program_name,
                program_type: c.program_type,
                honors: c.honors,
                graduated_on: c.graduated_on,
                status: c.status,
            }),
            anchor: report.anchor.map(|a| VerifiedAnchorDto {
                reference: a.reference,
                transaction_id: a.transaction_id,
                block_height: a.block_height,
                network: a.network,
                ledger_confirmed: a.ledger_confirmed,
                ledger_note: a.ledger_note,
            }),
            checked_at: report.checked_at.to_iso8601(),
        }
    }
}

// ─── Router ──────────────────────────────────────────────────────────

/// Build the verification router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/verify", post(verify_credential))
}

/// POST /v1/verify — verify a credential by one of its public keys.
#[utoipa::path(
    post,
    path = "/v1/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Structured verification outcome", body = VerifyResponse),
        (status = 422, description = "Both keys, neither key, or malformed body", body = crate::error::ErrorBody),
    ),
    tag = "verification"
)]
pub(crate) async fn verify_credential(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, AppError> {
    let req = extract_validated_json(body)?;

    let lookup = CredentialLookup::from_parts(req.verification_code, req.certificate_number)?;
    let requester = RequesterInfo {
        origin: header_string(&headers, "x-forwarded-for"),
        user_agent: header_string(&headers, "user-agent"),
        organization: req.organization,
    };

    let lookup_kind = lookup.kind();
    let lookup_value = lookup.value().to_string();
    let report = state.verifier.verify(lookup, requester.clone()).await;

    // Mirror the attempt into durable storage. The in-memory log already
    // has it; a database failure here is logged, never surfaced.
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::attempts::insert(
            pool,
            lookup_kind,
            &lookup_value,
            report.status,
            &requester,
        )
        .await
        {
            tracing::warn!(error = %e, "verification attempt database write failed");
        }
    }

    Ok(Json(VerifyResponse::from(report)))
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_string())
}
