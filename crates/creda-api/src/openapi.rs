//! # OpenAPI Document
//!
//! Auto-generated OpenAPI spec from the utoipa path and schema derives,
//! served at `/openapi.json` (unauthenticated, like the health probes).

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// The registry's OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Creda Registry API",
        description = "Tamper-evident academic credential registry: issuance, ledger anchoring, public verification, and academic result moderation.",
    ),
    paths(
        crate::routes::credentials::issue_credential,
        crate::routes::credentials::get_credential,
        crate::routes::credentials::revoke_credential,
        crate::routes::credentials::retry_anchor,
        crate::routes::verify::verify_credential,
        crate::routes::results::submit_result,
        crate::routes::results::transition_results,
        crate::routes::results::get_result,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::credentials::IssueCredentialRequest,
        crate::routes::credentials::SubjectDto,
        crate::routes::credentials::ProgramDto,
        crate::routes::credentials::RevokeRequest,
        crate::routes::credentials::IssueCredentialResponse,
        crate::routes::credentials::CredentialDto,
        crate::routes::credentials::AnchoringDto,
        crate::routes::credentials::AnchorDto,
        crate::routes::verify::VerifyRequest,
        crate::routes::verify::VerifyResponse,
        crate::routes::verify::VerifiedCredentialDto,
        crate::routes::verify::VerifiedAnchorDto,
        crate::routes::results::SubmitResultRequest,
        crate::routes::results::TransitionRequest,
        crate::routes::results::TransitionActionDto,
        crate::routes::results::TransitionResponse,
        crate::routes::results::TransitionFailure,
        crate::routes::results::ResultDto,
    )),
    tags(
        (name = "credentials", description = "Credential lifecycle (authenticated)"),
        (name = "verification", description = "Public verification"),
        (name = "results", description = "Academic results (authenticated)"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by the
/// authenticated paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_openapi))
}

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_builds_and_lists_paths() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("/v1/credentials"));
        assert!(json.contains("/v1/verify"));
        assert!(json.contains("/v1/results/transition"));
    }
}
