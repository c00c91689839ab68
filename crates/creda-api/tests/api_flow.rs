//! Router-level integration tests: the full issue → verify → revoke flow
//! over HTTP, auth enforcement, the public verify contract, and the
//! result moderation endpoints. All against the mock ledger, no network.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use creda_api::config::{ApiConfig, CourseSeed, InstitutionEntry, IssuerToken};
use creda_api::{app, AppState};
use creda_core::Capability;

const TOKEN: &str = "registrar-token-0123456789";

fn institution_id() -> Uuid {
    Uuid::from_u128(0x1001)
}

fn course_id() -> Uuid {
    Uuid::from_u128(0x2001)
}

fn test_app() -> Router {
    let mut config = ApiConfig::default();
    config.institutions.push(InstitutionEntry {
        id: institution_id(),
        certificate_prefix: "UOA".to_string(),
    });
    config.issuers.push(IssuerToken {
        token: TOKEN.to_string(),
        subject: "registrar@uoa".to_string(),
        institution_id: institution_id(),
        capabilities: vec![
            Capability::IssueCredentials,
            Capability::RevokeCredentials,
            Capability::ModerateResults,
        ],
    });
    config.courses.push(CourseSeed {
        id: course_id(),
        credit_weight: 3,
    });
    config.validate().unwrap();

    let state = AppState::build(config, None).unwrap();
    app(state)
}

fn post_json(uri: &str, body: serde_json::Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn issue_body() -> serde_json::Value {
    serde_json::json!({
        "institution_id": institution_id(),
        "subject": {
            "full_name": "Amina Diallo",
            "student_number": "S-2020-1187",
            "date_of_birth": "1999-04-12"
        },
        "program": {
            "name": "BSc Computer Science",
            "program_type": "bachelor",
            "honors": "First Class Honours",
            "final_score": "78.5"
        },
        "graduated_on": "2024-06-30"
    })
}

#[tokio::test]
async fn issue_verify_revoke_over_http() {
    let app = test_app();

    // Issue.
    let response = app
        .clone()
        .oneshot(post_json("/v1/credentials", issue_body(), Some(TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let issued = json_body(response).await;
    assert_eq!(issued["anchoring"]["state"], "ANCHORED");
    assert_eq!(issued["credential"]["status"], "ANCHORED");
    let code = issued["credential"]["verification_code"]
        .as_str()
        .unwrap()
        .to_string();
    let id = issued["credential"]["id"].as_str().unwrap().to_string();
    assert!(issued["credential"]["certificate_number"]
        .as_str()
        .unwrap()
        .starts_with("UOA-"));

    // Public verify — no auth header.
    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/verify",
            serde_json::json!({"verification_code": code}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let verified = json_body(response).await;
    assert_eq!(verified["status"], "VALID");
    assert_eq!(verified["valid"], true);
    assert_eq!(verified["anchor"]["network"], "mock");

    // Revoke, twice (idempotent).
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/v1/credentials/{id}/revoke"),
                serde_json::json!({"reason": "administrative error"}),
                Some(TOKEN),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let revoked = json_body(response).await;
        assert_eq!(revoked["status"], "REVOKED");
    }

    // Verification now reports INVALID with the reason.
    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/verify",
            serde_json::json!({"verification_code": code}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let verified = json_body(response).await;
    assert_eq!(verified["status"], "INVALID");
    assert_eq!(verified["valid"], false);
    assert!(verified["reason"]
        .as_str()
        .unwrap()
        .contains("administrative error"));
}

#[tokio::test]
async fn registrar_routes_require_auth() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(post_json("/v1/credentials", issue_body(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(post_json("/v1/credentials", issue_body(), Some("wrong-token-000000")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn issuing_for_foreign_institution_is_forbidden() {
    let app = test_app();
    let mut body = issue_body();
    body["institution_id"] = serde_json::json!(Uuid::from_u128(0x9999));

    let response = app
        .oneshot(post_json("/v1/credentials", body, Some(TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn verify_rejects_ambiguous_lookup() {
    let app = test_app();

    // Neither key.
    let response = app
        .clone()
        .oneshot(post_json("/v1/verify", serde_json::json!({}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Both keys.
    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/verify",
            serde_json::json!({
                "verification_code": "VC-AAAAAAAAAA",
                "certificate_number": "UOA-2026-00001"
            }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn verify_unknown_key_is_structured_not_found() {
    let app = test_app();
    let response = app
        .oneshot(post_json(
            "/v1/verify",
            serde_json::json!({"verification_code": "VC-DOESNOTEXIST"}),
            None,
        ))
        .await
        .unwrap();
    // NOT_FOUND is a structured 200 outcome, not an HTTP 404.
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "NOT_FOUND");
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn results_submission_and_batch_transition() {
    let app = test_app();
    let enrollment = Uuid::from_u128(0x3001);

    // Submit a score.
    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/results",
            serde_json::json!({
                "enrollment_id": enrollment,
                "course_id": course_id(),
                "academic_year": "2024/2025",
                "semester": 1,
                "score": 70.0
            }),
            Some(TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let result = json_body(response).await;
    assert_eq!(result["grade"], "A");
    assert_eq!(result["status"], "PENDING");
    assert_eq!(result["credit_weight"], 3);
    let result_id = result["id"].as_str().unwrap().to_string();

    // Resubmit with a lower score: same row, grade recomputed.
    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/results",
            serde_json::json!({
                "enrollment_id": enrollment,
                "course_id": course_id(),
                "academic_year": "2024/2025",
                "semester": 1,
                "score": 69.999
            }),
            Some(TOKEN),
        ))
        .await
        .unwrap();
    let resubmitted = json_body(response).await;
    assert_eq!(resubmitted["id"].as_str().unwrap(), result_id);
    assert_eq!(resubmitted["grade"], "B+");

    // Approve + publish; a ghost id is reported per-id, not fatal.
    let ghost = Uuid::from_u128(0xdead);
    for action in ["approve", "publish"] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/v1/results/transition",
                serde_json::json!({
                    "result_ids": [result_id, ghost],
                    "action": action
                }),
                Some(TOKEN),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = json_body(response).await;
        assert_eq!(outcome["applied"][0].as_str().unwrap(), result_id);
        assert_eq!(outcome["failures"].as_array().unwrap().len(), 1);
        assert_eq!(outcome["failures"][0]["id"], serde_json::json!(ghost));
    }

    // The published row refuses correction.
    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/results",
            serde_json::json!({
                "enrollment_id": enrollment,
                "course_id": course_id(),
                "academic_year": "2024/2025",
                "semester": 1,
                "score": 90.0
            }),
            Some(TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn operational_endpoints_are_open() {
    let app = test_app();

    for uri in ["/health/liveness", "/health/readiness", "/openapi.json"] {
        let response = app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
    }

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("creda_ledger_connected"));
}
