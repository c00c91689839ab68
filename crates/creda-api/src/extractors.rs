//! # Request Extraction Helpers
//!
//! JSON bodies arrive as `Result<Json<T>, JsonRejection>` so a malformed
//! body produces the structured 422 error instead of axum's default
//! rejection. Request types implement [`Validate`] for field-level checks
//! that don't belong in serde.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Field-level validation for request bodies.
pub trait Validate {
    /// Validate the request, returning a user-correctable message on
    /// failure.
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON body, mapping parse failures and validation failures to
/// the structured error response.
pub fn extract_validated_json<T: Validate>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let Json(value) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Probe {
        ok: bool,
    }

    impl Validate for Probe {
        fn validate(&self) -> Result<(), String> {
            if self.ok {
                Ok(())
            } else {
                Err("probe failed".to_string())
            }
        }
    }

    #[test]
    fn valid_body_passes() {
        let out = extract_validated_json(Ok(Json(Probe { ok: true })));
        assert!(out.is_ok());
    }

    #[test]
    fn validation_failure_maps_to_validation_error() {
        let out = extract_validated_json(Ok(Json(Probe { ok: false })));
        match out.unwrap_err() {
            AppError::Validation(msg) => assert_eq!(msg, "probe failed"),
            other => panic!("expected Validation, got: {other:?}"),
        }
    }
}
