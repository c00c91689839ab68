//! # Error Types — Shared Error Hierarchy
//!
//! Errors used across the registry crates. All errors use `thiserror` for
//! derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Canonicalization errors fail loudly with full context; a digest
//!   computed over the wrong bytes is worse than no digest at all.
//! - Validation errors name the offending field so callers can return a
//!   user-correctable message without string surgery.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Scores and other numeric trust fields must be strings or integers.
    #[error("float values are not permitted in canonical representations; use string or integer: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Input validation failure — always user-correctable, returned
/// synchronously at the boundary before any state is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was missing or empty.
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the absent field.
        field: &'static str,
    },

    /// A field carried a value outside its permitted domain.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A lookup request supplied both keys or neither.
    #[error("exactly one of verification_code or certificate_number must be supplied")]
    AmbiguousLookup,

    /// A timestamp string could not be parsed under the UTC-only policy.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
        /// Why parsing failed.
        reason: String,
    },
}

impl ValidationError {
    /// Convenience constructor for [`ValidationError::InvalidValue`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
