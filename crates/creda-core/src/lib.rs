//! # creda-core — Foundational Types for the Creda Registry
//!
//! This crate is the bedrock of the Creda credential registry. It defines the
//! type-system primitives every other crate builds on. Every other crate in
//! the workspace depends on `creda-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `CredentialId`,
//!    `InstitutionId`, `EnrollmentId`, `CourseId`, `ResultId`,
//!    `CertificateNumber`, `VerificationCode` — no bare strings or UUIDs
//!    for identifiers.
//!
//! 2. **`CanonicalBytes` newtype.** ALL digest computation flows through
//!    `CanonicalBytes::new()`. No raw `serde_json::to_vec()` for digests.
//!    An anchored digest is only worth anything if every party — the
//!    issuing registry, an auditor, an external verifier — computes the
//!    same bytes from the same record.
//!
//! 3. **UTC-only timestamps.** The `Timestamp` type enforces UTC with Z
//!    suffix and seconds precision, matching the canonicalization rules.
//!
//! 4. **`sha256_digest()` accepts only `&CanonicalBytes`.** Compile-time
//!    enforcement that all digest paths flow through canonicalization.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `creda-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize` where they cross a boundary.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod principal;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, ValidationError};
pub use identity::{
    CertificateNumber, CourseId, CredentialId, EnrollmentId, InstitutionId, ResultId,
    VerificationCode,
};
pub use principal::{Capability, Principal};
pub use temporal::Timestamp;
