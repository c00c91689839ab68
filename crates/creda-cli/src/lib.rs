//! # creda-cli — Registry Command Line
//!
//! Subcommand handlers for the `creda` binary:
//!
//! - [`serve`] — run the API service from a configuration file.
//! - [`digest`] — canonicalize and digest a payload file, for
//!   out-of-band verification tooling.
//! - [`code`] — mint a verification code (operator tooling for
//!   pre-printed documents).

pub mod code;
pub mod digest;
pub mod serve;
