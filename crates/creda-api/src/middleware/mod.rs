//! # Middleware
//!
//! HTTP-level middleware shared across routes. Authentication lives in
//! [`crate::auth`]; this module carries the Prometheus metrics layer.

pub mod metrics;
