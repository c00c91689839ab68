//! # Authentication Middleware
//!
//! Bearer-token authentication for the registrar-facing routes. Tokens
//! resolve to [`Principal`]s via the configured issuer table; comparison
//! is constant-time so token values cannot be recovered through timing.
//!
//! The public verification endpoint, health probes, `/metrics`, and the
//! OpenAPI document are mounted outside this middleware.

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use creda_core::Principal;

use crate::config::IssuerToken;
use crate::error::AppError;
use crate::state::AppState;

/// The resolved caller identity, inserted into request extensions by the
/// auth middleware and pulled out by handlers via the extractor.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub Principal);

/// Registered bearer tokens and the principals they resolve to.
#[derive(Debug, Default)]
pub struct TokenTable {
    entries: Vec<(String, Principal)>,
}

impl TokenTable {
    /// Build the table from the configured issuer entries.
    pub fn from_issuers(issuers: &[IssuerToken]) -> Self {
        Self {
            entries: issuers
                .iter()
                .map(|issuer| (issuer.token.clone(), issuer.principal()))
                .collect(),
        }
    }

    /// Resolve a presented token, comparing each candidate in constant
    /// time. The scan is linear over a small operator-managed table.
    pub fn resolve(&self, presented: &str) -> Option<Principal> {
        let presented = presented.as_bytes();
        for (token, principal) in &self.entries {
            let token = token.as_bytes();
            if token.len() == presented.len() && bool::from(token.ct_eq(presented)) {
                return Some(principal.clone());
            }
        }
        None
    }

    /// Number of registered tokens.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Require a valid bearer token and attach the resolved identity.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing Authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("expected Bearer authorization".to_string()))?;

    let principal = state
        .resolve_token(token)
        .ok_or_else(|| AppError::Unauthorized("unknown token".to_string()))?;

    request.extensions_mut().insert(CallerIdentity(principal));
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("request is not authenticated".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use creda_core::Capability;
    use uuid::Uuid;

    fn table() -> TokenTable {
        TokenTable::from_issuers(&[IssuerToken {
            token: "registrar-token-0123456789".to_string(),
            subject: "registrar@uoa".to_string(),
            institution_id: Uuid::nil(),
            capabilities: vec![Capability::IssueCredentials],
        }])
    }

    #[test]
    fn known_token_resolves() {
        let principal = table().resolve("registrar-token-0123456789").unwrap();
        assert_eq!(principal.subject, "registrar@uoa");
    }

    #[test]
    fn unknown_token_does_not_resolve() {
        assert!(table().resolve("registrar-token-0123456780").is_none());
        assert!(table().resolve("").is_none());
        // A prefix of a registered token must not resolve.
        assert!(table().resolve("registrar-token-").is_none());
    }

    #[test]
    fn empty_table() {
        let table = TokenTable::default();
        assert!(table.is_empty());
        assert!(table.resolve("anything").is_none());
    }
}
