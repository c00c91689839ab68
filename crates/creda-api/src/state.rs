//! # Application State
//!
//! The injected service handles shared by all route handlers. Everything
//! here is constructed exactly once in the binary and passed by
//! reference — there are no ambient globals, no lazily-initialized
//! singletons.

use std::sync::Arc;

use sqlx::postgres::PgPool;

use creda_core::{CourseId, Principal};
use creda_ledger::{HttpLedger, LedgerClient, MockLedger};
use creda_registry::{
    AnchorStore, AttemptStore, CredentialStore, LifecycleManager, VerificationEngine,
};
use creda_results::{CourseDirectory, ResultLedger};

use crate::auth::TokenTable;
use crate::config::{ApiConfig, LedgerMode};
use crate::error::AppError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<ApiConfig>,
    /// Credential rows and indexes.
    pub credentials: Arc<CredentialStore>,
    /// Anchor history.
    pub anchors: Arc<AnchorStore>,
    /// Verification attempt log.
    pub attempts: Arc<AttemptStore>,
    /// Academic results.
    pub results: Arc<ResultLedger>,
    /// Course credit weights.
    pub courses: Arc<CourseDirectory>,
    /// The sole credential/anchor mutator.
    pub lifecycle: Arc<LifecycleManager>,
    /// The public verification read path.
    pub verifier: Arc<VerificationEngine>,
    /// Ledger gateway.
    pub ledger: Arc<LedgerClient>,
    /// Bearer token table for the auth middleware.
    pub tokens: Arc<TokenTable>,
    /// Optional Postgres pool for write-through persistence.
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Build the full service graph from configuration.
    ///
    /// `db_pool` comes from [`crate::db::init_pool`]; `None` means
    /// in-memory-only mode.
    pub fn build(config: ApiConfig, db_pool: Option<PgPool>) -> Result<Self, AppError> {
        let ledger = Arc::new(build_ledger(&config)?);

        let credentials = Arc::new(CredentialStore::new());
        let anchors = Arc::new(AnchorStore::new());
        let attempts = Arc::new(AttemptStore::with_capacity(config.attempt_log_capacity));

        let courses = Arc::new(CourseDirectory::new());
        for seed in &config.courses {
            courses.register(CourseId::from(seed.id), seed.credit_weight);
        }
        let results = Arc::new(ResultLedger::new(courses.clone()));

        let lifecycle = Arc::new(LifecycleManager::new(
            credentials.clone(),
            anchors.clone(),
            ledger.clone(),
            config.certificate_prefixes(),
            config.ledger.submit_timeout(),
        ));
        let verifier = Arc::new(VerificationEngine::new(
            credentials.clone(),
            anchors.clone(),
            attempts.clone(),
            ledger.clone(),
            config.ledger.fetch_timeout(),
        ));

        let tokens = Arc::new(TokenTable::from_issuers(&config.issuers));

        Ok(Self {
            config: Arc::new(config),
            credentials,
            anchors,
            attempts,
            results,
            courses,
            lifecycle,
            verifier,
            ledger,
            tokens,
            db_pool,
        })
    }

    /// Resolve a bearer token to a principal.
    pub fn resolve_token(&self, token: &str) -> Option<Principal> {
        self.tokens.resolve(token)
    }
}

/// Construct the configured ledger adapter.
fn build_ledger(config: &ApiConfig) -> Result<LedgerClient, AppError> {
    match config.ledger.mode {
        LedgerMode::Mock => Ok(LedgerClient::Mock(MockLedger::new(
            config.ledger.network.clone(),
        ))),
        LedgerMode::Http => {
            let endpoint = config.ledger.endpoint.as_deref().ok_or_else(|| {
                AppError::ServiceUnavailable("ledger endpoint not configured".to_string())
            })?;
            let base = url::Url::parse(endpoint).map_err(|e| {
                AppError::ServiceUnavailable(format!("invalid ledger endpoint: {e}"))
            })?;
            let adapter = HttpLedger::new(
                base,
                config.ledger.network.clone(),
                config.ledger.request_timeout(),
            )
            .map_err(|e| AppError::ServiceUnavailable(e.to_string()))?;
            Ok(LedgerClient::Http(adapter))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_with_mock_ledger() {
        let state = AppState::build(ApiConfig::default(), None).unwrap();
        assert_eq!(state.ledger.network(), "mock");
        assert!(state.credentials.is_empty());
        assert!(state.db_pool.is_none());
    }

    #[test]
    fn build_http_without_endpoint_fails() {
        let mut config = ApiConfig::default();
        config.ledger.mode = LedgerMode::Http;
        assert!(AppState::build(config, None).is_err());
    }

    #[test]
    fn course_seed_registers() {
        let mut config = ApiConfig::default();
        let id = uuid::Uuid::new_v4();
        config.courses.push(crate::config::CourseSeed {
            id,
            credit_weight: 4,
        });
        let state = AppState::build(config, None).unwrap();
        assert_eq!(state.courses.credit_weight(&CourseId::from(id)), Some(4));
    }
}
