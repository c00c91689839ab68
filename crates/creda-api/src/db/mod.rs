//! # Database Persistence Layer
//!
//! Optional Postgres write-through via SQLx. When `DATABASE_URL` is set,
//! credential rows, anchor rows, verification attempts, and academic
//! results are mirrored to PostgreSQL so they survive restarts. When
//! absent, the API runs on the in-memory stores alone (development and
//! testing).
//!
//! The in-memory stores remain the authoritative working set; these
//! writers follow them. Credential inserts surface persistence failure
//! to the caller (silent loss of an issued credential is unacceptable);
//! the other mirrors degrade to logged warnings.

pub mod attempts;
pub mod credentials;
pub mod results;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running in-memory only. \
                 Credentials and anchors will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
