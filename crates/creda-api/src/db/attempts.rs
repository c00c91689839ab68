//! Verification attempt write-through.

use sqlx::postgres::PgPool;
use uuid::Uuid;

use creda_registry::{LookupKind, RequesterInfo, VerificationStatus};

/// Append one verification attempt.
///
/// The table is append-only by convention; nothing in this subsystem
/// updates or deletes rows.
pub async fn insert(
    pool: &PgPool,
    lookup_kind: LookupKind,
    lookup_value: &str,
    outcome: VerificationStatus,
    requester: &RequesterInfo,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO verification_attempts
            (id, lookup_kind, lookup_value, outcome, origin, user_agent, organization, occurred_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(lookup_kind.as_str())
    .bind(lookup_value)
    .bind(outcome.as_str())
    .bind(requester.origin.as_deref())
    .bind(requester.user_agent.as_deref())
    .bind(requester.organization.as_deref())
    .execute(pool)
    .await?;
    Ok(())
}
