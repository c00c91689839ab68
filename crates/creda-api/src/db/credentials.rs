//! Credential and anchor write-through.

use sqlx::postgres::PgPool;

use creda_registry::{Anchor, Credential};

/// Insert a freshly issued credential.
///
/// The full record is stored as JSONB alongside the indexed columns, so
/// recovery after a restart reconstructs the row exactly.
pub async fn insert(pool: &PgPool, credential: &Credential) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO credentials
            (id, institution_id, certificate_number, verification_code,
             subject_name, record, status, revocation_reason, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(credential.id.as_uuid())
    .bind(credential.institution_id.as_uuid())
    .bind(credential.certificate_number.as_str())
    .bind(credential.verification_code.as_str())
    .bind(&credential.subject.full_name)
    .bind(sqlx::types::Json(credential))
    .bind(credential.status.as_str())
    .bind(credential.revocation.as_ref().map(|r| r.reason.as_str()))
    .bind(credential.created_at.as_datetime())
    .bind(credential.updated_at.as_datetime())
    .execute(pool)
    .await?;
    Ok(())
}

/// Update a credential's status, record blob, and revocation columns.
pub async fn update_status(pool: &PgPool, credential: &Credential) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE credentials
        SET status = $2, record = $3, revocation_reason = $4, updated_at = $5
        WHERE id = $1
        "#,
    )
    .bind(credential.id.as_uuid())
    .bind(credential.status.as_str())
    .bind(sqlx::types::Json(credential))
    .bind(credential.revocation.as_ref().map(|r| r.reason.as_str()))
    .bind(credential.updated_at.as_datetime())
    .execute(pool)
    .await?;
    Ok(())
}

/// Append an anchor row. Anchor history is append-only; rows are never
/// updated or deleted.
pub async fn insert_anchor(pool: &PgPool, anchor: &Anchor) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO anchors
            (credential_id, digest, reference, network, transaction_id, block_height, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (credential_id, digest) DO NOTHING
        "#,
    )
    .bind(anchor.credential_id.as_uuid())
    .bind(anchor.digest.to_string())
    .bind(anchor.reference.to_string())
    .bind(&anchor.reference.network)
    .bind(&anchor.reference.transaction_id)
    .bind(anchor.reference.block_height as i64)
    .bind(anchor.created_at.as_datetime())
    .execute(pool)
    .await?;
    Ok(())
}
