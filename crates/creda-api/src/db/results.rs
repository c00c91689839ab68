//! Academic result write-through.

use sqlx::postgres::PgPool;

use creda_results::AcademicResult;

/// Insert or update a result row, keyed by the composite natural key.
///
/// Mirrors the in-memory upsert: the unique index on
/// `(enrollment_id, course_id, academic_year, semester)` makes the
/// operation race-free at the database level as well.
pub async fn upsert(pool: &PgPool, result: &AcademicResult) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO academic_results
            (id, enrollment_id, course_id, academic_year, semester,
             score, grade, grade_point, credit_weight, remarks, status,
             created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (enrollment_id, course_id, academic_year, semester)
        DO UPDATE SET
            score = EXCLUDED.score,
            grade = EXCLUDED.grade,
            grade_point = EXCLUDED.grade_point,
            remarks = EXCLUDED.remarks,
            status = EXCLUDED.status,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(result.id.as_uuid())
    .bind(result.key.enrollment_id.as_uuid())
    .bind(result.key.course_id.as_uuid())
    .bind(&result.key.academic_year)
    .bind(result.key.semester as i16)
    .bind(result.score)
    .bind(result.grade.as_str())
    .bind(result.grade_point)
    .bind(result.credit_weight as i16)
    .bind(result.remarks.as_deref())
    .bind(result.status.as_str())
    .bind(result.created_at.as_datetime())
    .bind(result.updated_at.as_datetime())
    .execute(pool)
    .await?;
    Ok(())
}

/// Update a result's workflow status after a moderation transition.
pub async fn update_status(pool: &PgPool, result: &AcademicResult) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE academic_results
        SET status = $2, updated_at = $3
        WHERE id = $1
        "#,
    )
    .bind(result.id.as_uuid())
    .bind(result.status.as_str())
    .bind(result.updated_at.as_datetime())
    .execute(pool)
    .await?;
    Ok(())
}
