//! Target resolution — turns a notification's declared targeting into the
//! final recipient set.
//!
//! All call sites resolve through this one component; the membership rules
//! (direct school assignment OR a guardian→dependent link into the school)
//! are not repeated anywhere else in the codebase.

use sqlx::PgPool;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{Notification, TargetMode, Targeting};

/// Resolves recipient sets for notifications.
pub struct TargetResolver;

impl TargetResolver {
    /// Resolve a notification's stored targeting.
    ///
    /// For explicit mode the stored target list is loaded and filtered; for
    /// auto mode the guardian set is resolved fresh against current
    /// membership data (so a resend picks up newly enrolled guardians).
    pub async fn resolve_for(
        pool: &PgPool,
        notification: &Notification,
    ) -> Result<Vec<Uuid>, AppError> {
        let targeting = match notification.target_mode {
            TargetMode::Auto => Targeting::Auto,
            TargetMode::Explicit => {
                let ids: Vec<(Uuid,)> = sqlx::query_as(
                    "SELECT recipient_id FROM notification_targets WHERE notification_id = $1",
                )
                .bind(notification.id)
                .fetch_all(pool)
                .await?;
                Targeting::Explicit(ids.into_iter().map(|(id,)| id).collect())
            }
        };

        Self::resolve(pool, notification.school_id, &targeting).await
    }

    /// Resolve targeting against one school's membership data.
    ///
    /// Deterministic for a given membership snapshot, deduplicated, order
    /// irrelevant.
    pub async fn resolve(
        pool: &PgPool,
        school_id: Uuid,
        targeting: &Targeting,
    ) -> Result<Vec<Uuid>, AppError> {
        match targeting {
            Targeting::Explicit(ids) => Self::resolve_explicit(pool, school_id, ids).await,
            Targeting::Auto => Self::resolve_auto(pool, school_id).await,
        }
    }

    /// Restrict an explicit id list to verifiable members of the school:
    /// directly assigned, or linked as guardian to a student of the school.
    /// Ids that verify neither way are silently dropped — a mixed
    /// valid/invalid list still reaches its valid recipients.
    async fn resolve_explicit(
        pool: &PgPool,
        school_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Uuid>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT r.id
            FROM recipients r
            WHERE r.id = ANY($1)
              AND (
                  r.school_id = $2
                  OR EXISTS (
                      SELECT 1
                      FROM guardian_links gl
                      JOIN students st ON st.id = gl.student_id
                      WHERE gl.guardian_id = r.id
                        AND st.school_id = $2
                  )
              )
            "#,
        )
        .bind(ids)
        .bind(school_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// All guardians associated with the school: directly assigned, plus
    /// guardians with no direct assignment who are linked to at least one
    /// of the school's students. The second path exists because guardian
    /// accounts may be created without a school and only gain tenant context
    /// through a dependent's enrollment.
    async fn resolve_auto(pool: &PgPool, school_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT r.id
            FROM recipients r
            WHERE r.role = 'guardian'
              AND (
                  r.school_id = $1
                  OR (
                      r.school_id IS NULL
                      AND EXISTS (
                          SELECT 1
                          FROM guardian_links gl
                          JOIN students st ON st.id = gl.student_id
                          WHERE gl.guardian_id = r.id
                            AND st.school_id = $1
                      )
                  )
              )
            "#,
        )
        .bind(school_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Administrative cross-tenant resolution: keep every id that names an
    /// existing recipient, with no school filter. Callers are responsible
    /// for restricting this to administrator-scoped requests.
    pub async fn resolve_unscoped(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT DISTINCT id FROM recipients WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(pool)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
