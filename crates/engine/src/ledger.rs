//! Delivery ledger — the durable per-(notification, recipient) record of
//! channel outcomes and read state.
//!
//! The UNIQUE (notification_id, recipient_id) constraint is the concurrency
//! boundary: creation is an `ON CONFLICT DO NOTHING` upsert, so two workers
//! racing to create the same record converge on one row, and all later
//! mutation is a single atomic row update. No in-process locks are needed.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{Channel, ChannelStatus, DeliveryRecord, SendOutcome};

/// Shared WHERE fragment: is notification `n` visible to recipient `$1`
/// within school `$2`? Mirrors the resolver's auto/explicit rules so what a
/// recipient sees in-app matches what send-time resolution would give them.
pub(crate) const VISIBLE_TO_RECIPIENT: &str = r#"
    n.school_id = $2
    AND (
        (
            n.target_mode = 'auto'
            AND EXISTS (
                SELECT 1 FROM recipients r
                WHERE r.id = $1
                  AND r.role = 'guardian'
                  AND (
                      r.school_id = $2
                      OR (
                          r.school_id IS NULL
                          AND EXISTS (
                              SELECT 1 FROM guardian_links gl
                              JOIN students st ON st.id = gl.student_id
                              WHERE gl.guardian_id = r.id AND st.school_id = $2
                          )
                      )
                  )
            )
        )
        OR (
            n.target_mode = 'explicit'
            AND EXISTS (
                SELECT 1 FROM notification_targets t
                WHERE t.notification_id = n.id AND t.recipient_id = $1
            )
            AND EXISTS (
                SELECT 1 FROM recipients r
                WHERE r.id = $1
                  AND (
                      r.school_id = $2
                      OR EXISTS (
                          SELECT 1 FROM guardian_links gl
                          JOIN students st ON st.id = gl.student_id
                          WHERE gl.guardian_id = r.id AND st.school_id = $2
                      )
                  )
            )
        )
    )
"#;

/// Service layer for delivery-record persistence.
pub struct DeliveryLedger;

impl DeliveryLedger {
    /// Idempotently fetch or create the record for a (notification,
    /// recipient) pair. At most one row ever exists per pair; the loser of a
    /// creation race reads the winner's row.
    pub async fn get_or_create(
        pool: &PgPool,
        notification_id: Uuid,
        recipient_id: Uuid,
    ) -> Result<DeliveryRecord, AppError> {
        sqlx::query(
            r#"
            INSERT INTO deliveries (id, notification_id, recipient_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (notification_id, recipient_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(notification_id)
        .bind(recipient_id)
        .execute(pool)
        .await?;

        let record: DeliveryRecord = sqlx::query_as(
            "SELECT * FROM deliveries WHERE notification_id = $1 AND recipient_id = $2",
        )
        .bind(notification_id)
        .bind(recipient_id)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    /// Record one channel attempt's outcome on a record.
    ///
    /// Always increments the channel's persisted attempt counter. On success
    /// the channel becomes `delivered`, its error is cleared, the provider
    /// message id is kept, and `delivered_at` is set if this is the first
    /// channel to reach the recipient. On failure the channel becomes
    /// `failed` with the error text. A single atomic UPDATE, safe under
    /// concurrent dispatch and retry passes.
    pub async fn update_channel(
        pool: &PgPool,
        record_id: Uuid,
        channel: Channel,
        outcome: &SendOutcome,
    ) -> Result<DeliveryRecord, AppError> {
        let col = channel.as_str();
        let sql = format!(
            r#"
            UPDATE deliveries
            SET {col}_status = $2,
                {col}_error = $3,
                {col}_message_id = COALESCE($4, {col}_message_id),
                {col}_attempts = {col}_attempts + 1,
                delivered_at = CASE WHEN $5 THEN COALESCE(delivered_at, NOW()) ELSE delivered_at END
            WHERE id = $1
            RETURNING *
            "#
        );

        let status = if outcome.ok {
            ChannelStatus::Delivered
        } else {
            ChannelStatus::Failed
        };
        let record: DeliveryRecord = sqlx::query_as(&sql)
            .bind(record_id)
            .bind(status.to_string())
            .bind(&outcome.error)
            .bind(&outcome.provider_message_id)
            .bind(outcome.ok)
            .fetch_one(pool)
            .await?;

        Ok(record)
    }

    /// Mark a notification read for a recipient. Idempotent: the first
    /// `read_at` written is kept, later calls are no-ops. The record is
    /// created if dispatch never got around to this recipient — reading is
    /// a recipient action, independent of delivery success.
    pub async fn mark_read(
        pool: &PgPool,
        notification_id: Uuid,
        recipient_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<DeliveryRecord, AppError> {
        Self::get_or_create(pool, notification_id, recipient_id).await?;

        let record: DeliveryRecord = sqlx::query_as(
            r#"
            UPDATE deliveries
            SET read_at = COALESCE(read_at, $3)
            WHERE notification_id = $1 AND recipient_id = $2
            RETURNING *
            "#,
        )
        .bind(notification_id)
        .bind(recipient_id)
        .bind(at)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    /// Number of notifications visible to the recipient in this school with
    /// no read mark. Deliberately independent of delivery success: a
    /// recipient no channel ever reached still sees the notification as
    /// unread until they read it in-app.
    pub async fn unread_count(
        pool: &PgPool,
        recipient_id: Uuid,
        school_id: Uuid,
    ) -> Result<i64, AppError> {
        let sql = format!(
            r#"
            SELECT COUNT(*)
            FROM notifications n
            WHERE {VISIBLE_TO_RECIPIENT}
              AND NOT EXISTS (
                  SELECT 1 FROM deliveries d
                  WHERE d.notification_id = n.id
                    AND d.recipient_id = $1
                    AND d.read_at IS NOT NULL
              )
            "#
        );

        let (count,): (i64,) = sqlx::query_as(&sql)
            .bind(recipient_id)
            .bind(school_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// All delivery records for a notification, oldest first.
    pub async fn list_for_notification(
        pool: &PgPool,
        notification_id: Uuid,
    ) -> Result<Vec<DeliveryRecord>, AppError> {
        let records: Vec<DeliveryRecord> =
            sqlx::query_as("SELECT * FROM deliveries WHERE notification_id = $1 ORDER BY created_at")
                .bind(notification_id)
                .fetch_all(pool)
                .await?;

        Ok(records)
    }
}
