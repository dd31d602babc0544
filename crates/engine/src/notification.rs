//! Notification service — the engine's inbound trigger and query surface.

use sqlx::PgPool;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{
    DeliverySummary, DispatchSummary, Notification, NotificationCategory, RecipientNotification,
    Targeting,
};

use crate::dispatch::DispatchEngine;
use crate::ledger::VISIBLE_TO_RECIPIENT;

/// Notifications per page in recipient listings.
const PAGE_SIZE: i64 = 20;

/// Parameters for creating a notification.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateNotificationParams {
    pub school_id: Uuid,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    pub targeting: Targeting,
    pub payload: Option<serde_json::Value>,
}

/// Service layer for notification lifecycle operations.
pub struct NotificationService;

impl NotificationService {
    /// Create a notification and run its first dispatch pass.
    pub async fn create_and_send(
        pool: &PgPool,
        engine: &DispatchEngine,
        params: &CreateNotificationParams,
    ) -> Result<(Uuid, DispatchSummary), AppError> {
        let notification = Self::create(pool, params).await?;
        let summary = engine.send(&notification).await?;
        Ok((notification.id, summary))
    }

    /// Create a notification record and store its targeting.
    ///
    /// An empty explicit target list is rejected — auto-targeting is an
    /// explicit mode, never inferred from an empty list.
    pub async fn create(
        pool: &PgPool,
        params: &CreateNotificationParams,
    ) -> Result<Notification, AppError> {
        if params.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }
        if let Targeting::Explicit(ids) = &params.targeting
            && ids.is_empty()
        {
            return Err(AppError::Validation(
                "explicit targeting requires a non-empty recipient id list".to_string(),
            ));
        }

        let (school_exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM schools WHERE id = $1)")
                .bind(params.school_id)
                .fetch_one(pool)
                .await?;
        if !school_exists {
            return Err(AppError::NotFound(format!(
                "School {} not found",
                params.school_id
            )));
        }

        let id = Uuid::new_v4();
        let payload = params.payload.clone().unwrap_or(serde_json::json!({}));

        let notification: Notification = sqlx::query_as(
            r#"
            INSERT INTO notifications (id, school_id, title, body, category, target_mode, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(params.school_id)
        .bind(&params.title)
        .bind(&params.body)
        .bind(params.category)
        .bind(params.targeting.mode())
        .bind(&payload)
        .fetch_one(pool)
        .await?;

        if let Targeting::Explicit(ids) = &params.targeting {
            for recipient_id in ids {
                sqlx::query(
                    r#"
                    INSERT INTO notification_targets (notification_id, recipient_id)
                    VALUES ($1, $2)
                    ON CONFLICT DO NOTHING
                    "#,
                )
                .bind(notification.id)
                .bind(recipient_id)
                .execute(pool)
                .await?;
            }
        }

        tracing::info!(
            notification_id = %notification.id,
            school_id = %params.school_id,
            category = %params.category,
            target_mode = %notification.target_mode,
            "Notification created"
        );

        Ok(notification)
    }

    /// Get a single notification by ID.
    pub async fn get(pool: &PgPool, notification_id: Uuid) -> Result<Notification, AppError> {
        let notification: Notification =
            sqlx::query_as("SELECT * FROM notifications WHERE id = $1")
                .bind(notification_id)
                .fetch_optional(pool)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Notification {} not found", notification_id))
                })?;

        Ok(notification)
    }

    /// Re-run dispatch for an existing notification.
    ///
    /// Auto targeting re-resolves against current membership, so newly
    /// enrolled guardians are picked up; the ledger's unique-key upsert
    /// guarantees no duplicate delivery records, and channels that already
    /// reached a recipient are skipped.
    pub async fn resend(
        pool: &PgPool,
        engine: &DispatchEngine,
        notification_id: Uuid,
    ) -> Result<DispatchSummary, AppError> {
        let notification = Self::get(pool, notification_id).await?;
        engine.send(&notification).await
    }

    /// Delete a notification; its delivery records cascade away with it.
    /// Returns true if it existed.
    pub async fn delete(pool: &PgPool, notification_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(notification_id)
            .execute(pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(notification_id = %notification_id, "Notification deleted");
        }

        Ok(deleted)
    }

    /// Notifications visible to a recipient within a school, newest first.
    pub async fn list_for_recipient(
        pool: &PgPool,
        recipient_id: Uuid,
        school_id: Uuid,
        page: u32,
    ) -> Result<Vec<RecipientNotification>, AppError> {
        let sql = format!(
            r#"
            SELECT n.id, n.school_id, n.title, n.body, n.category, n.payload,
                   n.created_at, n.sent_at, d.read_at
            FROM notifications n
            LEFT JOIN deliveries d
                ON d.notification_id = n.id AND d.recipient_id = $1
            WHERE {VISIBLE_TO_RECIPIENT}
            ORDER BY n.created_at DESC
            LIMIT $3 OFFSET $4
            "#
        );

        let notifications: Vec<RecipientNotification> = sqlx::query_as(&sql)
            .bind(recipient_id)
            .bind(school_id)
            .bind(PAGE_SIZE)
            .bind(page as i64 * PAGE_SIZE)
            .fetch_all(pool)
            .await?;

        Ok(notifications)
    }

    /// Aggregated delivery counts for a notification.
    pub async fn delivery_summary(
        pool: &PgPool,
        notification_id: Uuid,
    ) -> Result<DeliverySummary, AppError> {
        // 404 for an unknown notification rather than an all-zero summary
        Self::get(pool, notification_id).await?;

        let (recipients, push_delivered, email_delivered, sms_delivered, read): (
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE push_status = 'delivered'),
                   COUNT(*) FILTER (WHERE email_status = 'delivered'),
                   COUNT(*) FILTER (WHERE sms_status = 'delivered'),
                   COUNT(*) FILTER (WHERE read_at IS NOT NULL)
            FROM deliveries
            WHERE notification_id = $1
            "#,
        )
        .bind(notification_id)
        .fetch_one(pool)
        .await?;

        Ok(DeliverySummary {
            notification_id,
            recipients,
            push_delivered,
            email_delivered,
            sms_delivered,
            read,
        })
    }
}
