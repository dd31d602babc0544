//! Retry coordinator — resubmits failed channel deliveries, bounded by a
//! persisted per-(record, channel) attempt budget.

use std::time::Duration;

use sqlx::PgPool;
use uuid::Uuid;

use herald_channels::ChannelSenders;
use herald_common::error::AppError;
use herald_common::types::{Channel, DeliveryRecord, Notification, Recipient, RetrySummary};

use crate::dispatch;
use crate::preference::PreferenceGate;

/// Finds delivery records with outstanding channel failures and re-invokes
/// only the failed channel's send step for each.
#[derive(Clone)]
pub struct RetryCoordinator {
    pool: PgPool,
    senders: ChannelSenders,
}

impl RetryCoordinator {
    pub fn new(pool: PgPool, senders: ChannelSenders) -> Self {
        Self { pool, senders }
    }

    /// One retry sweep.
    ///
    /// A (record, channel) pair is eligible when the channel's status is
    /// `failed` — a failed attempt proves the notification intended that
    /// channel; `not_attempted` channels (e.g. the recipient never enabled
    /// them) are never retried — and its persisted attempt counter is below
    /// `max_attempts_per_channel`. The counter lives on the delivery row, so
    /// the budget survives process restarts.
    pub async fn retry_failed(
        &self,
        max_attempts_per_channel: i32,
    ) -> Result<RetrySummary, AppError> {
        let mut summary = RetrySummary::default();

        for channel in Channel::ALL {
            let col = channel.as_str();
            let sql = format!(
                r#"
                SELECT * FROM deliveries
                WHERE {col}_status = 'failed'
                  AND {col}_attempts < $1
                ORDER BY created_at
                "#
            );
            let records: Vec<DeliveryRecord> = sqlx::query_as(&sql)
                .bind(max_attempts_per_channel)
                .fetch_all(&self.pool)
                .await?;

            for record in records {
                self.retry_channel(&record, channel, &mut summary).await;
            }
        }

        if summary.attempted > 0 {
            tracing::info!(
                attempted = summary.attempted,
                recovered = summary.recovered,
                still_failed = summary.still_failed,
                "Retry sweep complete"
            );
        }

        Ok(summary)
    }

    /// Retry a single failed channel on one record. Storage errors are
    /// fatal to this pair only; the sweep carries on.
    async fn retry_channel(&self, record: &DeliveryRecord, channel: Channel, summary: &mut RetrySummary) {
        let (notification, recipient) =
            match self.load_pair(record.notification_id, record.recipient_id).await {
                Ok(Some(pair)) => pair,
                Ok(None) => return,
                Err(e) => {
                    summary.still_failed += 1;
                    tracing::error!(
                        delivery_id = %record.id,
                        channel = %channel,
                        error = %e,
                        "Retry unit failed to load context"
                    );
                    return;
                }
            };

        // Preferences may have changed since the original attempt; a
        // recipient who has since opted out is skipped, not counted.
        if !PreferenceGate::allows(&recipient, channel) {
            return;
        }

        summary.attempted += 1;
        let sender = self.senders.get(channel);
        match dispatch::send_channel(
            &self.pool,
            sender,
            &notification,
            &recipient,
            record.id,
            channel,
        )
        .await
        {
            Ok(true) => summary.recovered += 1,
            Ok(false) => summary.still_failed += 1,
            Err(e) => {
                summary.still_failed += 1;
                tracing::error!(
                    delivery_id = %record.id,
                    channel = %channel,
                    error = %e,
                    "Retry unit failed"
                );
            }
        }
    }

    /// The notification and recipient a record refers to, if both still exist.
    async fn load_pair(
        &self,
        notification_id: Uuid,
        recipient_id: Uuid,
    ) -> Result<Option<(Notification, Recipient)>, AppError> {
        let notification: Option<Notification> =
            sqlx::query_as("SELECT * FROM notifications WHERE id = $1")
                .bind(notification_id)
                .fetch_optional(&self.pool)
                .await?;

        let recipient: Option<Recipient> = sqlx::query_as("SELECT * FROM recipients WHERE id = $1")
            .bind(recipient_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(notification.zip(recipient))
    }

    /// Periodic sweep loop. Runs until the task is cancelled.
    pub async fn run(self, interval: Duration, max_attempts_per_channel: i32) {
        tracing::info!(
            interval_secs = interval.as_secs(),
            max_attempts_per_channel,
            "Retry coordinator started"
        );

        loop {
            tokio::time::sleep(interval).await;

            if let Err(e) = self.retry_failed(max_attempts_per_channel).await {
                tracing::error!(error = %e, "Retry sweep failed");
            }
        }
    }
}
