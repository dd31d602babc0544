//! Dispatch engine — fans one notification out to its resolved recipients.
//!
//! Per-recipient send units run concurrently under a fixed-size worker pool;
//! the pool exists to cap simultaneous outbound calls to channel providers,
//! not to parallelize CPU work. Units share no mutable state beyond the
//! delivery ledger, whose unique-key upserts make racing passes safe.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use herald_channels::{ChannelSender, ChannelSenders};
use herald_common::error::AppError;
use herald_common::types::{Channel, ChannelStatus, DispatchSummary, Notification, Recipient};

use crate::ledger::DeliveryLedger;
use crate::preference::PreferenceGate;
use crate::targeting::TargetResolver;

/// Orchestrates one notification's fan-out.
#[derive(Clone)]
pub struct DispatchEngine {
    pool: PgPool,
    senders: ChannelSenders,
    concurrency: usize,
}

impl DispatchEngine {
    pub fn new(pool: PgPool, senders: ChannelSenders, concurrency: usize) -> Self {
        Self {
            pool,
            senders,
            concurrency: concurrency.max(1),
        }
    }

    /// Run one dispatch pass for a notification.
    ///
    /// An empty resolved target set returns a zero summary and leaves the
    /// notification unsent, so a later call (after recipients are added) can
    /// still succeed. Channel failures are recorded per record and never
    /// abort the fan-out; a unit that cannot reach the ledger is logged and
    /// excluded from the counts while the other units keep their results.
    pub async fn send(&self, notification: &Notification) -> Result<DispatchSummary, AppError> {
        let targets = TargetResolver::resolve_for(&self.pool, notification).await?;

        let mut summary = DispatchSummary {
            target_count: targets.len() as u32,
            ..DispatchSummary::default()
        };

        if targets.is_empty() {
            tracing::info!(
                notification_id = %notification.id,
                "No recipients resolved; notification left unsent"
            );
            return Ok(summary);
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let notification = Arc::new(notification.clone());
        let mut units = JoinSet::new();

        for recipient_id in targets {
            let semaphore = semaphore.clone();
            let pool = self.pool.clone();
            let senders = self.senders.clone();
            let notification = Arc::clone(&notification);

            units.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        send_to_recipient(&pool, &senders, &notification, recipient_id).await
                    }
                    Err(_) => Err(AppError::Internal("dispatch semaphore closed".to_string())),
                };
                (recipient_id, result)
            });
        }

        let mut failed_units = 0u32;
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok((_, Ok(unit))) => {
                    summary.push_count += unit.push as u32;
                    summary.email_count += unit.email as u32;
                    summary.sms_count += unit.sms as u32;
                }
                Ok((recipient_id, Err(e))) => {
                    failed_units += 1;
                    tracing::error!(
                        notification_id = %notification.id,
                        recipient_id = %recipient_id,
                        error = %e,
                        "Send unit failed"
                    );
                }
                Err(e) => {
                    failed_units += 1;
                    tracing::error!(
                        notification_id = %notification.id,
                        error = %e,
                        "Send unit panicked"
                    );
                }
            }
        }

        // sent_at is set once, on the first pass that reached anyone; the
        // sent_via flags only ever accumulate.
        if summary.reached_any() {
            sqlx::query(
                r#"
                UPDATE notifications
                SET sent_via_push = sent_via_push OR $2,
                    sent_via_email = sent_via_email OR $3,
                    sent_via_sms = sent_via_sms OR $4,
                    sent_at = COALESCE(sent_at, NOW())
                WHERE id = $1
                "#,
            )
            .bind(notification.id)
            .bind(summary.push_count > 0)
            .bind(summary.email_count > 0)
            .bind(summary.sms_count > 0)
            .execute(&self.pool)
            .await?;
        }

        tracing::info!(
            notification_id = %notification.id,
            targets = summary.target_count,
            push = summary.push_count,
            email = summary.email_count,
            sms = summary.sms_count,
            failed_units,
            "Dispatch pass complete"
        );

        Ok(summary)
    }
}

/// Channels that reached the recipient during one send unit.
#[derive(Debug, Clone, Copy, Default)]
struct UnitOutcome {
    push: bool,
    email: bool,
    sms: bool,
}

impl UnitOutcome {
    fn mark(&mut self, channel: Channel) {
        match channel {
            Channel::Push => self.push = true,
            Channel::Email => self.email = true,
            Channel::Sms => self.sms = true,
        }
    }
}

/// The per-recipient send unit.
///
/// Channel failures are recorded on the ledger and never propagated; only a
/// failure to read or write the ledger itself is a unit-level error. Each
/// channel's outcome is persisted as soon as it is known, so a failure in
/// one channel cannot lose a success already recorded for another.
async fn send_to_recipient(
    pool: &PgPool,
    senders: &ChannelSenders,
    notification: &Notification,
    recipient_id: Uuid,
) -> Result<UnitOutcome, AppError> {
    let recipient: Recipient = sqlx::query_as("SELECT * FROM recipients WHERE id = $1")
        .bind(recipient_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipient {} not found", recipient_id)))?;

    let record = DeliveryLedger::get_or_create(pool, notification.id, recipient_id).await?;

    let mut outcome = UnitOutcome::default();
    for channel in Channel::ALL {
        if !PreferenceGate::allows(&recipient, channel) {
            continue;
        }
        // Never re-send a channel that already reached this recipient.
        if record.channel_status(channel) == ChannelStatus::Delivered {
            continue;
        }
        let sender = senders.get(channel);
        if send_channel(pool, sender, notification, &recipient, record.id, channel).await? {
            outcome.mark(channel);
        }
    }

    Ok(outcome)
}

/// One channel's send step: invoke the sender and persist the result on the
/// record. Returns whether the channel reached the recipient. This is also
/// the step the retry coordinator re-invokes for a single failed channel.
pub(crate) async fn send_channel(
    pool: &PgPool,
    sender: &Arc<dyn ChannelSender>,
    notification: &Notification,
    recipient: &Recipient,
    record_id: Uuid,
    channel: Channel,
) -> Result<bool, AppError> {
    let Some(address) = recipient.address_for(channel) else {
        return Ok(false);
    };

    let result = sender
        .send(
            address,
            &notification.title,
            &notification.body,
            &notification.payload,
        )
        .await;

    if !result.ok {
        tracing::warn!(
            notification_id = %notification.id,
            recipient_id = %recipient.id,
            channel = %channel,
            error = result.error.as_deref().unwrap_or("unknown"),
            "Channel delivery failed"
        );
    }

    DeliveryLedger::update_channel(pool, record_id, channel, &result).await?;
    Ok(result.ok)
}
