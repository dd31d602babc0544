use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Push,
    Email,
    Sms,
}

impl Channel {
    /// All channels, in dispatch order.
    pub const ALL: [Channel; 3] = [Channel::Push, Channel::Email, Channel::Sms];

    /// Lowercase name, also the column prefix on the `deliveries` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Push => "push",
            Channel::Email => "email",
            Channel::Sms => "sms",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Academic,
    Behavior,
    Payment,
    General,
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationCategory::Academic => write!(f, "academic"),
            NotificationCategory::Behavior => write!(f, "behavior"),
            NotificationCategory::Payment => write!(f, "payment"),
            NotificationCategory::General => write!(f, "general"),
        }
    }
}

/// Per-channel delivery state on a delivery record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    NotAttempted,
    Delivered,
    Failed,
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelStatus::NotAttempted => write!(f, "not_attempted"),
            ChannelStatus::Delivered => write!(f, "delivered"),
            ChannelStatus::Failed => write!(f, "failed"),
        }
    }
}

/// How a notification's recipient set is determined at send time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    /// Resolve dynamically to all guardians associated with the school.
    Auto,
    /// A stored, caller-provided recipient id list.
    Explicit,
}

impl std::fmt::Display for TargetMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetMode::Auto => write!(f, "auto"),
            TargetMode::Explicit => write!(f, "explicit"),
        }
    }
}

/// Targeting declared when a notification is created.
///
/// An empty explicit list is rejected at creation time — auto-targeting is
/// never inferred from an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "recipient_ids", rename_all = "lowercase")]
pub enum Targeting {
    Auto,
    Explicit(Vec<Uuid>),
}

impl Targeting {
    pub fn mode(&self) -> TargetMode {
        match self {
            Targeting::Auto => TargetMode::Auto,
            Targeting::Explicit(_) => TargetMode::Explicit,
        }
    }
}

/// Recipient role within a school.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecipientRole {
    Guardian,
    Staff,
    Admin,
}

/// A recipient identity. Read-only input to the engine; owned by the
/// surrounding account system.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipient {
    pub id: Uuid,
    /// Direct school assignment. Guardians created without one gain tenant
    /// context transitively through a dependent's enrollment.
    pub school_id: Option<Uuid>,
    pub role: RecipientRole,
    pub push_token: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub push_opt_in: bool,
    pub email_opt_in: bool,
    pub sms_opt_in: bool,
    pub created_at: DateTime<Utc>,
}

impl Recipient {
    /// The address/token a channel delivers to, if present and non-empty.
    pub fn address_for(&self, channel: Channel) -> Option<&str> {
        let addr = match channel {
            Channel::Push => self.push_token.as_deref(),
            Channel::Email => self.email.as_deref(),
            Channel::Sms => self.phone.as_deref(),
        };
        addr.filter(|a| !a.is_empty())
    }

    /// The stored opt-in flag for a channel.
    pub fn opted_in(&self, channel: Channel) -> bool {
        match channel {
            Channel::Push => self.push_opt_in,
            Channel::Email => self.email_opt_in,
            Channel::Sms => self.sms_opt_in,
        }
    }
}

/// A notification addressed to one school.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub school_id: Uuid,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    pub target_mode: TargetMode,
    /// Opaque structured data carried to clients, not interpreted here.
    pub payload: serde_json::Value,
    pub sent_via_push: bool,
    pub sent_via_email: bool,
    pub sent_via_sms: bool,
    pub created_at: DateTime<Utc>,
    /// Set exactly once, on the first completed dispatch pass that reached
    /// at least one recipient. Never reset by resend or retry.
    pub sent_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn sent_via(&self, channel: Channel) -> bool {
        match channel {
            Channel::Push => self.sent_via_push,
            Channel::Email => self.sent_via_email,
            Channel::Sms => self.sent_via_sms,
        }
    }
}

/// The ledger's unit of truth: per-(notification, recipient) delivery state.
///
/// At most one row exists per pair regardless of how many times dispatch or
/// retry runs — the unique key on (notification_id, recipient_id) is enforced
/// by the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeliveryRecord {
    pub id: Uuid,
    pub notification_id: Uuid,
    pub recipient_id: Uuid,

    pub push_status: ChannelStatus,
    pub push_error: Option<String>,
    pub push_message_id: Option<String>,
    pub push_attempts: i32,

    pub email_status: ChannelStatus,
    pub email_error: Option<String>,
    pub email_message_id: Option<String>,
    pub email_attempts: i32,

    pub sms_status: ChannelStatus,
    pub sms_error: Option<String>,
    pub sms_message_id: Option<String>,
    pub sms_attempts: i32,

    /// Set when the first channel reaches the recipient; never cleared.
    pub delivered_at: Option<DateTime<Utc>>,
    /// Set by an explicit recipient action, independent of delivery success.
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DeliveryRecord {
    pub fn channel_status(&self, channel: Channel) -> ChannelStatus {
        match channel {
            Channel::Push => self.push_status,
            Channel::Email => self.email_status,
            Channel::Sms => self.sms_status,
        }
    }

    pub fn channel_attempts(&self, channel: Channel) -> i32 {
        match channel {
            Channel::Push => self.push_attempts,
            Channel::Email => self.email_attempts,
            Channel::Sms => self.sms_attempts,
        }
    }

    pub fn channel_error(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::Push => self.push_error.as_deref(),
            Channel::Email => self.email_error.as_deref(),
            Channel::Sms => self.sms_error.as_deref(),
        }
    }
}

/// Result of one channel delivery attempt, as reported by a sender.
///
/// Ordinary delivery failures (provider rejection, timeout, bad address) are
/// carried here rather than raised — callers record the outcome on the
/// ledger and move on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOutcome {
    pub ok: bool,
    /// Provider-side message id for correlation with external logs.
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn delivered(provider_message_id: impl Into<String>) -> Self {
        Self {
            ok: true,
            provider_message_id: Some(provider_message_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            provider_message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Per-notification fan-out result.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DispatchSummary {
    /// Recipients reached via push in this pass.
    pub push_count: u32,
    /// Recipients reached via email in this pass.
    pub email_count: u32,
    /// Recipients reached via SMS in this pass.
    pub sms_count: u32,
    /// Size of the resolved recipient set.
    pub target_count: u32,
}

impl DispatchSummary {
    pub fn reached_any(&self) -> bool {
        self.push_count + self.email_count + self.sms_count > 0
    }
}

/// Result of one retry sweep.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RetrySummary {
    /// Send attempts made during the sweep.
    pub attempted: u32,
    /// Channels that transitioned from failed to delivered.
    pub recovered: u32,
    /// Channels that failed again (or whose unit hit a storage error).
    pub still_failed: u32,
}

/// Aggregated per-notification delivery counts.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeliverySummary {
    pub notification_id: Uuid,
    pub recipients: i64,
    pub push_delivered: i64,
    pub email_delivered: i64,
    pub sms_delivered: i64,
    pub read: i64,
}

/// A notification as listed for one recipient, with their read state.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipientNotification {
    pub id: Uuid,
    pub school_id: Uuid,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_recipient() -> Recipient {
        Recipient {
            id: Uuid::new_v4(),
            school_id: None,
            role: RecipientRole::Guardian,
            push_token: Some("token-abc".to_string()),
            email: Some("guardian@example.com".to_string()),
            phone: None,
            push_opt_in: true,
            email_opt_in: true,
            sms_opt_in: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_address_for_missing_is_none() {
        let r = make_recipient();
        assert_eq!(r.address_for(Channel::Push), Some("token-abc"));
        assert_eq!(r.address_for(Channel::Sms), None);
    }

    #[test]
    fn test_address_for_empty_string_is_none() {
        let mut r = make_recipient();
        r.email = Some(String::new());
        assert_eq!(r.address_for(Channel::Email), None);
    }

    #[test]
    fn test_targeting_serde_forms() {
        let auto: Targeting = serde_json::from_value(serde_json::json!({"mode": "auto"})).unwrap();
        assert_eq!(auto, Targeting::Auto);

        let id = Uuid::new_v4();
        let explicit: Targeting = serde_json::from_value(serde_json::json!({
            "mode": "explicit",
            "recipient_ids": [id]
        }))
        .unwrap();
        assert_eq!(explicit, Targeting::Explicit(vec![id]));
        assert_eq!(explicit.mode(), TargetMode::Explicit);
    }

    #[test]
    fn test_outcome_constructors() {
        let ok = SendOutcome::delivered("msg-1");
        assert!(ok.ok);
        assert_eq!(ok.provider_message_id.as_deref(), Some("msg-1"));
        assert!(ok.error.is_none());

        let err = SendOutcome::failed("invalid token");
        assert!(!err.ok);
        assert!(err.provider_message_id.is_none());
        assert_eq!(err.error.as_deref(), Some("invalid token"));
    }

    #[test]
    fn test_summary_reached_any() {
        let mut summary = DispatchSummary::default();
        assert!(!summary.reached_any());
        summary.email_count = 1;
        assert!(summary.reached_any());
    }
}
