//! Local no-op sender for development wiring and tests.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use herald_common::types::SendOutcome;

use crate::ChannelSender;

/// A sender that delivers nowhere. Either always succeeds (with a synthetic
/// message id) or always fails with a fixed error, and counts its calls so
/// tests can assert how often a channel was attempted.
pub struct LocalSender {
    label: &'static str,
    failure: Option<String>,
    sent: AtomicU32,
}

impl LocalSender {
    /// A sender whose every attempt succeeds.
    pub fn delivering(label: &'static str) -> Self {
        Self {
            label,
            failure: None,
            sent: AtomicU32::new(0),
        }
    }

    /// A sender whose every attempt fails with `error`.
    pub fn failing(label: &'static str, error: impl Into<String>) -> Self {
        Self {
            label,
            failure: Some(error.into()),
            sent: AtomicU32::new(0),
        }
    }

    /// Number of send attempts made through this sender.
    pub fn sent_count(&self) -> u32 {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelSender for LocalSender {
    async fn send(
        &self,
        address: &str,
        title: &str,
        _body: &str,
        _payload: &serde_json::Value,
    ) -> SendOutcome {
        let seq = self.sent.fetch_add(1, Ordering::SeqCst) + 1;

        match &self.failure {
            None => {
                tracing::info!(sender = self.label, address, title, "Local delivery");
                SendOutcome::delivered(format!("{}-{}", self.label, seq))
            }
            Some(error) => {
                tracing::warn!(sender = self.label, address, title, error = %error, "Local delivery failed");
                SendOutcome::failed(error.clone())
            }
        }
    }

    fn name(&self) -> &'static str {
        self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delivering_sender_counts_and_ids() {
        let sender = LocalSender::delivering("local-test");
        let payload = serde_json::json!({});

        let first = sender.send("addr", "t", "b", &payload).await;
        let second = sender.send("addr", "t", "b", &payload).await;

        assert!(first.ok);
        assert_eq!(first.provider_message_id.as_deref(), Some("local-test-1"));
        assert_eq!(second.provider_message_id.as_deref(), Some("local-test-2"));
        assert_eq!(sender.sent_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_sender_reports_error() {
        let sender = LocalSender::failing("local-test", "provider down");
        let outcome = sender.send("addr", "t", "b", &serde_json::json!({})).await;

        assert!(!outcome.ok);
        assert_eq!(outcome.error.as_deref(), Some("provider down"));
        assert!(outcome.provider_message_id.is_none());
        assert_eq!(sender.sent_count(), 1);
    }
}
