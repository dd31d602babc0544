//! Delivery channel adapters.
//!
//! One [`ChannelSender`] implementation per channel (push, email, SMS), plus
//! a local no-op sender for development and tests. The implementation for
//! each channel is chosen once at process wiring time via
//! [`ChannelSenders::from_config`] — nothing in the dispatch path reads a
//! runtime mock-vs-real flag.

pub mod email;
pub mod local;
pub mod push;
pub mod sms;

use std::sync::Arc;

use async_trait::async_trait;

use herald_common::config::AppConfig;
use herald_common::types::{Channel, SendOutcome};

pub use email::ResendSender;
pub use local::LocalSender;
pub use push::FcmSender;
pub use sms::SmsGatewaySender;

/// One delivery mechanism's provider adapter.
///
/// Implementations must be safe to call concurrently from multiple dispatch
/// workers, and must report ordinary delivery failures (network errors,
/// provider rejection, invalid address) through [`SendOutcome`] rather than
/// panicking or returning an error type.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Attempt delivery of a rendered message to one address/token.
    async fn send(
        &self,
        address: &str,
        title: &str,
        body: &str,
        payload: &serde_json::Value,
    ) -> SendOutcome;

    /// Short adapter name used in logs (e.g. `"fcm"`, `"resend"`, `"local"`).
    fn name(&self) -> &'static str;
}

/// The full set of channel adapters the engine dispatches through.
#[derive(Clone)]
pub struct ChannelSenders {
    pub push: Arc<dyn ChannelSender>,
    pub email: Arc<dyn ChannelSender>,
    pub sms: Arc<dyn ChannelSender>,
}

impl ChannelSenders {
    pub fn new(
        push: Arc<dyn ChannelSender>,
        email: Arc<dyn ChannelSender>,
        sms: Arc<dyn ChannelSender>,
    ) -> Self {
        Self { push, email, sms }
    }

    /// All-local senders, every send succeeds. Used in tests and local runs.
    pub fn local() -> Self {
        Self {
            push: Arc::new(LocalSender::delivering("local-push")),
            email: Arc::new(LocalSender::delivering("local-email")),
            sms: Arc::new(LocalSender::delivering("local-sms")),
        }
    }

    pub fn get(&self, channel: Channel) -> &Arc<dyn ChannelSender> {
        match channel {
            Channel::Push => &self.push,
            Channel::Email => &self.email,
            Channel::Sms => &self.sms,
        }
    }

    /// Wire adapters from configuration. A channel whose provider credential
    /// is configured gets the real adapter; otherwise the local no-op sender
    /// stands in. The choice is made here, once, and never revisited inside
    /// the dispatch path.
    pub fn from_config(config: &AppConfig) -> Self {
        let client = reqwest::Client::new();

        let push: Arc<dyn ChannelSender> = match &config.fcm_server_key {
            Some(key) => Arc::new(FcmSender::new(
                client.clone(),
                config.fcm_api_url.clone(),
                key.clone(),
            )),
            None => Arc::new(LocalSender::delivering("local-push")),
        };

        let email: Arc<dyn ChannelSender> = match (&config.resend_api_key, &config.email_from) {
            (Some(key), Some(from)) => Arc::new(ResendSender::new(
                client.clone(),
                key.clone(),
                from.clone(),
            )),
            _ => Arc::new(LocalSender::delivering("local-email")),
        };

        let sms: Arc<dyn ChannelSender> = match (&config.sms_api_url, &config.sms_api_key) {
            (Some(url), Some(key)) => Arc::new(SmsGatewaySender::new(
                client,
                url.clone(),
                key.clone(),
                config.sms_from.clone().unwrap_or_default(),
            )),
            _ => Arc::new(LocalSender::delivering("local-sms")),
        };

        let senders = Self { push, email, sms };
        tracing::info!(
            push = senders.push.name(),
            email = senders.email.name(),
            sms = senders.sms.name(),
            "Channel senders wired"
        );
        senders
    }
}
