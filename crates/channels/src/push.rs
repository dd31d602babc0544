//! FCM push adapter.

use async_trait::async_trait;

use herald_common::types::SendOutcome;

use crate::ChannelSender;

/// Push delivery through Firebase Cloud Messaging's HTTP API.
pub struct FcmSender {
    client: reqwest::Client,
    api_url: String,
    server_key: String,
}

impl FcmSender {
    pub fn new(client: reqwest::Client, api_url: String, server_key: String) -> Self {
        Self {
            client,
            api_url,
            server_key,
        }
    }
}

#[async_trait]
impl ChannelSender for FcmSender {
    async fn send(
        &self,
        address: &str,
        title: &str,
        body: &str,
        payload: &serde_json::Value,
    ) -> SendOutcome {
        let request = serde_json::json!({
            "to": address,
            "notification": { "title": title, "body": body },
            "data": payload,
        });

        let response = match self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return SendOutcome::failed(format!("fcm request failed: {e}")),
        };

        if !response.status().is_success() {
            return SendOutcome::failed(format!("fcm returned status {}", response.status()));
        }

        let parsed: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => return SendOutcome::failed(format!("fcm response unreadable: {e}")),
        };

        // Per-token sends report their result in results[0]: either a
        // message_id or an error string (InvalidRegistration, NotRegistered...)
        let result = parsed.get("results").and_then(|r| r.get(0));
        if let Some(err) = result.and_then(|r| r.get("error")).and_then(|e| e.as_str()) {
            return SendOutcome::failed(err);
        }

        let message_id = result
            .and_then(|r| r.get("message_id"))
            .and_then(|m| m.as_str())
            .unwrap_or_default();
        SendOutcome::delivered(message_id)
    }

    fn name(&self) -> &'static str {
        "fcm"
    }
}
