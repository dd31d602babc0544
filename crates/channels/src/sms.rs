//! SMS adapter for a generic HTTP gateway.

use async_trait::async_trait;

use herald_common::types::SendOutcome;

use crate::ChannelSender;

/// SMS delivery through an HTTP gateway (Twilio-style JSON POST).
pub struct SmsGatewaySender {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl SmsGatewaySender {
    pub fn new(client: reqwest::Client, api_url: String, api_key: String, from: String) -> Self {
        Self {
            client,
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl ChannelSender for SmsGatewaySender {
    async fn send(
        &self,
        address: &str,
        title: &str,
        body: &str,
        _payload: &serde_json::Value,
    ) -> SendOutcome {
        let request = serde_json::json!({
            "to": address,
            "from": self.from,
            "body": format!("{title}: {body}"),
        });

        let response = match self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return SendOutcome::failed(format!("sms request failed: {e}")),
        };

        let status = response.status();
        let parsed: serde_json::Value = response.json().await.unwrap_or_default();

        if !status.is_success() {
            let detail = parsed
                .get("error")
                .and_then(|m| m.as_str())
                .unwrap_or("no detail");
            return SendOutcome::failed(format!("sms gateway returned {status}: {detail}"));
        }

        let message_id = parsed
            .get("id")
            .and_then(|i| i.as_str())
            .unwrap_or_default();
        SendOutcome::delivered(message_id)
    }

    fn name(&self) -> &'static str {
        "sms-gateway"
    }
}
