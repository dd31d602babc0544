//! Email adapter backed by the Resend HTTP API.

use async_trait::async_trait;

use herald_common::types::SendOutcome;

use crate::ChannelSender;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

pub struct ResendSender {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendSender {
    pub fn new(client: reqwest::Client, api_key: String, from: String) -> Self {
        Self {
            client,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl ChannelSender for ResendSender {
    async fn send(
        &self,
        address: &str,
        title: &str,
        body: &str,
        _payload: &serde_json::Value,
    ) -> SendOutcome {
        let request = serde_json::json!({
            "from": self.from,
            "to": [address],
            "subject": title,
            "text": body,
        });

        let response = match self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return SendOutcome::failed(format!("resend request failed: {e}")),
        };

        let status = response.status();
        let parsed: serde_json::Value = response.json().await.unwrap_or_default();

        if !status.is_success() {
            let detail = parsed
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("no detail");
            return SendOutcome::failed(format!("resend returned {status}: {detail}"));
        }

        let message_id = parsed
            .get("id")
            .and_then(|i| i.as_str())
            .unwrap_or_default();
        SendOutcome::delivered(message_id)
    }

    fn name(&self) -> &'static str {
        "resend"
    }
}
