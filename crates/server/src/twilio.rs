//! Twilio WhatsApp delivery.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::debug;

use dealbot_core::config::MessagingConfig;
use dealbot_core::domain::SenderId;
use dealbot_whatsapp::outbound::{DeliveryError, Messenger};

pub struct TwilioMessenger {
    client: Client,
    config: MessagingConfig,
}

impl TwilioMessenger {
    pub fn new(client: Client, config: MessagingConfig) -> Self {
        Self { client, config }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.config.api_base_url, self.config.account_sid
        )
    }
}

#[async_trait]
impl Messenger for TwilioMessenger {
    async fn send(&self, to: &SenderId, body: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(self.config.auth_token.expose_secret()))
            .form(&[
                ("From", self.config.from_number.as_str()),
                ("To", to.as_str()),
                ("Body", body),
            ])
            .send()
            .await
            .map_err(|error| DeliveryError::Transport(error.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(event_name = "message_delivered", to = %to);
            return Ok(());
        }

        let detail = match response.json::<Value>().await {
            Ok(payload) => payload
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| payload.to_string()),
            Err(_) => format!("messaging API returned {status}"),
        };
        Err(DeliveryError::Provider(detail))
    }
}
