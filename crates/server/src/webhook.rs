//! Inbound webhook for Twilio WhatsApp messages.
//!
//! Twilio delivers messages as form posts and treats non-2xx responses as
//! delivery failures worth retrying, so this endpoint always answers
//! `200 OK` with a plain body. The reply travels out of band through the
//! messaging API, never in the webhook response.

use std::sync::Arc;

use axum::{extract::State, routing::post, Form, Router};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use dealbot_core::domain::{InboundMessage, SenderId};
use dealbot_whatsapp::outbound::Messenger;
use dealbot_whatsapp::router::DirectiveRouter;

#[derive(Clone)]
pub struct WebhookState {
    router: Arc<DirectiveRouter>,
    messenger: Arc<dyn Messenger>,
}

#[derive(Debug, Deserialize)]
pub struct TwilioInboundForm {
    #[serde(rename = "Body", default)]
    body: String,
    #[serde(rename = "From", default)]
    from: String,
}

pub fn router(router: Arc<DirectiveRouter>, messenger: Arc<dyn Messenger>) -> Router {
    Router::new()
        .route("/webhook/whatsapp", post(receive))
        .with_state(WebhookState { router, messenger })
}

pub async fn receive(
    State(state): State<WebhookState>,
    Form(form): Form<TwilioInboundForm>,
) -> &'static str {
    let correlation_id = Uuid::new_v4().simple().to_string();

    let sender = form.from.trim();
    if sender.is_empty() {
        warn!(event_name = "webhook_missing_sender", correlation_id, "dropping message");
        return "OK";
    }
    if form.body.trim().is_empty() {
        info!(event_name = "webhook_empty_body", correlation_id, "nothing to route");
        return "OK";
    }

    let message = InboundMessage::new(form.body.clone(), SenderId(sender.to_owned()));
    info!(event_name = "webhook_message_received", correlation_id, sender = %message.sender);

    let reply = state.router.handle_message(&message).await;
    if let Err(delivery_error) = state.messenger.send(&message.sender, &reply).await {
        error!(
            event_name = "webhook_reply_delivery_failed",
            correlation_id,
            error = %delivery_error,
            "reply could not be delivered"
        );
    }

    "OK"
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{extract::State, Form};

    use dealbot_core::catalog::Catalogs;
    use dealbot_core::domain::SenderId;
    use dealbot_core::session::SessionStore;
    use dealbot_whatsapp::outbound::{DeliveryError, Messenger};
    use dealbot_whatsapp::router::{DirectiveRouter, NoopAssistantService, NoopCrmService};

    use super::{receive, TwilioInboundForm, WebhookState};

    #[derive(Default)]
    struct RecordingMessenger {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send(&self, to: &SenderId, body: &str) -> Result<(), DeliveryError> {
            self.sent.lock().expect("lock").push((to.as_str().to_owned(), body.to_owned()));
            Ok(())
        }
    }

    fn state_with(messenger: Arc<RecordingMessenger>) -> WebhookState {
        WebhookState {
            router: Arc::new(DirectiveRouter::new(
                Arc::new(NoopCrmService),
                Arc::new(NoopAssistantService),
                Arc::new(SessionStore::new()),
                Catalogs::default(),
            )),
            messenger,
        }
    }

    #[tokio::test]
    async fn routes_and_replies_to_exactly_one_message() {
        let messenger = Arc::new(RecordingMessenger::default());
        let state = state_with(Arc::clone(&messenger));

        let response = receive(
            State(state),
            Form(TwilioInboundForm {
                body: "@bot help".to_owned(),
                from: "whatsapp:+15550001111".to_owned(),
            }),
        )
        .await;

        assert_eq!(response, "OK");
        let sent = messenger.sent.lock().expect("lock");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "whatsapp:+15550001111");
        assert!(sent[0].1.contains("create deal"));
    }

    #[tokio::test]
    async fn empty_body_is_acknowledged_without_a_reply() {
        let messenger = Arc::new(RecordingMessenger::default());
        let state = state_with(Arc::clone(&messenger));

        let response = receive(
            State(state),
            Form(TwilioInboundForm {
                body: "   ".to_owned(),
                from: "whatsapp:+15550001111".to_owned(),
            }),
        )
        .await;

        assert_eq!(response, "OK");
        assert!(messenger.sent.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn missing_sender_is_acknowledged_without_a_reply() {
        let messenger = Arc::new(RecordingMessenger::default());
        let state = state_with(Arc::clone(&messenger));

        let response = receive(
            State(state),
            Form(TwilioInboundForm { body: "@bot help".to_owned(), from: String::new() }),
        )
        .await;

        assert_eq!(response, "OK");
        assert!(messenger.sent.lock().expect("lock").is_empty());
    }
}
