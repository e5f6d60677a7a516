use serde::{Deserialize, Serialize};

/// Opaque conversation key, shaped like `whatsapp:+14155551234` on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SenderId(pub String);

impl SenderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SenderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One chat message as delivered by the webhook, immutable per invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub text: String,
    pub sender: SenderId,
}

impl InboundMessage {
    pub fn new(text: impl Into<String>, sender: SenderId) -> Self {
        Self { text: text.into(), sender }
    }
}
