//! Outbound delivery seam.

use async_trait::async_trait;
use thiserror::Error;

use dealbot_core::domain::SenderId;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("messaging provider rejected the send: {0}")]
    Provider(String),
    #[error("messaging transport failed: {0}")]
    Transport(String),
}

/// Sends one reply back to a WhatsApp sender.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, to: &SenderId, body: &str) -> Result<(), DeliveryError>;
}

/// Drops replies on the floor. Used by the doctor command and in tests where
/// delivery is out of scope.
#[derive(Default)]
pub struct NoopMessenger;

#[async_trait]
impl Messenger for NoopMessenger {
    async fn send(&self, _to: &SenderId, _body: &str) -> Result<(), DeliveryError> {
        Ok(())
    }
}
