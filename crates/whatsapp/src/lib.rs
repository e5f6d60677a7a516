//! WhatsApp-facing message handling.
//!
//! The [`router::DirectiveRouter`] turns one inbound message into exactly one
//! reply string, calling the CRM and assistant services behind trait seams.
//! Reply wording lives in [`replies`]; outbound delivery is the
//! [`outbound::Messenger`] seam so transports stay swappable in tests.

pub mod outbound;
pub mod replies;
pub mod router;

pub use outbound::{DeliveryError, Messenger, NoopMessenger};
pub use router::{
    AssistantService, CrmService, CrmServiceError, DirectiveRouter, NoopAssistantService,
    NoopCrmService,
};
