pub mod catalog;
pub mod config;
pub mod directive;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod session;

pub use catalog::{Catalogs, DropdownCatalog};
pub use directive::{classify, DirectiveKind};
pub use domain::{
    AccountRecord, ActionRequest, ContactRecord, DealRecord, InboundMessage, PendingDeal, SenderId,
};
pub use errors::{ParseError, ValidationError};
pub use extract::extract_params;
pub use session::{ConfirmationDisposition, SessionStore};
