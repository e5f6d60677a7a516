pub mod message;
pub mod records;

pub use message::{InboundMessage, SenderId};
pub use records::{AccountRecord, ContactRecord, DealRecord};

use serde::{Deserialize, Serialize};

/// A validated deal-creation request parked while its sender answers yes/no.
///
/// `stage` and `pipeline` always hold catalog-canonical casing; raw user text
/// never reaches this struct.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDeal {
    pub deal_name: String,
    pub account_name: String,
    pub stage: String,
    pub pipeline: String,
}

/// A classified, parameter-complete CRM operation ready for the CRM client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionRequest {
    AddContact { name: String, company: String },
    CreateDeal { deal: PendingDeal },
    AddNote { deal_name: String, body: String },
    UpdateDealStage { deal_name: String, stage: String },
    SearchContact { query: String },
    SearchDeal { query: String },
    SearchAccount { query: String },
}
