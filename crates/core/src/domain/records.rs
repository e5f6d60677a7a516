use serde::{Deserialize, Serialize};

/// CRM contact as returned by a lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: String,
    pub full_name: String,
    pub account_name: Option<String>,
}

/// CRM deal as returned by a lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealRecord {
    pub id: String,
    pub deal_name: String,
    pub stage: String,
    pub account_name: Option<String>,
}

/// CRM account as returned by a lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: String,
    pub account_name: String,
    pub website: Option<String>,
}
