//! Reply wording. Every user-visible string the router sends lives here so
//! handlers stay free of copy and tests can assert on stable fragments.

use dealbot_core::domain::{AccountRecord, ContactRecord, DealRecord, PendingDeal};
use dealbot_core::errors::{ParseError, ValidationError};

pub const DEAL_SYNTAX: &str =
    "@bot deal name <name> account <account> stage <stage> pipeline <pipeline>";
pub const NOTE_SYNTAX: &str = "@bot note <deal> note_content <text>";
pub const CONTACT_SYNTAX: &str = "@bot add contact <name> company <company>";
pub const UPDATE_STAGE_SYNTAX: &str = "@bot update deal <deal> stage <stage>";

pub fn help_text() -> String {
    [
        "🤖 Dealbot commands:",
        "• @bot add contact <name> company <company>",
        "• @bot create deal",
        "• @bot deal name <name> account <account> stage <stage> pipeline <pipeline>",
        "• @bot note <deal> note_content <text>",
        "• @bot update deal <deal> stage <stage>",
        "• @bot search contact <name>",
        "• @bot search deal <name>",
        "• @bot search account <name>",
        "Reply yes or no when asked to confirm a deal.",
    ]
    .join("\n")
}

pub fn creation_prompt() -> String {
    format!("To create a deal, send:\n{DEAL_SYNTAX}")
}

pub fn deal_preview(deal: &PendingDeal) -> String {
    format!(
        "Please confirm the new deal:\n\
         • Deal: {}\n\
         • Account: {}\n\
         • Stage: {}\n\
         • Pipeline: {}\n\
         Reply yes to create it or no to cancel.",
        deal.deal_name, deal.account_name, deal.stage, deal.pipeline
    )
}

pub fn confirmation_reminder() -> String {
    "⚠️ You have a deal waiting for confirmation. Please reply yes or no.".to_string()
}

pub fn cancellation_ack(deal: &PendingDeal) -> String {
    format!("❌ Deal `{}` was not created.", deal.deal_name)
}

pub fn deal_created(deal: &DealRecord) -> String {
    format!("✅ Deal `{}` created in stage {}.", deal.deal_name, deal.stage)
}

pub fn contact_added(contact: &ContactRecord) -> String {
    match &contact.account_name {
        Some(account) => format!("✅ Contact `{}` added under {}.", contact.full_name, account),
        None => format!("✅ Contact `{}` added.", contact.full_name),
    }
}

pub fn note_added(deal_name: &str) -> String {
    format!("✅ Note added to `{deal_name}`.")
}

pub fn stage_updated(deal_name: &str, stage: &str) -> String {
    format!("✅ `{deal_name}` moved to stage {stage}.")
}

/// Parse failures echo the full expected syntax so the sender can fix the
/// message without consulting help.
pub fn parse_failure(error: &ParseError, syntax: &str) -> String {
    match error {
        ParseError::MissingMarker { marker } => {
            format!("⚠️ Could not find `{marker}` in your message. Expected:\n{syntax}")
        }
        ParseError::EmptyField { field } => {
            format!("⚠️ The `{field}` value is empty. Expected:\n{syntax}")
        }
    }
}

/// Dropdown rejections list the complete allowed vocabulary in catalog order.
pub fn dropdown_rejection(error: &ValidationError) -> String {
    format!(
        "⚠️ `{}` is not a valid {}. Allowed values: {}",
        error.value,
        error.field,
        error.allowed.join(", ")
    )
}

pub fn not_found(entity: &str, query: &str) -> String {
    format!("⚠️ No {entity} found matching `{query}`.")
}

pub fn crm_failure(action: &str, detail: &str) -> String {
    format!("❌ Could not {action}: {detail}")
}

pub fn contact_found(contact: &ContactRecord) -> String {
    match &contact.account_name {
        Some(account) => format!("Found contact: {} ({})", contact.full_name, account),
        None => format!("Found contact: {}", contact.full_name),
    }
}

pub fn deal_found(deal: &DealRecord) -> String {
    match &deal.account_name {
        Some(account) => {
            format!("Found deal: {} [{}] for {}", deal.deal_name, deal.stage, account)
        }
        None => format!("Found deal: {} [{}]", deal.deal_name, deal.stage),
    }
}

pub fn account_found(account: &AccountRecord) -> String {
    match &account.website {
        Some(website) => format!("Found account: {} ({})", account.account_name, website),
        None => format!("Found account: {}", account.account_name),
    }
}

pub fn fallback_unavailable() -> String {
    "❌ I could not process that right now. Try `@bot help` for the command list.".to_string()
}
