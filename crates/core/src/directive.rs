//! Directive classification.
//!
//! Every inbound message maps to exactly one [`DirectiveKind`]. Patterns are
//! evaluated as an ordered list of (predicate, kind) pairs, first match wins,
//! so precedence is data, not accidental code order. Ordering is by
//! specificity: a structured deal submission (all four field markers) is
//! checked before the bare `create deal` cue, otherwise the less specific
//! prompt pattern would shadow every submission.

pub const BOT_PREFIX: &str = "@bot";

pub const DEAL_MARKERS: [&str; 4] = ["deal name", "account", "stage", "pipeline"];
pub const NOTE_MARKERS: [&str; 2] = ["note", "note_content"];
pub const CONTACT_MARKERS: [&str; 2] = ["contact", "company"];
pub const UPDATE_STAGE_MARKERS: [&str; 2] = ["update deal", "stage"];

/// Closed set of message classifications.
///
/// `ConfirmationReply` is produced by the session check, never by the pattern
/// table: a sender with a pending deal routes there before any pattern runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectiveKind {
    Help,
    AddContact,
    CreateDealPrompt,
    CreateDealSubmit,
    AddNote,
    UpdateDealStage,
    SearchContact,
    SearchDeal,
    SearchAccount,
    ConfirmationReply,
    Unrecognized,
}

type Predicate = fn(&str) -> bool;

/// Precedence table, most specific first. `classify` walks it top to bottom.
const PATTERNS: [(Predicate, DirectiveKind); 9] = [
    (is_help, DirectiveKind::Help),
    (is_add_contact, DirectiveKind::AddContact),
    (is_create_deal_submit, DirectiveKind::CreateDealSubmit),
    (is_create_deal_prompt, DirectiveKind::CreateDealPrompt),
    (is_add_note, DirectiveKind::AddNote),
    (is_update_deal_stage, DirectiveKind::UpdateDealStage),
    (is_search_contact, DirectiveKind::SearchContact),
    (is_search_deal, DirectiveKind::SearchDeal),
    (is_search_account, DirectiveKind::SearchAccount),
];

/// Classifies a message from a sender with no pending confirmation.
pub fn classify(text: &str) -> DirectiveKind {
    let normalized = text.trim().to_ascii_lowercase();
    if !normalized.starts_with(BOT_PREFIX) {
        return DirectiveKind::Unrecognized;
    }

    for (matches, kind) in PATTERNS {
        if matches(&normalized) {
            return kind;
        }
    }

    DirectiveKind::Unrecognized
}

fn is_help(text: &str) -> bool {
    text.strip_prefix(BOT_PREFIX).is_some_and(|rest| rest.trim() == "help")
}

fn is_add_contact(text: &str) -> bool {
    text.contains("add") && text.contains("contact") && text.contains("company")
}

fn is_create_deal_submit(text: &str) -> bool {
    DEAL_MARKERS.iter().all(|marker| text.contains(marker))
}

fn is_create_deal_prompt(text: &str) -> bool {
    text.contains("create deal")
}

fn is_add_note(text: &str) -> bool {
    NOTE_MARKERS.iter().all(|marker| text.contains(marker))
}

fn is_update_deal_stage(text: &str) -> bool {
    UPDATE_STAGE_MARKERS.iter().all(|marker| text.contains(marker))
}

fn is_search_contact(text: &str) -> bool {
    text.contains("search contact")
}

fn is_search_deal(text: &str) -> bool {
    text.contains("search deal")
}

fn is_search_account(text: &str) -> bool {
    text.contains("search account")
}

#[cfg(test)]
mod tests {
    use super::{classify, DirectiveKind};

    #[test]
    fn classifies_every_grammar_form() {
        let cases = [
            ("@bot help", DirectiveKind::Help),
            ("@bot add contact John Smith company Acme", DirectiveKind::AddContact),
            ("@bot create deal", DirectiveKind::CreateDealPrompt),
            (
                "@bot deal name Acme Renewal account Acme Corp stage HFS Filtration pipeline Moneste",
                DirectiveKind::CreateDealSubmit,
            ),
            ("@bot note Acme Renewal note_content call friday", DirectiveKind::AddNote),
            ("@bot update deal Acme Renewal stage Closed Won", DirectiveKind::UpdateDealStage),
            ("@bot search contact John", DirectiveKind::SearchContact),
            ("@bot search deal Acme Renewal", DirectiveKind::SearchDeal),
            ("@bot search account Acme", DirectiveKind::SearchAccount),
            ("what's our pipeline looking like?", DirectiveKind::Unrecognized),
        ];

        for (text, expected) in cases {
            assert_eq!(classify(text), expected, "text: {text}");
        }
    }

    #[test]
    fn classification_is_case_insensitive_on_cues() {
        assert_eq!(classify("@BOT HELP"), DirectiveKind::Help);
        assert_eq!(classify("@Bot Create Deal"), DirectiveKind::CreateDealPrompt);
    }

    #[test]
    fn submission_with_all_markers_is_never_shadowed_by_the_prompt_pattern() {
        // Contains the bare creation cue too, but the four field markers make
        // it a submission.
        let text = "@bot create deal deal name Acme Renewal account Acme stage Qualification pipeline Moneste";
        assert_eq!(classify(text), DirectiveKind::CreateDealSubmit);
    }

    #[test]
    fn creation_cue_without_structured_fields_is_a_prompt() {
        assert_eq!(classify("@bot create deal for me please"), DirectiveKind::CreateDealPrompt);
    }

    #[test]
    fn messages_without_the_bot_prefix_are_unrecognized() {
        assert_eq!(classify("deal name X account Y stage Z pipeline W"), DirectiveKind::Unrecognized);
        assert_eq!(classify("yes"), DirectiveKind::Unrecognized);
    }

    #[test]
    fn classification_is_deterministic_across_repeats() {
        let text = "@bot search deal Acme Renewal";
        let first = classify(text);
        for _ in 0..10 {
            assert_eq!(classify(text), first);
        }
    }
}
