//! Per-sender confirmation state.
//!
//! The only mutable state in the core: a map from sender to at most one
//! pending deal awaiting a yes/no reply. Webhook invocations run
//! concurrently, so every check-then-write on a sender's slot happens under
//! one lock acquisition; two near-simultaneous submissions can never park two
//! divergent pending deals, and a `yes` can never race a new submission.
//!
//! A `std::sync::Mutex` is deliberate: no lock is ever held across an await.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::{PendingDeal, SenderId};

/// Outcome of routing a message through the confirmation state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmationDisposition {
    /// Sender said `yes`: the pending deal is removed and handed back for the
    /// CRM commit.
    Commit(PendingDeal),
    /// Sender said `no`: the pending deal is removed and discarded.
    Discard(PendingDeal),
    /// Sender said something else: the pending deal stays parked and the
    /// sender gets a yes/no reminder. Directive-shaped input is absorbed
    /// here on purpose, never rerouted.
    Remind,
    /// No pending deal: the message belongs to normal directive routing.
    Idle,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    pending: Mutex<HashMap<SenderId, PendingDeal>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks a validated deal for `sender`, entering AwaitingConfirmation.
    ///
    /// Returns `false` (leaving the existing deal untouched) when the sender
    /// already has one pending; check-and-insert is atomic.
    pub fn begin_confirmation(&self, sender: &SenderId, deal: PendingDeal) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if pending.contains_key(sender) {
            return false;
        }
        pending.insert(sender.clone(), deal);
        true
    }

    /// Runs one message through the confirmation transition table.
    ///
    /// Single lock acquisition: the peek and the removal (for yes/no) cannot
    /// interleave with another invocation for the same sender.
    pub fn resolve_reply(&self, sender: &SenderId, text: &str) -> ConfirmationDisposition {
        let mut pending = self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !pending.contains_key(sender) {
            return ConfirmationDisposition::Idle;
        }

        let normalized = text.trim();
        if normalized.eq_ignore_ascii_case("yes") {
            match pending.remove(sender) {
                Some(deal) => ConfirmationDisposition::Commit(deal),
                None => ConfirmationDisposition::Idle,
            }
        } else if normalized.eq_ignore_ascii_case("no") {
            match pending.remove(sender) {
                Some(deal) => ConfirmationDisposition::Discard(deal),
                None => ConfirmationDisposition::Idle,
            }
        } else {
            ConfirmationDisposition::Remind
        }
    }

    /// Number of senders currently awaiting confirmation (health reporting).
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfirmationDisposition, SessionStore};
    use crate::domain::{PendingDeal, SenderId};

    fn deal() -> PendingDeal {
        PendingDeal {
            deal_name: "Acme Renewal".to_owned(),
            account_name: "Acme Corp".to_owned(),
            stage: "HFS Filtration".to_owned(),
            pipeline: "Moneste".to_owned(),
        }
    }

    #[test]
    fn idle_sender_is_not_in_confirmation() {
        let store = SessionStore::new();
        let sender = SenderId("whatsapp:+1555".to_owned());
        assert_eq!(store.resolve_reply(&sender, "yes"), ConfirmationDisposition::Idle);
    }

    #[test]
    fn yes_commits_and_returns_to_idle() {
        let store = SessionStore::new();
        let sender = SenderId("whatsapp:+1555".to_owned());
        assert!(store.begin_confirmation(&sender, deal()));

        assert_eq!(store.resolve_reply(&sender, " YES "), ConfirmationDisposition::Commit(deal()));
        // Second yes with nothing pending is idle, never a duplicate commit.
        assert_eq!(store.resolve_reply(&sender, "yes"), ConfirmationDisposition::Idle);
        assert_eq!(store.pending_count(), 0);
    }

    #[test]
    fn no_discards_and_returns_to_idle() {
        let store = SessionStore::new();
        let sender = SenderId("whatsapp:+1555".to_owned());
        store.begin_confirmation(&sender, deal());

        assert_eq!(store.resolve_reply(&sender, "No"), ConfirmationDisposition::Discard(deal()));
        assert_eq!(store.pending_count(), 0);
    }

    #[test]
    fn anything_else_reminds_and_keeps_the_deal_parked() {
        let store = SessionStore::new();
        let sender = SenderId("whatsapp:+1555".to_owned());
        store.begin_confirmation(&sender, deal());

        // A well-formed directive is absorbed too.
        assert_eq!(
            store.resolve_reply(&sender, "@bot search deal Acme"),
            ConfirmationDisposition::Remind
        );
        assert_eq!(store.pending_count(), 1);
        assert_eq!(store.resolve_reply(&sender, "yes"), ConfirmationDisposition::Commit(deal()));
    }

    #[test]
    fn at_most_one_pending_deal_per_sender() {
        let store = SessionStore::new();
        let sender = SenderId("whatsapp:+1555".to_owned());
        assert!(store.begin_confirmation(&sender, deal()));

        let mut second = deal();
        second.deal_name = "Divergent".to_owned();
        assert!(!store.begin_confirmation(&sender, second));

        // The original deal survived the losing insert.
        assert_eq!(store.resolve_reply(&sender, "yes"), ConfirmationDisposition::Commit(deal()));
    }

    #[test]
    fn senders_are_isolated_from_each_other() {
        let store = SessionStore::new();
        let first = SenderId("whatsapp:+1555".to_owned());
        let second = SenderId("whatsapp:+1666".to_owned());
        store.begin_confirmation(&first, deal());

        assert_eq!(store.resolve_reply(&second, "yes"), ConfirmationDisposition::Idle);
        assert_eq!(store.pending_count(), 1);
    }
}
