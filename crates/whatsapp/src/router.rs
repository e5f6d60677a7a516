//! Directive routing: one inbound message in, exactly one reply string out.
//!
//! Routing order is fixed: the sender's confirmation state is consulted
//! before any pattern matching, so a parked deal absorbs everything until it
//! is resolved. Service failures never escape as errors; they become reply
//! text, because the sender must always hear back.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use dealbot_core::catalog::Catalogs;
use dealbot_core::directive::{
    classify, DirectiveKind, CONTACT_MARKERS, DEAL_MARKERS, NOTE_MARKERS, UPDATE_STAGE_MARKERS,
};
use dealbot_core::domain::{
    AccountRecord, ActionRequest, ContactRecord, DealRecord, InboundMessage, PendingDeal, SenderId,
};
use dealbot_core::errors::ValidationError;
use dealbot_core::extract::extract_params;
use dealbot_core::session::{ConfirmationDisposition, SessionStore};

use crate::replies;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CrmServiceError {
    /// The CRM answered with an error payload; the payload text is surfaced
    /// to the sender.
    #[error("crm provider rejected the request: {0}")]
    Provider(String),
    #[error("crm transport failed: {0}")]
    Transport(String),
}

impl CrmServiceError {
    pub fn detail(&self) -> &str {
        match self {
            Self::Provider(detail) | Self::Transport(detail) => detail,
        }
    }
}

/// CRM operations the router needs. Search methods return the first match;
/// `exact` toggles between exact-name and prefix criteria.
#[async_trait]
pub trait CrmService: Send + Sync {
    async fn add_contact(
        &self,
        full_name: &str,
        company: &str,
    ) -> Result<ContactRecord, CrmServiceError>;

    async fn create_deal(&self, deal: &PendingDeal) -> Result<DealRecord, CrmServiceError>;

    async fn add_note(&self, deal_id: &str, body: &str) -> Result<(), CrmServiceError>;

    async fn update_deal_stage(&self, deal_id: &str, stage: &str)
        -> Result<(), CrmServiceError>;

    async fn search_contact(
        &self,
        query: &str,
        exact: bool,
    ) -> Result<Option<ContactRecord>, CrmServiceError>;

    async fn search_deal(
        &self,
        query: &str,
        exact: bool,
    ) -> Result<Option<DealRecord>, CrmServiceError>;

    async fn search_account(&self, query: &str)
        -> Result<Option<AccountRecord>, CrmServiceError>;
}

#[derive(Debug, Error)]
#[error("assistant failed: {0}")]
pub struct AssistantError(pub String);

/// Free-text fallback for messages that match no directive.
#[async_trait]
pub trait AssistantService: Send + Sync {
    async fn answer(&self, question: &str) -> Result<String, AssistantError>;
}

/// Answers nothing and fails every CRM call. Used by the doctor command and
/// as a stand-in where a live backend is out of scope.
#[derive(Default)]
pub struct NoopCrmService;

#[async_trait]
impl CrmService for NoopCrmService {
    async fn add_contact(
        &self,
        _full_name: &str,
        _company: &str,
    ) -> Result<ContactRecord, CrmServiceError> {
        Err(CrmServiceError::Transport("crm backend is not configured".to_owned()))
    }

    async fn create_deal(&self, _deal: &PendingDeal) -> Result<DealRecord, CrmServiceError> {
        Err(CrmServiceError::Transport("crm backend is not configured".to_owned()))
    }

    async fn add_note(&self, _deal_id: &str, _body: &str) -> Result<(), CrmServiceError> {
        Err(CrmServiceError::Transport("crm backend is not configured".to_owned()))
    }

    async fn update_deal_stage(
        &self,
        _deal_id: &str,
        _stage: &str,
    ) -> Result<(), CrmServiceError> {
        Err(CrmServiceError::Transport("crm backend is not configured".to_owned()))
    }

    async fn search_contact(
        &self,
        _query: &str,
        _exact: bool,
    ) -> Result<Option<ContactRecord>, CrmServiceError> {
        Err(CrmServiceError::Transport("crm backend is not configured".to_owned()))
    }

    async fn search_deal(
        &self,
        _query: &str,
        _exact: bool,
    ) -> Result<Option<DealRecord>, CrmServiceError> {
        Err(CrmServiceError::Transport("crm backend is not configured".to_owned()))
    }

    async fn search_account(
        &self,
        _query: &str,
    ) -> Result<Option<AccountRecord>, CrmServiceError> {
        Err(CrmServiceError::Transport("crm backend is not configured".to_owned()))
    }
}

#[derive(Default)]
pub struct NoopAssistantService;

#[async_trait]
impl AssistantService for NoopAssistantService {
    async fn answer(&self, _question: &str) -> Result<String, AssistantError> {
        Err(AssistantError("assistant backend is not configured".to_owned()))
    }
}

pub struct DirectiveRouter {
    crm: Arc<dyn CrmService>,
    assistant: Arc<dyn AssistantService>,
    sessions: Arc<SessionStore>,
    catalogs: Catalogs,
}

impl DirectiveRouter {
    pub fn new(
        crm: Arc<dyn CrmService>,
        assistant: Arc<dyn AssistantService>,
        sessions: Arc<SessionStore>,
        catalogs: Catalogs,
    ) -> Self {
        Self { crm, assistant, sessions, catalogs }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Produces the single reply for one inbound message.
    pub async fn handle_message(&self, message: &InboundMessage) -> String {
        match self.sessions.resolve_reply(&message.sender, &message.text) {
            ConfirmationDisposition::Commit(deal) => return self.commit_deal(deal).await,
            ConfirmationDisposition::Discard(deal) => {
                info!(event_name = "deal_confirmation_declined", deal_name = %deal.deal_name);
                return replies::cancellation_ack(&deal);
            }
            ConfirmationDisposition::Remind => return replies::confirmation_reminder(),
            ConfirmationDisposition::Idle => {}
        }

        let kind = classify(&message.text);
        info!(event_name = "directive_classified", directive = ?kind);

        match kind {
            DirectiveKind::Help => replies::help_text(),
            DirectiveKind::CreateDealPrompt => replies::creation_prompt(),
            DirectiveKind::ConfirmationReply | DirectiveKind::Unrecognized => {
                self.fallback(&message.text).await
            }
            kind => match self.build_request(kind, &message.text) {
                Ok(request) => self.execute(&message.sender, request).await,
                Err(reply) => reply,
            },
        }
    }

    /// Parses and validates a directive into an [`ActionRequest`]. The `Err`
    /// arm is already reply text, never an internal error.
    fn build_request(&self, kind: DirectiveKind, text: &str) -> Result<ActionRequest, String> {
        match kind {
            DirectiveKind::AddContact => {
                let mut fields = extract_params(text, &CONTACT_MARKERS)
                    .map_err(|error| replies::parse_failure(&error, replies::CONTACT_SYNTAX))?
                    .into_iter();
                Ok(ActionRequest::AddContact {
                    name: fields.next().unwrap_or_default(),
                    company: fields.next().unwrap_or_default(),
                })
            }
            DirectiveKind::CreateDealSubmit => {
                let mut fields = extract_params(text, &DEAL_MARKERS)
                    .map_err(|error| replies::parse_failure(&error, replies::DEAL_SYNTAX))?
                    .into_iter();
                let deal_name = fields.next().unwrap_or_default();
                let account_name = fields.next().unwrap_or_default();
                let stage = self.resolve_stage(&fields.next().unwrap_or_default())?;
                let pipeline_raw = fields.next().unwrap_or_default();
                let pipeline = match self.catalogs.pipelines.resolve(&pipeline_raw) {
                    Some(pipeline) => pipeline.to_owned(),
                    None => {
                        return Err(replies::dropdown_rejection(&ValidationError::new(
                            self.catalogs.pipelines.field(),
                            pipeline_raw,
                            self.catalogs.pipelines.entries(),
                        )))
                    }
                };
                Ok(ActionRequest::CreateDeal {
                    deal: PendingDeal { deal_name, account_name, stage, pipeline },
                })
            }
            DirectiveKind::AddNote => {
                let mut fields = extract_params(text, &NOTE_MARKERS)
                    .map_err(|error| replies::parse_failure(&error, replies::NOTE_SYNTAX))?
                    .into_iter();
                Ok(ActionRequest::AddNote {
                    deal_name: fields.next().unwrap_or_default(),
                    body: fields.next().unwrap_or_default(),
                })
            }
            DirectiveKind::UpdateDealStage => {
                let mut fields = extract_params(text, &UPDATE_STAGE_MARKERS)
                    .map_err(|error| {
                        replies::parse_failure(&error, replies::UPDATE_STAGE_SYNTAX)
                    })?
                    .into_iter();
                let deal_name = fields.next().unwrap_or_default();
                let stage = self.resolve_stage(&fields.next().unwrap_or_default())?;
                Ok(ActionRequest::UpdateDealStage { deal_name, stage })
            }
            DirectiveKind::SearchContact => {
                let query = single_param(text, "search contact", "@bot search contact <name>")?;
                Ok(ActionRequest::SearchContact { query })
            }
            DirectiveKind::SearchDeal => {
                let query = single_param(text, "search deal", "@bot search deal <name>")?;
                Ok(ActionRequest::SearchDeal { query })
            }
            DirectiveKind::SearchAccount => {
                let query = single_param(text, "search account", "@bot search account <name>")?;
                Ok(ActionRequest::SearchAccount { query })
            }
            DirectiveKind::Help
            | DirectiveKind::CreateDealPrompt
            | DirectiveKind::ConfirmationReply
            | DirectiveKind::Unrecognized => Err(replies::help_text()),
        }
    }

    /// Runs a validated request against the CRM and renders the reply.
    async fn execute(&self, sender: &SenderId, request: ActionRequest) -> String {
        match request {
            ActionRequest::AddContact { name, company } => {
                match self.crm.add_contact(&name, &company).await {
                    Ok(contact) => replies::contact_added(&contact),
                    Err(error) => {
                        warn!(event_name = "contact_add_failed", detail = %error.detail());
                        replies::crm_failure("add the contact", error.detail())
                    }
                }
            }
            ActionRequest::CreateDeal { deal } => {
                if !self.sessions.begin_confirmation(sender, deal.clone()) {
                    // Lost a race against another message from the same sender.
                    return replies::confirmation_reminder();
                }
                info!(event_name = "deal_confirmation_started", deal_name = %deal.deal_name);
                replies::deal_preview(&deal)
            }
            ActionRequest::AddNote { deal_name, body } => {
                // Mutations get one exact lookup; a miss stops the flow. The
                // prefix fallback is for searches only, a shortened name must
                // never mutate a different deal.
                let deal = match self.crm.search_deal(&deal_name, true).await {
                    Ok(Some(deal)) => deal,
                    Ok(None) => return replies::not_found("deal", &deal_name),
                    Err(error) => {
                        return replies::crm_failure("look up the deal", error.detail())
                    }
                };
                match self.crm.add_note(&deal.id, &body).await {
                    Ok(()) => replies::note_added(&deal.deal_name),
                    Err(error) => {
                        warn!(event_name = "note_add_failed", detail = %error.detail());
                        replies::crm_failure("add the note", error.detail())
                    }
                }
            }
            ActionRequest::UpdateDealStage { deal_name, stage } => {
                let deal = match self.crm.search_deal(&deal_name, true).await {
                    Ok(Some(deal)) => deal,
                    Ok(None) => return replies::not_found("deal", &deal_name),
                    Err(error) => {
                        return replies::crm_failure("look up the deal", error.detail())
                    }
                };
                match self.crm.update_deal_stage(&deal.id, &stage).await {
                    Ok(()) => {
                        info!(event_name = "deal_stage_updated", deal_name = %deal.deal_name, stage = %stage);
                        replies::stage_updated(&deal.deal_name, &stage)
                    }
                    Err(error) => {
                        warn!(event_name = "deal_stage_update_failed", detail = %error.detail());
                        replies::crm_failure("update the deal stage", error.detail())
                    }
                }
            }
            ActionRequest::SearchContact { query } => {
                let found = match self.crm.search_contact(&query, true).await {
                    Ok(Some(contact)) => Some(contact),
                    Ok(None) => match self.crm.search_contact(&query, false).await {
                        Ok(result) => result,
                        Err(error) => {
                            return replies::crm_failure("search contacts", error.detail())
                        }
                    },
                    Err(error) => return replies::crm_failure("search contacts", error.detail()),
                };
                match found {
                    Some(contact) => replies::contact_found(&contact),
                    None => replies::not_found("contact", &query),
                }
            }
            ActionRequest::SearchDeal { query } => match self.find_deal(&query).await {
                Ok(Some(deal)) => replies::deal_found(&deal),
                Ok(None) => replies::not_found("deal", &query),
                Err(error) => replies::crm_failure("search deals", error.detail()),
            },
            ActionRequest::SearchAccount { query } => {
                match self.crm.search_account(&query).await {
                    Ok(Some(account)) => replies::account_found(&account),
                    Ok(None) => replies::not_found("account", &query),
                    Err(error) => replies::crm_failure("search accounts", error.detail()),
                }
            }
        }
    }

    fn resolve_stage(&self, raw: &str) -> Result<String, String> {
        match self.catalogs.stages.resolve(raw) {
            Some(stage) => Ok(stage.to_owned()),
            None => Err(replies::dropdown_rejection(&ValidationError::new(
                self.catalogs.stages.field(),
                raw.to_owned(),
                self.catalogs.stages.entries(),
            ))),
        }
    }

    async fn commit_deal(&self, deal: PendingDeal) -> String {
        match self.crm.create_deal(&deal).await {
            Ok(record) => {
                info!(event_name = "deal_created", deal_name = %record.deal_name);
                replies::deal_created(&record)
            }
            Err(error) => {
                warn!(event_name = "deal_create_failed", detail = %error.detail());
                replies::crm_failure("create the deal", error.detail())
            }
        }
    }

    /// Exact lookup first, prefix lookup as the fallback. Search only; the
    /// mutating handlers use a single exact lookup.
    async fn find_deal(&self, name: &str) -> Result<Option<DealRecord>, CrmServiceError> {
        if let Some(deal) = self.crm.search_deal(name, true).await? {
            return Ok(Some(deal));
        }
        self.crm.search_deal(name, false).await
    }

    /// Fail closed: an assistant error becomes a short apology, never an
    /// error the webhook has to handle.
    async fn fallback(&self, text: &str) -> String {
        match self.assistant.answer(text).await {
            Ok(answer) => answer,
            Err(error) => {
                warn!(event_name = "assistant_fallback_failed", detail = %error.0);
                replies::fallback_unavailable()
            }
        }
    }
}

fn single_param(text: &str, marker: &str, syntax: &str) -> Result<String, String> {
    let mut params = extract_params(text, &[marker])
        .map_err(|error| replies::parse_failure(&error, syntax))?;
    Ok(params.remove(0))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use dealbot_core::catalog::Catalogs;
    use dealbot_core::domain::{
        AccountRecord, ContactRecord, DealRecord, InboundMessage, PendingDeal, SenderId,
    };
    use dealbot_core::session::SessionStore;

    use super::{
        AssistantError, AssistantService, CrmService, CrmServiceError, DirectiveRouter,
    };

    #[derive(Default)]
    struct RecordingCrm {
        calls: Mutex<Vec<String>>,
        deals: Vec<DealRecord>,
        fail_with: Option<CrmServiceError>,
    }

    impl RecordingCrm {
        fn with_deal(deal: DealRecord) -> Self {
            Self { deals: vec![deal], ..Self::default() }
        }

        fn failing(error: CrmServiceError) -> Self {
            Self { fail_with: Some(error), ..Self::default() }
        }

        fn record(&self, call: String) -> Result<(), CrmServiceError> {
            self.calls.lock().expect("lock").push(call);
            match &self.fail_with {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl CrmService for RecordingCrm {
        async fn add_contact(
            &self,
            full_name: &str,
            company: &str,
        ) -> Result<ContactRecord, CrmServiceError> {
            self.record(format!("add_contact {full_name} @ {company}"))?;
            Ok(ContactRecord {
                id: "c-1".to_owned(),
                full_name: full_name.to_owned(),
                account_name: Some(company.to_owned()),
            })
        }

        async fn create_deal(&self, deal: &PendingDeal) -> Result<DealRecord, CrmServiceError> {
            self.record(format!("create_deal {}", deal.deal_name))?;
            Ok(DealRecord {
                id: "d-1".to_owned(),
                deal_name: deal.deal_name.clone(),
                stage: deal.stage.clone(),
                account_name: Some(deal.account_name.clone()),
            })
        }

        async fn add_note(&self, deal_id: &str, body: &str) -> Result<(), CrmServiceError> {
            self.record(format!("add_note {deal_id}: {body}"))
        }

        async fn update_deal_stage(
            &self,
            deal_id: &str,
            stage: &str,
        ) -> Result<(), CrmServiceError> {
            self.record(format!("update_deal_stage {deal_id} -> {stage}"))
        }

        async fn search_contact(
            &self,
            query: &str,
            exact: bool,
        ) -> Result<Option<ContactRecord>, CrmServiceError> {
            self.record(format!("search_contact {query} exact={exact}"))?;
            Ok(None)
        }

        async fn search_deal(
            &self,
            query: &str,
            exact: bool,
        ) -> Result<Option<DealRecord>, CrmServiceError> {
            self.record(format!("search_deal {query} exact={exact}"))?;
            if exact {
                Ok(self.deals.iter().find(|deal| deal.deal_name == query).cloned())
            } else {
                Ok(self
                    .deals
                    .iter()
                    .find(|deal| deal.deal_name.starts_with(query))
                    .cloned())
            }
        }

        async fn search_account(
            &self,
            query: &str,
        ) -> Result<Option<AccountRecord>, CrmServiceError> {
            self.record(format!("search_account {query}"))?;
            Ok(Some(AccountRecord {
                id: "a-1".to_owned(),
                account_name: query.to_owned(),
                website: None,
            }))
        }
    }

    struct ScriptedAssistant {
        reply: Result<String, String>,
    }

    #[async_trait]
    impl AssistantService for ScriptedAssistant {
        async fn answer(&self, _question: &str) -> Result<String, AssistantError> {
            self.reply.clone().map_err(AssistantError)
        }
    }

    fn router_with(crm: Arc<RecordingCrm>) -> DirectiveRouter {
        DirectiveRouter::new(
            crm,
            Arc::new(ScriptedAssistant { reply: Ok("The pipeline looks healthy.".to_owned()) }),
            Arc::new(SessionStore::new()),
            Catalogs::default(),
        )
    }

    fn message(text: &str) -> InboundMessage {
        InboundMessage::new(text.to_owned(), SenderId("whatsapp:+15550001111".to_owned()))
    }

    const SUBMIT: &str =
        "@bot deal name Acme Renewal account Acme Corp stage hfs filtration pipeline moneste";

    #[tokio::test]
    async fn deal_submission_previews_then_yes_creates_exactly_once() {
        let crm = Arc::new(RecordingCrm::default());
        let router = router_with(Arc::clone(&crm));

        let preview = router.handle_message(&message(SUBMIT)).await;
        assert!(preview.contains("Acme Renewal"));
        // Canonical catalog casing, not the sender's spelling.
        assert!(preview.contains("HFS Filtration"));
        assert!(preview.contains("Moneste"));
        assert!(crm.calls().is_empty(), "no CRM write before confirmation");

        let created = router.handle_message(&message("yes")).await;
        assert!(created.contains("✅"));
        assert_eq!(crm.calls(), vec!["create_deal Acme Renewal"]);

        // A second yes finds no pending deal and falls through to the
        // assistant; the CRM is not touched again.
        let after = router.handle_message(&message("yes")).await;
        assert_eq!(after, "The pipeline looks healthy.");
        assert_eq!(crm.calls().len(), 1);
    }

    #[tokio::test]
    async fn no_cancels_without_any_crm_write() {
        let crm = Arc::new(RecordingCrm::default());
        let router = router_with(Arc::clone(&crm));

        router.handle_message(&message(SUBMIT)).await;
        let reply = router.handle_message(&message("NO")).await;

        assert!(reply.contains("not created"));
        assert!(crm.calls().is_empty());
    }

    #[tokio::test]
    async fn pending_confirmation_absorbs_other_directives() {
        let crm = Arc::new(RecordingCrm::default());
        let router = router_with(Arc::clone(&crm));

        router.handle_message(&message(SUBMIT)).await;
        let reply = router.handle_message(&message("@bot search account Acme")).await;

        assert!(reply.contains("yes or no"));
        assert!(crm.calls().is_empty(), "absorbed directive must not reach the CRM");

        // The parked deal is still there and commits normally.
        let created = router.handle_message(&message("yes")).await;
        assert!(created.contains("Acme Renewal"));
    }

    #[tokio::test]
    async fn invalid_stage_is_rejected_with_the_full_catalog() {
        let crm = Arc::new(RecordingCrm::default());
        let router = router_with(Arc::clone(&crm));

        let reply = router
            .handle_message(&message(
                "@bot deal name X account Y stage Bogus pipeline Moneste",
            ))
            .await;

        assert!(reply.contains("not a valid stage"));
        assert!(reply.contains("Qualification"));
        assert!(reply.contains("Closed Lost"));
        // No confirmation was started: yes routes to the assistant.
        let after = router.handle_message(&message("yes")).await;
        assert_eq!(after, "The pipeline looks healthy.");
    }

    #[tokio::test]
    async fn out_of_order_submission_echoes_the_expected_syntax() {
        let router = router_with(Arc::new(RecordingCrm::default()));

        // All four markers are present so this classifies as a submission,
        // but `pipeline` appears before `stage` and extraction cannot find it
        // after the previous split point.
        let reply = router
            .handle_message(&message(
                "@bot deal name X pipeline Moneste account Y stage Qualification",
            ))
            .await;

        assert!(reply.contains("pipeline"));
        assert!(reply.contains(crate::replies::DEAL_SYNTAX));
    }

    #[tokio::test]
    async fn note_attaches_after_a_single_exact_lookup() {
        let crm = Arc::new(RecordingCrm::with_deal(DealRecord {
            id: "d-9".to_owned(),
            deal_name: "Acme Renewal".to_owned(),
            stage: "Negotiation/Review".to_owned(),
            account_name: None,
        }));
        let router = router_with(Arc::clone(&crm));

        let reply = router
            .handle_message(&message("@bot note Acme Renewal note_content call on friday"))
            .await;

        assert!(reply.contains("✅"));
        assert_eq!(
            crm.calls(),
            vec!["search_deal Acme Renewal exact=true", "add_note d-9: call on friday"]
        );
    }

    #[tokio::test]
    async fn note_with_an_inexact_deal_name_stops_at_not_found() {
        // "Acme" would prefix-match this deal, but mutations never get the
        // prefix fallback: one exact lookup, then not-found, nothing written.
        let crm = Arc::new(RecordingCrm::with_deal(DealRecord {
            id: "d-9".to_owned(),
            deal_name: "Acme Renewal 2026".to_owned(),
            stage: "Negotiation/Review".to_owned(),
            account_name: None,
        }));
        let router = router_with(Arc::clone(&crm));

        let reply =
            router.handle_message(&message("@bot note Acme note_content checking in")).await;

        assert!(reply.contains("No deal found"));
        assert_eq!(crm.calls(), vec!["search_deal Acme exact=true"]);
    }

    #[tokio::test]
    async fn update_stage_with_an_inexact_deal_name_does_not_mutate() {
        let crm = Arc::new(RecordingCrm::with_deal(DealRecord {
            id: "d-9".to_owned(),
            deal_name: "Acme Renewal 2026".to_owned(),
            stage: "Qualification".to_owned(),
            account_name: None,
        }));
        let router = router_with(Arc::clone(&crm));

        let reply =
            router.handle_message(&message("@bot update deal Acme stage Closed Won")).await;

        assert!(reply.contains("No deal found"));
        assert_eq!(crm.calls(), vec!["search_deal Acme exact=true"]);
    }

    #[tokio::test]
    async fn deal_search_falls_back_to_a_prefix_lookup() {
        let crm = Arc::new(RecordingCrm::with_deal(DealRecord {
            id: "d-9".to_owned(),
            deal_name: "Acme Renewal 2026".to_owned(),
            stage: "Negotiation/Review".to_owned(),
            account_name: None,
        }));
        let router = router_with(Arc::clone(&crm));

        let reply = router.handle_message(&message("@bot search deal Acme")).await;

        assert!(reply.contains("Acme Renewal 2026"));
        assert!(reply.contains("Negotiation/Review"));
        // Exactly two lookups: the exact miss, then the prefix hit.
        assert_eq!(
            crm.calls(),
            vec!["search_deal Acme exact=true", "search_deal Acme exact=false"]
        );
    }

    #[tokio::test]
    async fn update_stage_validates_before_any_lookup() {
        let crm = Arc::new(RecordingCrm::default());
        let router = router_with(Arc::clone(&crm));

        let reply =
            router.handle_message(&message("@bot update deal Acme stage Nonsense")).await;

        assert!(reply.contains("not a valid stage"));
        assert!(crm.calls().is_empty());
    }

    #[tokio::test]
    async fn crm_error_payload_reaches_the_sender() {
        let crm = Arc::new(RecordingCrm::failing(CrmServiceError::Provider(
            "DUPLICATE_DATA: contact already exists".to_owned(),
        )));
        let router = router_with(crm);

        let reply = router
            .handle_message(&message("@bot add contact John Smith company Acme"))
            .await;

        assert!(reply.contains("❌"));
        assert!(reply.contains("DUPLICATE_DATA"));
    }

    #[tokio::test]
    async fn unrecognized_text_goes_to_the_assistant() {
        let router = router_with(Arc::new(RecordingCrm::default()));
        let reply = router.handle_message(&message("how are we doing this quarter?")).await;
        assert_eq!(reply, "The pipeline looks healthy.");
    }

    #[tokio::test]
    async fn assistant_failure_is_a_polite_reply_not_an_error() {
        let router = DirectiveRouter::new(
            Arc::new(RecordingCrm::default()),
            Arc::new(ScriptedAssistant { reply: Err("model timed out".to_owned()) }),
            Arc::new(SessionStore::new()),
            Catalogs::default(),
        );

        let reply = router.handle_message(&message("tell me a joke")).await;
        assert!(reply.contains("@bot help"));
    }

    #[tokio::test]
    async fn help_lists_every_directive() {
        let router = router_with(Arc::new(RecordingCrm::default()));
        let reply = router.handle_message(&message("@bot help")).await;

        for fragment in ["add contact", "create deal", "note", "update deal", "search account"] {
            assert!(reply.contains(fragment), "help should mention `{fragment}`");
        }
    }
}
