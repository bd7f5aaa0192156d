//! Event-creation wizard.
//!
//! Shared prefix (type → title → venue → address → date), then one branch
//! per event type, reconverging at the organizer questions and running
//! through recurrence, contact, reminder, description and pricing to the
//! confirmation step.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, warn};

use super::commands::Answer;
use super::draft::{
    ClassEntry, ClassLevel, ClassMode, DraftEvent, EventType, Organizer, Practice, PreClass,
    PricingEntry, PricingMode,
};
use super::handler::{
    FlowContext, FlowDeps, FlowHandler, FlowOutcome, RestartPolicy, handle_global_command,
};
use super::messages;
use super::session::{CachedResults, Session};
use super::state::ChatState;
use crate::error::FlowError;
use crate::extraction::{ExtractionContext, merge_into_draft};
use crate::validation::{ValidationError, ValidationResult, validate_price, validate_time};

const TEACHER_SEARCH_LIMIT: usize = 5;
const SKIP: &str = ".";
const NEW_ORGANIZER: &str = "nuevo";
const CONTACT_SKIP: &[&str] = &["3", ".", "no", "omitir", "ninguno"];

static TIME_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*(?:-|–|\sa\s)\s*(.+)$").expect("valid regex"));

/// Handler for every event-creation state.
pub struct EventFlow {
    deps: FlowDeps,
    restart_policy: RestartPolicy,
}

impl EventFlow {
    pub const DEFAULT_RESTART_POLICY: RestartPolicy = RestartPolicy::KeepDraft;

    pub fn new(deps: FlowDeps) -> Self {
        Self {
            deps,
            restart_policy: Self::DEFAULT_RESTART_POLICY,
        }
    }

    pub fn with_restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }

    /// Flow-level predecessor for states without a static back entry.
    fn default_back(state: ChatState, session: &Session) -> Option<ChatState> {
        match state {
            ChatState::CreateOrganizerSelf => Some(branch_tail(session.event.as_ref())),
            _ => None,
        }
    }

    /// Re-open per-item answers when "back" lands on an item step.
    fn on_back(target: ChatState, session: &mut Session) {
        let Some(draft) = session.event.as_mut() else {
            return;
        };
        match target {
            ChatState::CreateClassLevel => draft.reopen_last_class(),
            ChatState::CreateClassTime => draft.pending_class = None,
            ChatState::CreateEventPricingAmount => draft.reopen_last_price(),
            ChatState::CreateEventPricingType | ChatState::CreateEventPricingDetail => {
                draft.pending_price_description = None
            }
            _ => {}
        }
    }

    fn go(&self, next: ChatState, session: &Session) -> FlowOutcome {
        FlowOutcome::advance(next, self.deps.prompt(next, session))
    }

    fn collaborator_failed(
        &self,
        ctx: &FlowContext,
        what: &str,
        err: impl std::fmt::Display,
    ) -> FlowOutcome {
        warn!(phone = %ctx.phone_number, state = %ctx.current_state, error = %err, "{what} failed");
        FlowOutcome::stay(messages::collaborator_apology())
    }

    // ── Shared prefix ───────────────────────────────────────────────

    fn on_type(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        if ctx.normalized == "5" && self.deps.extractor.is_some() {
            session.event_mut();
            return self.go(ChatState::CreateEventFreeText, session);
        }
        let Some(event_type) = parse_event_type(&ctx.normalized) else {
            let options = if self.deps.extractor.is_some() { 5 } else { 4 };
            return FlowOutcome::rejected(ValidationError::new(format!(
                "Elegí una opción del 1 al {options}."
            )));
        };
        session.event_mut().event_type = Some(event_type);
        self.go(ChatState::CreateEventTitle, session)
    }

    async fn on_free_text(
        &self,
        ctx: &FlowContext,
        session: &mut Session,
    ) -> Result<FlowOutcome, FlowError> {
        let Some(extractor) = &self.deps.extractor else {
            return Err(FlowError::UnexpectedState {
                handler: self.name(),
                state: ctx.current_state,
            });
        };
        if ctx.text().is_empty() {
            return Ok(FlowOutcome::rejected(ValidationError::new(
                "Contame el evento en un mensaje.",
            )));
        }

        let context = ExtractionContext {
            today: self.deps.today(),
            event_type: session.event.as_ref().and_then(|d| d.event_type),
        };
        let extraction = match extractor.infer(ctx.text(), &context).await {
            Ok(extraction) => extraction,
            Err(e) => return Ok(self.collaborator_failed(ctx, "Extraction", e)),
        };

        let draft = session.event_mut();
        merge_into_draft(&extraction.partial, draft, &self.deps.rules, self.deps.today());
        let next = draft
            .missing_fields()
            .first()
            .map(|field| field.state())
            .unwrap_or(ChatState::CreateEventConfirmation);
        info!(
            phone = %ctx.phone_number,
            extractor = extractor.name(),
            confidence = extraction.confidence,
            next = %next,
            "Free-text event merged"
        );

        let outcome = self.go(next, session);
        if extraction.needs_review(self.deps.min_confidence) {
            Ok(outcome.with_notice(messages::extraction_notice(
                extraction.confidence,
                &extraction.follow_up_questions,
            )))
        } else {
            Ok(outcome)
        }
    }

    fn on_title(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match self.deps.rules.name(ctx.text()) {
            Ok(title) => {
                session.event_mut().title = Some(title);
                self.go(ChatState::CreateEventVenue, session)
            }
            Err(e) => FlowOutcome::rejected(e),
        }
    }

    fn on_venue(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match self.deps.rules.name(ctx.text()) {
            Ok(venue) => {
                session.event_mut().venue_name = Some(venue);
                self.go(ChatState::CreateEventAddress, session)
            }
            Err(e) => FlowOutcome::rejected(e),
        }
    }

    fn on_address(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match self.deps.rules.name(ctx.text()) {
            Ok(address) => {
                session.event_mut().address = Some(address);
                self.go(ChatState::CreateEventDate, session)
            }
            Err(e) => FlowOutcome::rejected(e.with_example("Calle 7 1234")),
        }
    }

    fn on_date(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        let date = match self.deps.rules.date_at(ctx.text(), self.deps.today()) {
            Ok(date) => date,
            Err(e) => return FlowOutcome::rejected(e),
        };
        let draft = session.event_mut();
        draft.date = Some(date);
        let next = match draft.event_type {
            Some(t) if t.uses_class_branch() => ChatState::CreateClassSingleOrMultiple,
            Some(EventType::Milonga) => ChatState::CreateMilongaTime,
            Some(_) => ChatState::CreateSpecialTime,
            None => ChatState::CreateEventType,
        };
        self.go(next, session)
    }

    // ── Class branch ────────────────────────────────────────────────

    fn on_class_mode(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        let mode = match ctx.normalized.as_str() {
            "1" => ClassMode::Single,
            "2" => ClassMode::Multiple,
            _ => {
                return FlowOutcome::rejected(ValidationError::new(
                    "Respondé 1 (una sola clase) o 2 (varias clases).",
                ));
            }
        };
        // Choosing the mode starts the class list over.
        let draft = session.event_mut();
        draft.class_mode = Some(mode);
        draft.pending_class = None;
        draft.classes.clear();
        draft.practice = None;
        self.go(ChatState::CreateClassTime, session)
    }

    fn on_class_time(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match parse_time_range(ctx.text()) {
            Ok((start_time, end_time)) => {
                session.event_mut().pending_class = Some(ClassEntry {
                    start_time,
                    end_time,
                    level: None,
                });
                self.go(ChatState::CreateClassLevel, session)
            }
            Err(e) => FlowOutcome::rejected(e),
        }
    }

    fn on_class_level(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        let level = match parse_level(&ctx.normalized) {
            Ok(level) => level,
            Err(e) => return FlowOutcome::rejected(e),
        };
        let draft = session.event_mut();
        let Some(class) = draft.pending_class.as_mut() else {
            debug!(phone = %ctx.phone_number, "Level answered without a pending class");
            return self.go(ChatState::CreateClassTime, session);
        };
        class.level = level;
        draft.commit_pending_class();

        let next = match draft.class_mode {
            Some(ClassMode::Single) => ChatState::CreateClassPractice,
            _ => ChatState::CreateClassAddAnother,
        };
        self.go(next, session)
    }

    fn on_class_add_another(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match Answer::parse(&ctx.normalized) {
            Some(Answer::Yes) => self.go(ChatState::CreateClassTime, session),
            Some(Answer::No) => self.go(ChatState::CreateClassPractice, session),
            None => yes_no_rejection(),
        }
    }

    fn on_practice(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match Answer::parse(&ctx.normalized) {
            Some(Answer::Yes) => self.go(ChatState::CreateClassPracticeTime, session),
            Some(Answer::No) => {
                session.event_mut().practice = None;
                self.go(ChatState::CreateOrganizerSelf, session)
            }
            None => yes_no_rejection(),
        }
    }

    fn on_practice_time(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match validate_time(ctx.text()) {
            Ok(time) => {
                session.event_mut().practice = Some(Practice { time });
                self.go(ChatState::CreateOrganizerSelf, session)
            }
            Err(e) => FlowOutcome::rejected(e),
        }
    }

    // ── Milonga branch ──────────────────────────────────────────────

    fn on_milonga_time(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match validate_time(ctx.text()) {
            Ok(time) => {
                let draft = session.event_mut();
                if let Some(pre) = draft.pre_class.as_mut() {
                    pre.milonga_time = time.clone();
                }
                draft.start_time = Some(time);
                self.go(ChatState::CreateMilongaPreClass, session)
            }
            Err(e) => FlowOutcome::rejected(e),
        }
    }

    fn on_pre_class(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match Answer::parse(&ctx.normalized) {
            Some(Answer::Yes) => self.go(ChatState::CreateMilongaPreClassTime, session),
            Some(Answer::No) => {
                session.event_mut().pre_class = None;
                self.go(ChatState::CreateMilongaShow, session)
            }
            None => yes_no_rejection(),
        }
    }

    fn on_pre_class_time(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match validate_time(ctx.text()) {
            Ok(class_time) => {
                let draft = session.event_mut();
                let milonga_time = draft.start_time.clone().unwrap_or_default();
                draft.pre_class = Some(PreClass {
                    class_time,
                    milonga_time,
                });
                self.go(ChatState::CreateMilongaShow, session)
            }
            Err(e) => FlowOutcome::rejected(e),
        }
    }

    /// Yes/no/skip, or any other text taken as the show description itself.
    fn on_show(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        if ctx.text().is_empty() {
            return yes_no_rejection();
        }
        if ctx.normalized == SKIP {
            session.event_mut().show_description = None;
            return self.go(ChatState::CreateOrganizerSelf, session);
        }
        match Answer::parse(&ctx.normalized) {
            Some(Answer::Yes) => self.go(ChatState::CreateMilongaShowDetails, session),
            Some(Answer::No) => {
                session.event_mut().show_description = None;
                self.go(ChatState::CreateOrganizerSelf, session)
            }
            None => {
                session.event_mut().show_description = Some(ctx.text().to_string());
                self.go(ChatState::CreateOrganizerSelf, session)
            }
        }
    }

    fn on_show_details(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match self.deps.rules.name(ctx.text()) {
            Ok(show) => {
                session.event_mut().show_description = Some(show);
                self.go(ChatState::CreateOrganizerSelf, session)
            }
            Err(e) => FlowOutcome::rejected(e),
        }
    }

    // ── Special event branch ────────────────────────────────────────

    fn on_special_time(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match validate_time(ctx.text()) {
            Ok(time) => {
                session.event_mut().start_time = Some(time);
                self.go(ChatState::CreateOrganizerSelf, session)
            }
            Err(e) => FlowOutcome::rejected(e),
        }
    }

    // ── Organizers ──────────────────────────────────────────────────

    async fn on_organizer_self(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        // Only "add another" extends the organizer list; this step starts it over.
        match Answer::parse(&ctx.normalized) {
            Some(Answer::Yes) => {
                let user = match self.deps.find_caller(&session.key).await {
                    Ok(user) => user,
                    Err(e) => return self.collaborator_failed(ctx, "User lookup", e),
                };
                session.event_mut().organizers.clear();
                match user {
                    Some(user) => {
                        session.event_mut().add_organizer(Organizer::Registered {
                            user_id: user.id,
                            name: user.name,
                        });
                        self.go(ChatState::CreateOrganizerAddAnother, session)
                    }
                    None => self
                        .go(ChatState::CreateOrganizerOneTimeName, session)
                        .with_notice("No encontré tu perfil de profe. Decime tu nombre."),
                }
            }
            Some(Answer::No) => {
                session.event_mut().organizers.clear();
                self.go(ChatState::CreateOrganizerSearch, session)
            }
            None => yes_no_rejection(),
        }
    }

    async fn on_organizer_search(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        if ctx.normalized == NEW_ORGANIZER {
            return self.go(ChatState::CreateOrganizerOneTimeName, session);
        }
        let term = ctx.text();
        if term.chars().count() < 2 {
            return FlowOutcome::rejected(
                ValidationError::new("Escribí al menos 2 letras para buscar.").with_example("Ana"),
            );
        }

        let matches = match self
            .deps
            .directory
            .search_teachers(term, TEACHER_SEARCH_LIMIT)
            .await
        {
            Ok(matches) => matches,
            Err(e) => return self.collaborator_failed(ctx, "Teacher search", e),
        };

        if matches.is_empty() {
            return self
                .go(ChatState::CreateOrganizerOneTimeName, session)
                .with_notice(messages::teacher_not_found(term));
        }
        session.cache = Some(CachedResults::Teachers(matches));
        self.go(ChatState::CreateOrganizerSelect, session)
    }

    fn on_organizer_select(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        let count = session.cached_teachers().len();
        let choice = ctx.normalized.parse::<usize>().ok().filter(|n| (1..=count + 1).contains(n));
        let Some(choice) = choice else {
            return FlowOutcome::rejected(ValidationError::new(format!(
                "Elegí un número del 1 al {}.",
                count + 1
            )));
        };
        if choice == count + 1 {
            session.cache = None;
            return self.go(ChatState::CreateOrganizerOneTimeName, session);
        }

        let teacher = session.cached_teachers()[choice - 1].clone();
        session.cache = None;
        let added = session.event_mut().add_organizer(Organizer::Registered {
            user_id: teacher.id,
            name: teacher.name.clone(),
        });
        let outcome = self.go(ChatState::CreateOrganizerAddAnother, session);
        if added {
            outcome
        } else {
            outcome.with_notice(format!("{} ya estaba en la lista.", teacher.name))
        }
    }

    fn on_one_time_name(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match self.deps.rules.name(ctx.text()) {
            Ok(name) => {
                session.event_mut().add_organizer(Organizer::OneTime { name });
                self.go(ChatState::CreateOrganizerAddAnother, session)
            }
            Err(e) => FlowOutcome::rejected(e),
        }
    }

    fn on_organizer_add_another(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match Answer::parse(&ctx.normalized) {
            Some(Answer::Yes) => self.go(ChatState::CreateOrganizerSearch, session),
            Some(Answer::No) => self.go(ChatState::CreateEventRecurrence, session),
            None => yes_no_rejection(),
        }
    }

    // ── Reconverged tail ────────────────────────────────────────────

    fn on_recurrence(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        let weekly = match Answer::parse(&ctx.normalized) {
            Some(answer) => answer == Answer::Yes,
            None => return yes_no_rejection(),
        };
        session.event_mut().has_weekly_recurrence = weekly;
        self.go(ChatState::CreateEventContact, session)
    }

    /// Own number / other number / skip, shared by contact and reminder.
    fn phone_choice(
        &self,
        ctx: &FlowContext,
        session: &mut Session,
        ask_number: ChatState,
        next: ChatState,
        slot: fn(&mut DraftEvent) -> &mut Option<String>,
    ) -> FlowOutcome {
        let value = match ctx.normalized.as_str() {
            "1" => Some(self.deps.phone_format.local_number(&session.key).to_string()),
            "2" => return self.go(ask_number, session),
            other if CONTACT_SKIP.contains(&other) => None,
            _ => {
                return FlowOutcome::rejected(ValidationError::new(
                    "Respondé 1 (mi número), 2 (otro número) o 3 (ninguno).",
                ));
            }
        };
        *slot(session.event_mut()) = value;
        self.go(next, session)
    }

    fn phone_entry(
        &self,
        ctx: &FlowContext,
        session: &mut Session,
        next: ChatState,
        slot: fn(&mut DraftEvent) -> &mut Option<String>,
    ) -> FlowOutcome {
        match self.deps.rules.phone(ctx.text()) {
            Ok(phone) => {
                *slot(session.event_mut()) = Some(phone);
                self.go(next, session)
            }
            Err(e) => FlowOutcome::rejected(e),
        }
    }

    fn on_description(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        if ctx.normalized == SKIP {
            session.event_mut().description = None;
            return self.go(ChatState::CreateEventPricing, session);
        }
        match self.deps.rules.description(ctx.text()) {
            Ok(description) => {
                session.event_mut().description = Some(description);
                self.go(ChatState::CreateEventPricing, session)
            }
            Err(e) => FlowOutcome::rejected(e),
        }
    }

    fn on_pricing(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match Answer::parse(&ctx.normalized) {
            Some(Answer::Yes) => self.go(ChatState::CreateEventPricingType, session),
            Some(Answer::No) => {
                let draft = session.event_mut();
                draft.pricing.clear();
                draft.pricing_mode = None;
                draft.pending_price_description = None;
                self.go(ChatState::CreateEventConfirmation, session)
            }
            None => yes_no_rejection(),
        }
    }

    fn on_pricing_type(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        let mode = match ctx.normalized.as_str() {
            "1" => PricingMode::Single,
            "2" => PricingMode::List,
            _ => {
                return FlowOutcome::rejected(ValidationError::new(
                    "Respondé 1 (precio único) o 2 (lista de precios).",
                ));
            }
        };
        let draft = session.event_mut();
        draft.pricing.clear();
        draft.pricing_mode = Some(mode);
        match mode {
            PricingMode::Single => {
                draft.pending_price_description = Some("Entrada".to_string());
                self.go(ChatState::CreateEventPricingAmount, session)
            }
            PricingMode::List => {
                draft.pending_price_description = None;
                self.go(ChatState::CreateEventPricingDetail, session)
            }
        }
    }

    fn on_pricing_detail(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match self.deps.rules.name(ctx.text()) {
            Ok(description) => {
                session.event_mut().pending_price_description = Some(description);
                self.go(ChatState::CreateEventPricingAmount, session)
            }
            Err(e) => FlowOutcome::rejected(e.with_example("Clase + práctica")),
        }
    }

    fn on_pricing_amount(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        let price = match validate_price(ctx.text()) {
            Ok(price) => price,
            Err(e) => return FlowOutcome::rejected(e),
        };
        let draft = session.event_mut();
        let description = draft
            .pending_price_description
            .take()
            .unwrap_or_else(|| "Entrada".to_string());
        draft.pricing.push(PricingEntry { description, price });
        let next = match draft.pricing_mode {
            Some(PricingMode::List) => ChatState::CreateEventPricingAddMore,
            _ => ChatState::CreateEventConfirmation,
        };
        self.go(next, session)
    }

    fn on_pricing_add_more(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match Answer::parse(&ctx.normalized) {
            Some(Answer::Yes) => self.go(ChatState::CreateEventPricingDetail, session),
            Some(Answer::No) => self.go(ChatState::CreateEventConfirmation, session),
            None => yes_no_rejection(),
        }
    }

    async fn on_confirmation(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match Answer::parse(&ctx.normalized) {
            Some(Answer::Yes) => self.persist(ctx, session).await,
            Some(Answer::No) => match self.restart_policy {
                RestartPolicy::KeepDraft => self.go(ChatState::CreateEventTitle, session),
                RestartPolicy::DiscardDraft => {
                    let event_type = session.event.as_ref().and_then(|d| d.event_type);
                    session.event = Some(DraftEvent {
                        event_type,
                        ..Default::default()
                    });
                    self.go(ChatState::CreateEventTitle, session)
                }
            },
            None => FlowOutcome::rejected(ValidationError::new(
                "Respondé 1 para confirmar o 2 para modificar.",
            )),
        }
    }

    async fn persist(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        let Some(draft) = session.event.as_ref() else {
            return self.go(ChatState::CreateEventType, session);
        };
        if !draft.is_complete() {
            return FlowOutcome::stay(messages::incomplete_event(draft));
        }

        let creator = match self.deps.find_caller(&session.key).await {
            Ok(Some(user)) => user.id,
            Ok(None) => session.key.clone(),
            Err(e) => return self.collaborator_failed(ctx, "User lookup", e),
        };
        let created = match self.deps.directory.create_event(&creator, draft).await {
            Ok(created) => created,
            Err(e) => return self.collaborator_failed(ctx, "Event creation", e),
        };

        let title = draft.title.clone().unwrap_or_default();
        info!(phone = %ctx.phone_number, event_id = %created.id, title = %title, "Event created");
        session.event = None;
        session.cache = None;
        FlowOutcome::advance(ChatState::MenuSpecial, messages::event_created(&title))
    }
}

#[async_trait]
impl FlowHandler for EventFlow {
    fn name(&self) -> &'static str {
        "event"
    }

    fn can_handle(&self, state: ChatState) -> bool {
        state.is_event_creation_state()
    }

    async fn handle(
        &self,
        ctx: &FlowContext,
        session: &mut Session,
    ) -> Result<FlowOutcome, FlowError> {
        let state = ctx.current_state;
        if !self.can_handle(state) {
            return Err(FlowError::UnexpectedState {
                handler: self.name(),
                state,
            });
        }

        if let Some(outcome) = handle_global_command(
            &self.deps,
            ctx,
            session,
            |s| Self::default_back(state, s),
            ChatState::MenuSpecial,
        ) {
            if let Some(target) = outcome.next_state {
                Self::on_back(target, session);
            }
            return Ok(outcome);
        }

        use ChatState::*;
        let outcome = match state {
            CreateEventType => self.on_type(ctx, session),
            CreateEventFreeText => return self.on_free_text(ctx, session).await,
            CreateEventTitle => self.on_title(ctx, session),
            CreateEventVenue => self.on_venue(ctx, session),
            CreateEventAddress => self.on_address(ctx, session),
            CreateEventDate => self.on_date(ctx, session),

            CreateClassSingleOrMultiple => self.on_class_mode(ctx, session),
            CreateClassTime => self.on_class_time(ctx, session),
            CreateClassLevel => self.on_class_level(ctx, session),
            CreateClassAddAnother => self.on_class_add_another(ctx, session),
            CreateClassPractice => self.on_practice(ctx, session),
            CreateClassPracticeTime => self.on_practice_time(ctx, session),

            CreateMilongaTime => self.on_milonga_time(ctx, session),
            CreateMilongaPreClass => self.on_pre_class(ctx, session),
            CreateMilongaPreClassTime => self.on_pre_class_time(ctx, session),
            CreateMilongaShow => self.on_show(ctx, session),
            CreateMilongaShowDetails => self.on_show_details(ctx, session),

            CreateSpecialTime => self.on_special_time(ctx, session),

            CreateOrganizerSelf => self.on_organizer_self(ctx, session).await,
            CreateOrganizerSearch => self.on_organizer_search(ctx, session).await,
            CreateOrganizerSelect => self.on_organizer_select(ctx, session),
            CreateOrganizerOneTimeName => self.on_one_time_name(ctx, session),
            CreateOrganizerAddAnother => self.on_organizer_add_another(ctx, session),

            CreateEventRecurrence => self.on_recurrence(ctx, session),
            CreateEventContact => self.phone_choice(
                ctx,
                session,
                CreateEventContactPhone,
                CreateEventReminder,
                contact_slot,
            ),
            CreateEventContactPhone => {
                self.phone_entry(ctx, session, CreateEventReminder, contact_slot)
            }
            CreateEventReminder => self.phone_choice(
                ctx,
                session,
                CreateEventReminderPhone,
                CreateEventDescription,
                reminder_slot,
            ),
            CreateEventReminderPhone => {
                self.phone_entry(ctx, session, CreateEventDescription, reminder_slot)
            }
            CreateEventDescription => self.on_description(ctx, session),
            CreateEventPricing => self.on_pricing(ctx, session),
            CreateEventPricingType => self.on_pricing_type(ctx, session),
            CreateEventPricingDetail => self.on_pricing_detail(ctx, session),
            CreateEventPricingAmount => self.on_pricing_amount(ctx, session),
            CreateEventPricingAddMore => self.on_pricing_add_more(ctx, session),
            CreateEventConfirmation => self.on_confirmation(ctx, session).await,

            other => {
                tracing::error!(state = %other, "Event flow reached a state it does not own");
                return Err(FlowError::UnexpectedState {
                    handler: self.name(),
                    state: other,
                });
            }
        };
        Ok(outcome)
    }
}

/// Last step of the type-specific branch, where the organizer questions resume.
fn branch_tail(draft: Option<&DraftEvent>) -> ChatState {
    match draft.and_then(|d| d.event_type) {
        Some(t) if t.uses_class_branch() => ChatState::CreateClassPractice,
        Some(EventType::Milonga) => ChatState::CreateMilongaShow,
        Some(_) => ChatState::CreateSpecialTime,
        None => ChatState::CreateEventDate,
    }
}

fn contact_slot(draft: &mut DraftEvent) -> &mut Option<String> {
    &mut draft.contact_phone
}

fn reminder_slot(draft: &mut DraftEvent) -> &mut Option<String> {
    &mut draft.reminder_phone
}

fn yes_no_rejection() -> FlowOutcome {
    FlowOutcome::rejected(ValidationError::new("Respondé 1 (sí) o 2 (no)."))
}

fn parse_event_type(normalized: &str) -> Option<EventType> {
    match normalized {
        "1" | "clase" => Some(EventType::Class),
        "2" | "milonga" => Some(EventType::Milonga),
        "3" | "seminario" => Some(EventType::Seminar),
        "4" | "especial" | "evento especial" => Some(EventType::SpecialEvent),
        _ => None,
    }
}

/// `Ok(None)` is the skip answer.
fn parse_level(normalized: &str) -> ValidationResult<Option<ClassLevel>> {
    match normalized {
        "1" => Ok(Some(ClassLevel::Beginner)),
        "2" => Ok(Some(ClassLevel::Intermediate)),
        "3" => Ok(Some(ClassLevel::Advanced)),
        "4" => Ok(Some(ClassLevel::AllLevels)),
        "5" | "." => Ok(None),
        _ => Err(ValidationError::new("Elegí un nivel del 1 al 4, o 5 para omitir.")),
    }
}

/// A single start time, or `start - end` / `start a end`.
fn parse_time_range(input: &str) -> ValidationResult<(String, Option<String>)> {
    let Some(captures) = TIME_RANGE.captures(input.trim()) else {
        return Ok((validate_time(input)?, None));
    };

    let start = validate_time(&captures[1])?;
    let end = validate_time(&captures[2])?;
    if end <= start {
        return Err(
            ValidationError::new("La hora de fin tiene que ser después del inicio.")
                .with_example("19:00 - 20:30"),
        );
    }
    Ok((start, Some(end)))
}
