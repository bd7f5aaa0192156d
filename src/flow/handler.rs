//! Shared contract for the three flow handlers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use super::commands::Command;
use super::messages;
use super::session::{PhoneKeyFormat, Session};
use super::state::ChatState;
use crate::directory::{Directory, User};
use crate::error::{DirectoryError, FlowError};
use crate::extraction::Extractor;
use crate::validation::{ValidationError, ValidationRules};

/// One inbound message, as seen by a handler.
#[derive(Debug, Clone)]
pub struct FlowContext {
    /// Normalized session key.
    pub phone_number: String,
    pub raw_message: String,
    pub normalized: String,
    pub current_state: ChatState,
}

impl FlowContext {
    /// The raw message with surrounding whitespace removed.
    pub fn text(&self) -> &str {
        self.raw_message.trim()
    }
}

/// What a handler decided for one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowOutcome {
    pub success: bool,
    /// `None` keeps the current state.
    pub next_state: Option<ChatState>,
    pub replies: Vec<String>,
    /// Validation message, when the input was rejected.
    pub error: Option<String>,
}

impl FlowOutcome {
    /// Move to `next` and send `reply`.
    pub fn advance(next: ChatState, reply: impl Into<String>) -> Self {
        Self {
            success: true,
            next_state: Some(next),
            replies: vec![reply.into()],
            error: None,
        }
    }

    /// Input rejected: echo the validator's message, state unchanged.
    pub fn rejected(err: ValidationError) -> Self {
        Self {
            success: false,
            next_state: None,
            replies: vec![err.to_user_text()],
            error: Some(err.message),
        }
    }

    /// Accepted, but nothing moves (e.g. a collaborator failed before mutation).
    pub fn stay(reply: impl Into<String>) -> Self {
        Self {
            success: false,
            next_state: None,
            replies: vec![reply.into()],
            error: None,
        }
    }

    /// Prepend a notice before the other replies.
    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.replies.insert(0, notice.into());
        self
    }
}

/// What happens to the draft when the user declines at confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Restart at the first editable step, answers kept until overwritten.
    KeepDraft,
    /// Restart at the first step with an empty draft.
    DiscardDraft,
}

/// Source of "today" for date parsing and listings.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock local date.
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// A clock stuck on one date.
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Collaborators and settings shared by every handler.
#[derive(Clone)]
pub struct FlowDeps {
    pub directory: Arc<dyn Directory>,
    pub extractor: Option<Arc<dyn Extractor>>,
    pub rules: ValidationRules,
    pub phone_format: PhoneKeyFormat,
    pub require_teacher_password: bool,
    pub min_confidence: u8,
    pub clock: Arc<dyn Clock>,
}

impl FlowDeps {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self {
            directory,
            extractor: None,
            rules: ValidationRules::default(),
            phone_format: PhoneKeyFormat::default(),
            require_teacher_password: false,
            min_confidence: 60,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// The directory user behind a session key, matched by full key or by
    /// local number.
    pub async fn find_caller(&self, key: &str) -> Result<Option<User>, DirectoryError> {
        if let Some(user) = self.directory.find_user_by_phone(key).await? {
            return Ok(Some(user));
        }
        let local = self.phone_format.local_number(key);
        if local == key {
            return Ok(None);
        }
        self.directory.find_user_by_phone(local).await
    }

    /// Prompt for `state`, rendered against the session.
    pub fn prompt(&self, state: ChatState, session: &Session) -> String {
        messages::prompt(state, session, self.extractor.is_some())
    }
}

/// A handler that owns a subset of the state space.
#[async_trait]
pub trait FlowHandler: Send + Sync {
    /// Handler name for logging and routing diagnostics.
    fn name(&self) -> &'static str;

    /// Pure membership test.
    fn can_handle(&self, state: ChatState) -> bool;

    /// Handle one message. The caller applies `next_state` and sends replies.
    async fn handle(
        &self,
        ctx: &FlowContext,
        session: &mut Session,
    ) -> Result<FlowOutcome, FlowError>;
}

/// Resolve a global back/exit command before any state-specific handling.
///
/// `fallback` supplies the flow-level predecessor for states the static back
/// map leaves undefined; `exit_to` is where leaving the flow through its
/// entry point lands. Returns `None` when the message is not a command.
pub fn handle_global_command(
    deps: &FlowDeps,
    ctx: &FlowContext,
    session: &mut Session,
    fallback: impl FnOnce(&Session) -> Option<ChatState>,
    exit_to: ChatState,
) -> Option<FlowOutcome> {
    match Command::parse(&ctx.normalized)? {
        Command::Exit => {
            debug!(phone = %ctx.phone_number, from = %ctx.current_state, "Flow exited");
            session.discard_drafts();
            Some(FlowOutcome::advance(
                ChatState::Start,
                messages::exit_confirmation(),
            ))
        }
        Command::Back => {
            let previous = ctx.current_state.back().or_else(|| fallback(&*session));
            let target = match previous {
                Some(previous) => previous,
                None => {
                    // Back past the first step leaves the flow.
                    session.discard_drafts();
                    exit_to
                }
            };
            debug!(phone = %ctx.phone_number, from = %ctx.current_state, to = %target, "Back");
            Some(FlowOutcome::advance(target, deps.prompt(target, session)))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::flow::draft::{DraftEvent, EventType};

    #[test]
    fn non_commands_pass_through() {
        let deps = deps();
        let ctx = ctx(ChatState::CreateEventTitle, "Milonga del Sur");
        let mut session = session_at(ChatState::CreateEventTitle);
        assert!(
            handle_global_command(&deps, &ctx, &mut session, |_| None, ChatState::MenuSpecial)
                .is_none()
        );
    }

    #[test]
    fn exit_discards_and_returns_to_start() {
        let deps = deps();
        let ctx = ctx(ChatState::CreateEventVenue, "Salir");
        let mut session = session_at(ChatState::CreateEventVenue);
        session.event = Some(DraftEvent::new(EventType::Class));

        let outcome =
            handle_global_command(&deps, &ctx, &mut session, |_| None, ChatState::MenuSpecial)
                .unwrap();
        assert_eq!(outcome.next_state, Some(ChatState::Start));
        assert!(session.event.is_none());
        assert_eq!(outcome.replies, vec![messages::exit_confirmation()]);
    }

    #[test]
    fn back_uses_static_map_then_fallback() {
        let deps = deps();
        let mut session = session_at(ChatState::CreateEventAddress);
        let outcome = handle_global_command(
            &deps,
            &ctx(ChatState::CreateEventAddress, "0"),
            &mut session,
            |_| unreachable!(),
            ChatState::MenuSpecial,
        )
        .unwrap();
        assert_eq!(outcome.next_state, Some(ChatState::CreateEventVenue));

        let outcome = handle_global_command(
            &deps,
            &ctx(ChatState::CreateOrganizerSelf, "volver"),
            &mut session,
            |_| Some(ChatState::CreateSpecialTime),
            ChatState::MenuSpecial,
        )
        .unwrap();
        assert_eq!(outcome.next_state, Some(ChatState::CreateSpecialTime));
    }

    #[test]
    fn back_from_entry_leaves_flow_and_drops_draft() {
        let deps = deps();
        let mut session = session_at(ChatState::CreateEventType);
        session.event = Some(DraftEvent::default());
        let outcome = handle_global_command(
            &deps,
            &ctx(ChatState::CreateEventType, "0"),
            &mut session,
            |_| None,
            ChatState::MenuSpecial,
        )
        .unwrap();
        assert_eq!(outcome.next_state, Some(ChatState::MenuSpecial));
        assert!(session.event.is_none());
    }

    #[test]
    fn rejected_outcome_keeps_state() {
        let outcome =
            FlowOutcome::rejected(ValidationError::new("Hora inválida").with_example("20:30"));
        assert!(!outcome.success);
        assert_eq!(outcome.next_state, None);
        assert_eq!(outcome.error.as_deref(), Some("Hora inválida"));
        assert!(outcome.replies[0].contains("Ejemplo: 20:30"));
    }
}
