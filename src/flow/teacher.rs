//! Teacher registration: the caller registering themself, or registering
//! another teacher by phone number.

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::{info, warn};

use super::commands::Answer;
use super::draft::DraftTeacher;
use super::handler::{
    FlowContext, FlowDeps, FlowHandler, FlowOutcome, RestartPolicy, handle_global_command,
};
use super::messages;
use super::session::Session;
use super::state::ChatState;
use crate::error::FlowError;
use crate::validation::ValidationError;

const PASSWORD_MIN_LEN: usize = 6;
const DETAILS_SKIP: &[&str] = &[".", "-"];

/// Handler for every teacher-creation state.
pub struct TeacherFlow {
    deps: FlowDeps,
    restart_policy: RestartPolicy,
}

impl TeacherFlow {
    pub const DEFAULT_RESTART_POLICY: RestartPolicy = RestartPolicy::DiscardDraft;

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

    fn go(&self, next: ChatState, session: &Session) -> FlowOutcome {
        FlowOutcome::advance(next, self.deps.prompt(next, session))
    }

    // ── Self registration ───────────────────────────────────────────

    fn on_name(&self, ctx: &FlowContext, session: &mut Session, next: ChatState) -> FlowOutcome {
        match self.deps.rules.name(ctx.text()) {
            Ok(name) => {
                session.teacher_mut().name = Some(name);
                self.go(next, session)
            }
            Err(e) => FlowOutcome::rejected(e),
        }
    }

    fn on_self_details(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match self.deps.rules.description(ctx.text()) {
            Ok(details) => {
                session.teacher_mut().details = Some(details);
                let next = if self.deps.require_teacher_password {
                    ChatState::NewTeacherPassword
                } else {
                    ChatState::NewTeacherConfirmation
                };
                self.go(next, session)
            }
            Err(e) => FlowOutcome::rejected(e),
        }
    }

    fn on_password(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        // Passwords are taken verbatim, not normalized.
        let password = ctx.raw_message.trim();
        if password.chars().count() < PASSWORD_MIN_LEN {
            return FlowOutcome::rejected(ValidationError::new(format!(
                "La contraseña tiene que tener al menos {PASSWORD_MIN_LEN} caracteres."
            )));
        }
        session.teacher_mut().password = Some(SecretString::from(password.to_string()));
        self.go(ChatState::NewTeacherConfirmation, session)
    }

    // ── Other teacher ───────────────────────────────────────────────

    fn on_other_phone(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match self.deps.rules.phone(ctx.text()) {
            Ok(phone) => {
                session.teacher_mut().phone = Some(phone);
                self.go(ChatState::OtherTeacherName, session)
            }
            Err(e) => FlowOutcome::rejected(e),
        }
    }

    fn on_other_details(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        if DETAILS_SKIP.contains(&ctx.normalized.as_str()) {
            session.teacher_mut().details = None;
            return self.go(ChatState::OtherTeacherConfirmation, session);
        }
        match self.deps.rules.description(ctx.text()) {
            Ok(details) => {
                session.teacher_mut().details = Some(details);
                self.go(ChatState::OtherTeacherConfirmation, session)
            }
            Err(e) => FlowOutcome::rejected(e),
        }
    }

    // ── Confirmation ────────────────────────────────────────────────

    async fn on_confirmation(
        &self,
        ctx: &FlowContext,
        session: &mut Session,
        restart_at: ChatState,
    ) -> FlowOutcome {
        match Answer::parse(&ctx.normalized) {
            Some(Answer::Yes) => self.persist(ctx, session, restart_at).await,
            Some(Answer::No) => match self.restart_policy {
                RestartPolicy::DiscardDraft => {
                    session.teacher = Some(DraftTeacher::default());
                    self.go(restart_at, session)
                }
                RestartPolicy::KeepDraft => self.go(restart_at, session),
            },
            None => FlowOutcome::rejected(ValidationError::new(
                "Respondé 1 para confirmar o 2 para empezar de nuevo.",
            )),
        }
    }

    async fn persist(
        &self,
        ctx: &FlowContext,
        session: &mut Session,
        restart_at: ChatState,
    ) -> FlowOutcome {
        let Some(draft) = session.teacher.as_ref() else {
            return self.go(restart_at, session);
        };
        // Self registration is keyed by the caller, other teachers by their phone.
        let id = match restart_at {
            ChatState::OtherTeacherPhone => draft.phone.clone(),
            _ => Some(session.key.clone()),
        };
        let (Some(id), Some(teacher)) = (id, draft.to_new_teacher()) else {
            session.teacher = Some(DraftTeacher::default());
            return self
                .go(restart_at, session)
                .with_notice("Faltan datos, empecemos de nuevo.");
        };
        if self.deps.require_teacher_password
            && restart_at == ChatState::NewTeacherName
            && teacher.password.is_none()
        {
            return self.go(ChatState::NewTeacherPassword, session);
        }

        let name = teacher.name.clone();
        match self.deps.directory.create_teacher(&id, teacher).await {
            Ok(user) => {
                info!(phone = %ctx.phone_number, teacher_id = %user.id, "Teacher registered");
                session.teacher = None;
                FlowOutcome::advance(ChatState::MenuSpecial, messages::teacher_created(&name))
            }
            Err(e) => {
                warn!(phone = %ctx.phone_number, error = %e, "Teacher creation failed");
                FlowOutcome::stay(messages::collaborator_apology())
            }
        }
    }
}

#[async_trait]
impl FlowHandler for TeacherFlow {
    fn name(&self) -> &'static str {
        "teacher"
    }

    fn can_handle(&self, state: ChatState) -> bool {
        state.is_teacher_creation_state()
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

        if let Some(outcome) =
            handle_global_command(&self.deps, ctx, session, |_| None, ChatState::MenuSpecial)
        {
            return Ok(outcome);
        }

        let outcome = match state {
            ChatState::NewTeacherName => self.on_name(ctx, session, ChatState::NewTeacherDetails),
            ChatState::NewTeacherDetails => self.on_self_details(ctx, session),
            ChatState::NewTeacherPassword => self.on_password(ctx, session),
            ChatState::NewTeacherConfirmation => {
                self.on_confirmation(ctx, session, ChatState::NewTeacherName)
                    .await
            }
            ChatState::OtherTeacherPhone => self.on_other_phone(ctx, session),
            ChatState::OtherTeacherName => {
                self.on_name(ctx, session, ChatState::OtherTeacherDetails)
            }
            ChatState::OtherTeacherDetails => self.on_other_details(ctx, session),
            ChatState::OtherTeacherConfirmation => {
                self.on_confirmation(ctx, session, ChatState::OtherTeacherPhone)
                    .await
            }
            other => {
                tracing::error!(state = %other, "Teacher flow reached a state it does not own");
                return Err(FlowError::UnexpectedState {
                    handler: self.name(),
                    state: other,
                });
            }
        };
        Ok(outcome)
    }
}
