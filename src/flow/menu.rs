//! Menu browsing: main menu, today/week listings, details, about, and the
//! organizer menu that starts the creation wizards.

use async_trait::async_trait;
use chrono::Days;
use tracing::{debug, warn};

use super::draft::{DraftEvent, DraftTeacher};
use super::handler::{FlowContext, FlowDeps, FlowHandler, FlowOutcome, handle_global_command};
use super::messages;
use super::session::{CachedResults, Session};
use super::state::ChatState;
use crate::error::FlowError;
use crate::validation::ValidationError;

/// Days after today covered by the week listing.
const WEEK_SPAN: u64 = 6;

/// Handler for every menu state, `START` included.
pub struct MenuFlow {
    deps: FlowDeps,
}

impl MenuFlow {
    pub fn new(deps: FlowDeps) -> Self {
        Self { deps }
    }

    fn go(&self, next: ChatState, session: &Session) -> FlowOutcome {
        FlowOutcome::advance(next, self.deps.prompt(next, session))
    }

    async fn on_main_menu(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match ctx.normalized.as_str() {
            "1" => self.list_events(ctx, session, ChatState::MenuToday, 0).await,
            "2" => {
                self.list_events(ctx, session, ChatState::MenuWeek, WEEK_SPAN)
                    .await
            }
            "3" => self.go(ChatState::MenuAbout, session),
            "4" => match self.deps.find_caller(&session.key).await {
                Ok(Some(user)) => {
                    debug!(phone = %ctx.phone_number, user_id = %user.id, "Organizer access granted");
                    self.go(ChatState::MenuSpecial, session)
                }
                Ok(None) => FlowOutcome::stay(messages::not_registered()),
                Err(e) => {
                    warn!(phone = %ctx.phone_number, error = %e, "User lookup failed");
                    FlowOutcome::stay(messages::collaborator_apology())
                }
            },
            _ => FlowOutcome::rejected(ValidationError::new("Elegí una opción del 1 al 4.")),
        }
    }

    async fn list_events(
        &self,
        ctx: &FlowContext,
        session: &mut Session,
        listing: ChatState,
        span_days: u64,
    ) -> FlowOutcome {
        let start = self.deps.today();
        let end = if span_days == 0 {
            None
        } else {
            start.checked_add_days(Days::new(span_days))
        };
        match self.deps.directory.query_events_in_range(start, end).await {
            Ok(events) => {
                debug!(phone = %ctx.phone_number, count = events.len(), "Events listed");
                session.cache = Some(CachedResults::Events(events));
                self.go(listing, session)
            }
            Err(e) => {
                warn!(phone = %ctx.phone_number, error = %e, "Event query failed");
                FlowOutcome::stay(messages::collaborator_apology())
            }
        }
    }

    fn on_listing(&self, ctx: &FlowContext, session: &Session, details: ChatState) -> FlowOutcome {
        let events = session.cached_events();
        let selected = ctx
            .normalized
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=events.len()).contains(n));
        match selected {
            Some(n) => FlowOutcome::advance(details, messages::event_details(&events[n - 1])),
            None if events.is_empty() => {
                FlowOutcome::rejected(ValidationError::new("Enviá 0 para volver al menú."))
            }
            None => FlowOutcome::rejected(ValidationError::new(format!(
                "Elegí un número del 1 al {}, o 0 para volver.",
                events.len()
            ))),
        }
    }

    fn on_special(&self, ctx: &FlowContext, session: &mut Session) -> FlowOutcome {
        match ctx.normalized.as_str() {
            "1" => {
                session.discard_drafts();
                session.event = Some(DraftEvent::default());
                self.go(ChatState::CreateEventType, session)
            }
            "2" => {
                session.discard_drafts();
                session.teacher = Some(DraftTeacher::default());
                self.go(ChatState::NewTeacherName, session)
            }
            "3" => {
                session.discard_drafts();
                session.teacher = Some(DraftTeacher::default());
                self.go(ChatState::OtherTeacherPhone, session)
            }
            "4" => self.go(ChatState::MainMenu, session),
            _ => FlowOutcome::rejected(ValidationError::new("Elegí una opción del 1 al 4.")),
        }
    }
}

#[async_trait]
impl FlowHandler for MenuFlow {
    fn name(&self) -> &'static str {
        "menu"
    }

    fn can_handle(&self, state: ChatState) -> bool {
        state.is_menu_state()
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

        // START answers anything, commands included, with the main menu.
        if state == ChatState::Start {
            session.discard_drafts();
            return Ok(FlowOutcome {
                success: true,
                next_state: Some(ChatState::MainMenu),
                replies: vec![messages::welcome(), messages::main_menu()],
                error: None,
            });
        }

        if let Some(outcome) =
            handle_global_command(&self.deps, ctx, session, |_| None, ChatState::MainMenu)
        {
            if outcome.next_state == Some(ChatState::MainMenu) {
                session.cache = None;
            }
            return Ok(outcome);
        }

        let outcome = match state {
            ChatState::MainMenu => self.on_main_menu(ctx, session).await,
            ChatState::MenuToday => self.on_listing(ctx, session, ChatState::MenuTodayDetails),
            ChatState::MenuWeek => self.on_listing(ctx, session, ChatState::MenuWeekDetails),
            ChatState::MenuTodayDetails | ChatState::MenuWeekDetails | ChatState::MenuAbout => {
                FlowOutcome::rejected(ValidationError::new("Enviá 0 para volver."))
            }
            ChatState::MenuSpecial => self.on_special(ctx, session),
            other => {
                tracing::error!(state = %other, "Menu flow reached a state it does not own");
                return Err(FlowError::UnexpectedState {
                    handler: self.name(),
                    state: other,
                });
            }
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;
    use crate::directory::{Directory, InMemoryDirectory, User};
    use crate::flow::draft::{EventType, Organizer};
    use crate::flow::handler::FixedClock;
    use crate::flow::handler::test_support::{ctx, deps, session_at};

    async fn step(flow: &MenuFlow, session: &mut Session, message: &str) -> FlowOutcome {
        let outcome = flow
            .handle(&ctx(session.state, message), session)
            .await
            .unwrap();
        if let Some(next) = outcome.next_state {
            session.state = next;
        }
        outcome
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    async fn directory_with_milonga(date: &str, weekly: bool) -> Arc<InMemoryDirectory> {
        let directory = Arc::new(InMemoryDirectory::new());
        let mut draft = DraftEvent::new(EventType::Milonga);
        draft.title = Some("La Milonguita".into());
        draft.venue_name = Some("Club Atenas".into());
        draft.address = Some("Calle 13 1234".into());
        draft.date = Some(date.into());
        draft.start_time = Some("22:00".into());
        draft.has_weekly_recurrence = weekly;
        draft.add_organizer(Organizer::OneTime { name: "Ana".into() });
        directory.create_event("542215550000", &draft).await.unwrap();
        directory
    }

    fn flow_with(directory: Arc<InMemoryDirectory>) -> MenuFlow {
        MenuFlow::new(
            FlowDeps::new(directory).with_clock(Arc::new(FixedClock(today()))),
        )
    }

    #[tokio::test]
    async fn start_always_shows_main_menu() {
        let flow = MenuFlow::new(deps());
        for message in ["hola", "0", "salir", ""] {
            let mut session = session_at(ChatState::Start);
            let outcome = step(&flow, &mut session, message).await;
            assert_eq!(session.state, ChatState::MainMenu, "{message:?}");
            assert_eq!(outcome.replies.len(), 2);
        }
    }

    #[tokio::test]
    async fn today_listing_and_details() {
        let flow = flow_with(directory_with_milonga("2026-10-17", false).await);
        let mut session = session_at(ChatState::MainMenu);

        let outcome = step(&flow, &mut session, "1").await;
        assert_eq!(session.state, ChatState::MenuToday);
        assert!(outcome.replies[0].contains("1. La Milonguita"));

        let rejected = step(&flow, &mut session, "2").await;
        assert!(!rejected.success);
        assert_eq!(session.state, ChatState::MenuToday);

        let details = step(&flow, &mut session, "1").await;
        assert_eq!(session.state, ChatState::MenuTodayDetails);
        assert!(details.replies[0].contains("Club Atenas"));
        assert!(details.replies[0].contains("Gratuito"));

        step(&flow, &mut session, "0").await;
        assert_eq!(session.state, ChatState::MenuToday);
        step(&flow, &mut session, "volver").await;
        assert_eq!(session.state, ChatState::MainMenu);
        assert!(session.cache.is_none());
    }

    #[tokio::test]
    async fn week_listing_includes_recurring_events() {
        let flow = flow_with(directory_with_milonga("2026-10-10", true).await);
        let mut session = session_at(ChatState::MainMenu);
        step(&flow, &mut session, "2").await;
        assert_eq!(session.state, ChatState::MenuWeek);
        assert_eq!(session.cached_events().len(), 1);
        assert_eq!(
            session.cached_events()[0].date,
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
        );
    }

    #[tokio::test]
    async fn organizer_access_requires_registration() {
        let directory = Arc::new(InMemoryDirectory::new());
        let flow = flow_with(directory.clone());
        let mut session = session_at(ChatState::MainMenu);

        let denied = step(&flow, &mut session, "4").await;
        assert_eq!(session.state, ChatState::MainMenu);
        assert!(denied.replies[0].contains("no está registrado"));

        directory
            .add_user(User {
                id: "u1".into(),
                phone: "2215551234".into(),
                name: "Ana".into(),
                details: None,
                is_teacher: true,
            })
            .await;
        step(&flow, &mut session, "4").await;
        assert_eq!(session.state, ChatState::MenuSpecial);
    }

    #[tokio::test]
    async fn special_menu_starts_wizards_with_fresh_drafts() {
        let flow = MenuFlow::new(deps());
        let mut session = session_at(ChatState::MenuSpecial);
        step(&flow, &mut session, "1").await;
        assert_eq!(session.state, ChatState::CreateEventType);
        assert_eq!(session.event, Some(DraftEvent::default()));

        let mut session = session_at(ChatState::MenuSpecial);
        step(&flow, &mut session, "3").await;
        assert_eq!(session.state, ChatState::OtherTeacherPhone);
        assert!(session.teacher.is_some());
        assert!(session.event.is_none());
    }

    #[tokio::test]
    async fn unknown_main_menu_option_is_rejected() {
        let flow = MenuFlow::new(deps());
        let mut session = session_at(ChatState::MainMenu);
        let outcome = step(&flow, &mut session, "9").await;
        assert!(!outcome.success);
        assert_eq!(session.state, ChatState::MainMenu);
    }

    #[tokio::test]
    async fn about_goes_back_to_main_menu() {
        let flow = MenuFlow::new(deps());
        let mut session = session_at(ChatState::MainMenu);
        step(&flow, &mut session, "3").await;
        assert_eq!(session.state, ChatState::MenuAbout);
        step(&flow, &mut session, "0").await;
        assert_eq!(session.state, ChatState::MainMenu);
    }
}
