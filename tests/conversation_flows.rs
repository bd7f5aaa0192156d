//! End-to-end conversations through the public dispatcher.
//!
//! Each test wires the real flow handlers to an in-memory directory and a
//! recording transport, then plays a scripted conversation one message at
//! a time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::SecretString;
use tokio::sync::Mutex;

use tango_bot::channels::Transport;
use tango_bot::directory::{InMemoryDirectory, User};
use tango_bot::error::{ChannelError, ExtractionError, FlowError};
use tango_bot::extraction::{Extraction, ExtractionContext, Extractor, PartialEvent};
use tango_bot::flow::draft::{ClassLevel, EventType, Organizer};
use tango_bot::flow::{
    ChatState, Dispatcher, FixedClock, FlowContext, FlowDeps, FlowHandler, FlowOutcome, MenuFlow,
    Session, TeacherFlow, messages,
};

const PHONE: &str = "5492215551234";
const KEY: &str = "542215551234";

/// Records every reply instead of sending it.
#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<(String, String)>>,
}

impl Recorder {
    async fn last(&self) -> String {
        self.sent
            .lock()
            .await
            .last()
            .map(|(_, text)| text.clone())
            .unwrap_or_default()
    }

    async fn count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl Transport for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), ChannelError> {
        self.sent
            .lock()
            .await
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}

/// Returns a canned extraction for any text.
struct StubExtractor {
    extraction: Extraction,
}

#[async_trait]
impl Extractor for StubExtractor {
    fn name(&self) -> &str {
        "stub"
    }

    async fn infer(
        &self,
        _text: &str,
        _context: &ExtractionContext,
    ) -> Result<Extraction, ExtractionError> {
        Ok(self.extraction.clone())
    }
}

/// Claims the event-creation states and always fails.
struct BrokenEventFlow;

#[async_trait]
impl FlowHandler for BrokenEventFlow {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn can_handle(&self, state: ChatState) -> bool {
        state.is_event_creation_state()
    }

    async fn handle(
        &self,
        ctx: &FlowContext,
        _session: &mut Session,
    ) -> Result<FlowOutcome, FlowError> {
        Err(FlowError::UnexpectedState {
            handler: self.name(),
            state: ctx.current_state,
        })
    }
}

struct Harness {
    dispatcher: Dispatcher,
    transport: Arc<Recorder>,
    directory: Arc<InMemoryDirectory>,
}

impl Harness {
    fn deps(directory: Arc<InMemoryDirectory>) -> FlowDeps {
        FlowDeps::new(directory).with_clock(Arc::new(FixedClock(
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
        )))
    }

    fn new() -> Self {
        Self::with_deps(|deps| deps)
    }

    fn with_deps(configure: impl FnOnce(FlowDeps) -> FlowDeps) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        let transport = Arc::new(Recorder::default());
        let deps = configure(Self::deps(directory.clone()));
        let dispatcher = Dispatcher::standard(deps, transport.clone()).unwrap();
        Self {
            dispatcher,
            transport,
            directory,
        }
    }

    async fn register_organizer(&self) {
        self.directory
            .add_user(User {
                id: "u-ana".into(),
                phone: KEY.into(),
                name: "Ana Pérez".into(),
                details: None,
                is_teacher: true,
            })
            .await;
    }

    async fn send(&self, text: &str) -> ChatState {
        self.dispatcher.handle_message(PHONE, text).await
    }

    async fn script(&self, lines: &[&str]) -> ChatState {
        let mut state = self.dispatcher.state_of(PHONE).await;
        for line in lines {
            state = self.send(line).await;
        }
        state
    }

    async fn session<T>(&self, read: impl FnOnce(&Session) -> T) -> T {
        let handle = self.dispatcher.sessions().entry(KEY).await;
        let session = handle.lock().await;
        read(&session)
    }
}

/// Messages that take a registered organizer from a fresh session to the
/// organizer menu.
const TO_ORGANIZER_MENU: &[&str] = &["hola", "4"];

/// A milonga answered up to the confirmation step, one-time organizer,
/// no prices.
const MILONGA_TO_CONFIRMATION: &[&str] = &[
    "1",
    "2",
    "La Milonguita",
    "Club Atenas",
    "Calle 13 1234",
    "25/10/2026",
    "22:00",
    "no",
    "no",
    "no",
    "nuevo",
    "Ana",
    "no",
    "no",
    "3",
    "3",
    ".",
    "no",
];

#[tokio::test]
async fn main_menu_today_listing() {
    let h = Harness::new();
    assert_eq!(h.send("hola").await, ChatState::MainMenu);
    assert_eq!(h.send("1").await, ChatState::MenuToday);
    assert!(h.transport.last().await.contains("hoy"));
}

#[tokio::test]
async fn full_class_creation_is_persisted() {
    let h = Harness::new();
    h.register_organizer().await;

    h.script(TO_ORGANIZER_MENU).await;
    let state = h
        .script(&[
            "1",
            "1",
            "Clase de giros",
            "Club Atenas",
            "Calle 13 1234",
            "25/10/2026",
            "2",
            "19:00 a 20:30",
            "1",
            "si",
            "20:30",
            ".",
            "no",
            "si",
            "21:30",
            "si",
            "no",
            "si",
            "1",
            "3",
            ".",
            "si",
            "2",
            "Clase suelta",
            "5000",
            "no",
        ])
        .await;
    assert_eq!(state, ChatState::CreateEventConfirmation);

    assert_eq!(h.send("1").await, ChatState::MenuSpecial);
    assert!(h.transport.last().await.contains("Clase de giros"));

    let events = h.directory.events().await;
    assert_eq!(events.len(), 1);
    let (creator, draft) = &events[0];
    assert_eq!(creator, "u-ana");
    assert_eq!(draft.event_type, Some(EventType::Class));
    assert_eq!(draft.date.as_deref(), Some("2026-10-25"));
    assert_eq!(draft.classes.len(), 2);
    assert_eq!(draft.classes[0].start_time, "19:00");
    assert_eq!(draft.classes[0].end_time.as_deref(), Some("20:30"));
    assert_eq!(draft.classes[0].level, Some(ClassLevel::Beginner));
    assert_eq!(draft.classes[1].level, None);
    assert_eq!(draft.practice.as_ref().map(|p| p.time.as_str()), Some("21:30"));
    assert_eq!(draft.organizers.len(), 1);
    assert!(matches!(
        &draft.organizers[0].organizer,
        Organizer::Registered { user_id, .. } if user_id == "u-ana"
    ));
    assert!(draft.has_weekly_recurrence);
    assert_eq!(draft.contact_phone.as_deref(), Some("2215551234"));
    assert_eq!(draft.reminder_phone, None);
    assert_eq!(draft.pricing.len(), 1);
    assert_eq!(draft.pricing[0].description, "Clase suelta");

    assert!(h.session(|s| s.event.is_none()).await);
}

#[tokio::test]
async fn class_level_skip_leaves_level_unset() {
    let h = Harness::new();
    h.register_organizer().await;
    h.script(TO_ORGANIZER_MENU).await;
    let state = h
        .script(&[
            "1",
            "1",
            "Clase de giros",
            "Club Atenas",
            "Calle 13 1234",
            "25/10/2026",
            "2",
            "19:00",
            ".",
        ])
        .await;
    assert_eq!(state, ChatState::CreateClassAddAnother);
    let level = h
        .session(|s| s.event.as_ref().map(|d| d.classes[0].level))
        .await;
    assert_eq!(level, Some(None));
}

#[tokio::test]
async fn confirmation_decline_keeps_event_draft() {
    let h = Harness::new();
    h.register_organizer().await;
    h.script(TO_ORGANIZER_MENU).await;
    assert_eq!(
        h.script(MILONGA_TO_CONFIRMATION).await,
        ChatState::CreateEventConfirmation
    );

    assert_eq!(h.send("2").await, ChatState::CreateEventTitle);
    let title = h
        .session(|s| s.event.as_ref().and_then(|d| d.title.clone()))
        .await;
    assert_eq!(title.as_deref(), Some("La Milonguita"));
    assert!(h.directory.events().await.is_empty());
}

/// A single class from the title onwards, one-time organizer, no prices.
fn single_class_to_confirmation(start: &'static str) -> Vec<&'static str> {
    vec![
        "Clase de giros",
        "Club Atenas",
        "Calle 13 1234",
        "25/10/2026",
        "1",
        start,
        "1",
        "no",
        "no",
        "nuevo",
        "Zoe Perez",
        "no",
        "no",
        "3",
        "3",
        ".",
        "no",
    ]
}

#[tokio::test]
async fn declined_then_rewalked_event_is_persisted_once() {
    let h = Harness::new();
    h.register_organizer().await;
    h.script(TO_ORGANIZER_MENU).await;
    h.script(&["1", "1"]).await;
    assert_eq!(
        h.script(&single_class_to_confirmation("19:00")).await,
        ChatState::CreateEventConfirmation
    );

    assert_eq!(h.send("2").await, ChatState::CreateEventTitle);
    assert_eq!(
        h.script(&single_class_to_confirmation("20:00")).await,
        ChatState::CreateEventConfirmation
    );
    let summary = h.transport.last().await;
    assert!(!summary.contains("19:00"), "{summary}");

    assert_eq!(h.send("1").await, ChatState::MenuSpecial);
    let events = h.directory.events().await;
    assert_eq!(events.len(), 1);
    let (_, draft) = &events[0];
    assert_eq!(draft.classes.len(), 1);
    assert_eq!(draft.classes[0].start_time, "20:00");
    assert_eq!(draft.classes[0].level, Some(ClassLevel::Beginner));
    assert_eq!(draft.organizers.len(), 1);
    assert!(matches!(
        &draft.organizers[0].organizer,
        Organizer::OneTime { name } if name == "Zoe Perez"
    ));
    assert!(draft.organizers[0].is_primary);
    assert!(draft.pricing.is_empty());
}

#[tokio::test]
async fn back_from_address_keeps_venue() {
    let h = Harness::new();
    h.register_organizer().await;
    h.script(TO_ORGANIZER_MENU).await;
    h.script(&["1", "2", "La Milonguita", "Club Atenas"]).await;
    assert_eq!(h.dispatcher.state_of(PHONE).await, ChatState::CreateEventAddress);

    assert_eq!(h.send("0").await, ChatState::CreateEventVenue);
    let venue = h
        .session(|s| s.event.as_ref().and_then(|d| d.venue_name.clone()))
        .await;
    assert_eq!(venue.as_deref(), Some("Club Atenas"));
}

#[tokio::test]
async fn salir_discards_the_draft() {
    let h = Harness::new();
    h.register_organizer().await;
    h.script(TO_ORGANIZER_MENU).await;
    h.script(&["1", "2", "La Milonguita"]).await;

    assert_eq!(h.send("Salir").await, ChatState::Start);
    assert_eq!(h.transport.last().await, messages::exit_confirmation());
    assert!(h.session(|s| s.event.is_none()).await);

    // The next message starts over at the main menu.
    assert_eq!(h.send("hola").await, ChatState::MainMenu);
}

#[tokio::test]
async fn free_event_is_rendered_as_gratuito() {
    let h = Harness::new();
    h.register_organizer().await;
    h.script(TO_ORGANIZER_MENU).await;
    let mut script = MILONGA_TO_CONFIRMATION.to_vec();
    script.pop();
    script.extend(["si", "1", "gratis"]);

    assert_eq!(h.script(&script).await, ChatState::CreateEventConfirmation);
    let summary = h.transport.last().await;
    assert!(summary.contains("Gratuito"), "{summary}");
    assert!(!summary.contains("$0"), "{summary}");

    assert_eq!(h.send("si").await, ChatState::MenuSpecial);
    let events = h.directory.events().await;
    assert!(events[0].1.pricing[0].price.is_free());
}

#[tokio::test]
async fn organizer_search_without_matches_asks_for_a_name() {
    let h = Harness::new();
    h.register_organizer().await;
    h.script(TO_ORGANIZER_MENU).await;
    let mut script = MILONGA_TO_CONFIRMATION[..10].to_vec();
    script.push("Zzz");
    assert_eq!(h.script(&script).await, ChatState::CreateOrganizerOneTimeName);

    let sent = h.transport.sent.lock().await;
    let notice = &sent[sent.len() - 2].1;
    assert!(notice.contains("Zzz"), "{notice}");
}

#[tokio::test]
async fn organizer_search_selects_registered_teacher() {
    let h = Harness::new();
    h.register_organizer().await;
    h.directory
        .add_user(User {
            id: "u-carlos".into(),
            phone: "542215559999".into(),
            name: "Carlos Gavito".into(),
            details: Some("Milonguero".into()),
            is_teacher: true,
        })
        .await;
    h.script(TO_ORGANIZER_MENU).await;
    let mut script = MILONGA_TO_CONFIRMATION[..10].to_vec();
    script.extend(["gavito", "1"]);
    assert_eq!(h.script(&script).await, ChatState::CreateOrganizerAddAnother);

    let organizers = h
        .session(|s| s.event.as_ref().map(|d| d.organizers.clone()))
        .await
        .unwrap();
    assert!(matches!(
        &organizers[0].organizer,
        Organizer::Registered { user_id, .. } if user_id == "u-carlos"
    ));
}

#[tokio::test]
async fn unregistered_caller_cannot_open_organizer_menu() {
    let h = Harness::new();
    assert_eq!(h.script(TO_ORGANIZER_MENU).await, ChatState::MainMenu);
    assert_eq!(h.transport.last().await, messages::not_registered());
}

#[tokio::test]
async fn teacher_decline_discards_the_draft() {
    let h = Harness::new();
    h.register_organizer().await;
    h.script(TO_ORGANIZER_MENU).await;
    let state = h.script(&["3", "221 555-9999", "Carlos", "."]).await;
    assert_eq!(state, ChatState::OtherTeacherConfirmation);

    assert_eq!(h.send("2").await, ChatState::OtherTeacherPhone);
    let name = h
        .session(|s| s.teacher.as_ref().and_then(|t| t.name.clone()))
        .await;
    assert_eq!(name, None);

    h.script(&["221 555-9999", "Carlos", "Milonguero de la vieja guardia", "1"])
        .await;
    assert_eq!(h.dispatcher.state_of(PHONE).await, ChatState::MenuSpecial);
    let users = h.directory.users().await;
    let carlos = users.iter().find(|u| u.id == "2215559999").unwrap();
    assert_eq!(carlos.name, "Carlos");
    assert!(carlos.is_teacher);
}

#[tokio::test]
async fn self_registration_uses_the_caller_key() {
    let h = Harness::new();
    h.register_organizer().await;
    h.script(TO_ORGANIZER_MENU).await;
    let state = h
        .script(&["2", "Ana Pérez", "Profe de tango salón hace diez años", "si"])
        .await;
    assert_eq!(state, ChatState::MenuSpecial);
    let users = h.directory.users().await;
    assert!(users.iter().any(|u| u.id == KEY && u.is_teacher));
}

#[tokio::test]
async fn secret_code_opens_organizer_menu_from_anywhere() {
    let directory = Arc::new(InMemoryDirectory::new());
    let transport = Arc::new(Recorder::default());
    let dispatcher = Dispatcher::standard(Harness::deps(directory.clone()), transport.clone())
        .unwrap()
        .with_secret_access_code(Some(SecretString::from("Abrazo")));
    let h = Harness {
        dispatcher,
        transport,
        directory,
    };

    assert_eq!(h.send("abrazo").await, ChatState::MenuSpecial);
    assert_eq!(h.transport.last().await, messages::special_menu());
    assert_eq!(h.send("1").await, ChatState::CreateEventType);
}

#[tokio::test]
async fn free_text_fills_the_draft() {
    let extraction = Extraction {
        partial: PartialEvent {
            event_type: Some(EventType::Milonga),
            title: Some("La Milonguita".into()),
            venue_name: Some("Club Atenas".into()),
            address: Some("Calle 13 1234".into()),
            date: Some("25/10/2026".into()),
            time: Some("22:00".into()),
            organizer_name: Some("Ana".into()),
            price: Some("gratis".into()),
            ..Default::default()
        },
        confidence: 90,
        ..Default::default()
    };
    let h = Harness::with_deps(|deps| {
        deps.with_extractor(Arc::new(StubExtractor { extraction }))
    });
    h.register_organizer().await;
    h.script(TO_ORGANIZER_MENU).await;

    assert_eq!(h.script(&["1", "5"]).await, ChatState::CreateEventFreeText);
    let before = h.transport.count().await;
    let state = h
        .send("Milonga La Milonguita el 25/10 a las 22 en Club Atenas, gratis")
        .await;
    assert_eq!(state, ChatState::CreateEventConfirmation);
    // Confident extraction: just the summary, no review notice.
    assert_eq!(h.transport.count().await, before + 1);

    assert_eq!(h.send("1").await, ChatState::MenuSpecial);
    assert_eq!(h.directory.events().await.len(), 1);
}

#[tokio::test]
async fn uncertain_free_text_warns_and_asks_for_missing_fields() {
    let extraction = Extraction {
        partial: PartialEvent {
            event_type: Some(EventType::Milonga),
            title: Some("La Milonguita".into()),
            date: Some("31/02/2026".into()),
            ..Default::default()
        },
        confidence: 30,
        needs_human_input: true,
        follow_up_questions: vec!["¿Dónde es?".into()],
        ..Default::default()
    };
    let h = Harness::with_deps(|deps| {
        deps.with_extractor(Arc::new(StubExtractor { extraction }))
    });
    h.register_organizer().await;
    h.script(TO_ORGANIZER_MENU).await;
    h.script(&["1", "5"]).await;

    let state = h.send("milonga la milonguita").await;
    assert_eq!(state, ChatState::CreateEventVenue);
    let sent = h.transport.sent.lock().await;
    let notice = &sent[sent.len() - 2].1;
    assert!(notice.contains("30%"), "{notice}");
    assert!(notice.contains("¿Dónde es?"), "{notice}");
}

#[tokio::test]
async fn handler_failure_resets_to_start() {
    let directory = Arc::new(InMemoryDirectory::new());
    let transport = Arc::new(Recorder::default());
    let deps = Harness::deps(directory.clone());
    let handlers: Vec<Arc<dyn FlowHandler>> = vec![
        Arc::new(MenuFlow::new(deps.clone())),
        Arc::new(TeacherFlow::new(deps)),
        Arc::new(BrokenEventFlow),
    ];
    let dispatcher = Dispatcher::new(handlers, transport.clone(), Default::default())
        .unwrap()
        .with_secret_access_code(Some(SecretString::from("abrazo")));
    let h = Harness {
        dispatcher,
        transport,
        directory,
    };

    h.script(&["abrazo", "1"]).await;
    assert_eq!(h.dispatcher.state_of(PHONE).await, ChatState::CreateEventType);

    assert_eq!(h.send("2").await, ChatState::Start);
    assert_eq!(h.transport.last().await, messages::generic_apology());
    assert!(h.session(|s| s.event.is_none()).await);
}

#[tokio::test]
async fn different_numbers_keep_separate_sessions() {
    let h = Arc::new(Harness::new());
    let other = "5492215550000";

    let a = {
        let h = h.clone();
        tokio::spawn(async move { h.script(&["hola", "3"]).await })
    };
    let b = {
        let h = h.clone();
        tokio::spawn(async move {
            h.dispatcher.handle_message(other, "hola").await;
            h.dispatcher.handle_message(other, "1").await
        })
    };

    assert_eq!(a.await.unwrap(), ChatState::MenuAbout);
    assert_eq!(b.await.unwrap(), ChatState::MenuToday);
    assert_eq!(h.dispatcher.sessions().len().await, 2);
}
