//! Draft data accumulated by the creation wizards before persistence.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::state::ChatState;
use crate::validation::Price;

/// Kind of tango event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Class,
    Milonga,
    Seminar,
    SpecialEvent,
}

impl EventType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Class => "Clase",
            Self::Milonga => "Milonga",
            Self::Seminar => "Seminario",
            Self::SpecialEvent => "Evento especial",
        }
    }

    /// Classes and seminars share the class branch of the wizard.
    pub fn uses_class_branch(&self) -> bool {
        matches!(self, Self::Class | Self::Seminar)
    }
}

/// Class difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassLevel {
    Beginner,
    Intermediate,
    Advanced,
    AllLevels,
}

impl ClassLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Beginner => "Principiante",
            Self::Intermediate => "Intermedio",
            Self::Advanced => "Avanzado",
            Self::AllLevels => "Todos los niveles",
        }
    }
}

/// Whether the event has one class or several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassMode {
    Single,
    Multiple,
}

/// Whether the event has one price or a list of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    Single,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<ClassLevel>,
}

/// Practice session following the classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Practice {
    pub time: String,
}

/// Class held before a milonga starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreClass {
    pub class_time: String,
    pub milonga_time: String,
}

/// Who organizes or teaches the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Organizer {
    /// An existing user in the directory.
    Registered { user_id: String, name: String },
    /// A free-text name with no directory identity.
    OneTime { name: String },
}

impl Organizer {
    pub fn name(&self) -> &str {
        match self {
            Self::Registered { name, .. } | Self::OneTime { name } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizerEntry {
    pub organizer: Organizer,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingEntry {
    pub description: String,
    pub price: Price,
}

/// A required field the draft does not have yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    EventType,
    Title,
    Venue,
    Address,
    Date,
    Organizer,
    Class,
}

impl MissingField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::EventType => "tipo de evento",
            Self::Title => "título",
            Self::Venue => "lugar",
            Self::Address => "dirección",
            Self::Date => "fecha",
            Self::Organizer => "organizador/a",
            Self::Class => "horario de clase",
        }
    }

    /// The wizard step that fills this field.
    pub fn state(&self) -> ChatState {
        match self {
            Self::EventType => ChatState::CreateEventType,
            Self::Title => ChatState::CreateEventTitle,
            Self::Venue => ChatState::CreateEventVenue,
            Self::Address => ChatState::CreateEventAddress,
            Self::Date => ChatState::CreateEventDate,
            Self::Organizer => ChatState::CreateOrganizerSelf,
            Self::Class => ChatState::CreateClassTime,
        }
    }
}

/// The event being built by the event-creation wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftEvent {
    pub event_type: Option<EventType>,
    pub title: Option<String>,
    pub venue_name: Option<String>,
    pub address: Option<String>,
    /// ISO `YYYY-MM-DD`.
    pub date: Option<String>,
    pub description: Option<String>,
    pub has_weekly_recurrence: bool,
    pub contact_phone: Option<String>,
    pub reminder_phone: Option<String>,
    pub class_mode: Option<ClassMode>,
    pub classes: Vec<ClassEntry>,
    /// Class whose time is known but whose level is still being asked.
    #[serde(skip)]
    pub pending_class: Option<ClassEntry>,
    pub practice: Option<Practice>,
    /// Start time of a milonga or special event.
    pub start_time: Option<String>,
    pub pre_class: Option<PreClass>,
    pub show_description: Option<String>,
    pub organizers: Vec<OrganizerEntry>,
    pub pricing: Vec<PricingEntry>,
    #[serde(skip)]
    pub pricing_mode: Option<PricingMode>,
    /// Description typed before its amount.
    #[serde(skip)]
    pub pending_price_description: Option<String>,
}

impl DraftEvent {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type: Some(event_type),
            ..Default::default()
        }
    }

    /// Append an organizer. The first one on an empty list becomes primary.
    ///
    /// Returns `false` when the registered user is already listed.
    pub fn add_organizer(&mut self, organizer: Organizer) -> bool {
        if let Organizer::Registered { user_id, .. } = &organizer {
            let duplicate = self.organizers.iter().any(|entry| {
                matches!(&entry.organizer, Organizer::Registered { user_id: existing, .. } if existing == user_id)
            });
            if duplicate {
                return false;
            }
        }
        let is_primary = self.organizers.is_empty();
        self.organizers.push(OrganizerEntry {
            organizer,
            is_primary,
        });
        true
    }

    pub fn primary_organizer(&self) -> Option<&Organizer> {
        self.organizers
            .iter()
            .find(|entry| entry.is_primary)
            .map(|entry| &entry.organizer)
    }

    /// Commit the pending class, if any.
    pub fn commit_pending_class(&mut self) {
        if let Some(class) = self.pending_class.take() {
            self.classes.push(class);
        }
    }

    /// Reopen the last committed class so it can be answered again.
    pub fn reopen_last_class(&mut self) {
        if self.pending_class.is_none() {
            self.pending_class = self.classes.pop();
        }
    }

    /// Reopen the last price so its amount can be answered again.
    pub fn reopen_last_price(&mut self) {
        if self.pending_price_description.is_none() {
            if let Some(entry) = self.pricing.pop() {
                self.pending_price_description = Some(entry.description);
            }
        }
    }

    /// Required fields still missing, in wizard order.
    pub fn missing_fields(&self) -> Vec<MissingField> {
        let mut missing = Vec::new();
        if self.event_type.is_none() {
            missing.push(MissingField::EventType);
        }
        if self.title.is_none() {
            missing.push(MissingField::Title);
        }
        if self.venue_name.is_none() {
            missing.push(MissingField::Venue);
        }
        if self.address.is_none() {
            missing.push(MissingField::Address);
        }
        if self.date.is_none() {
            missing.push(MissingField::Date);
        }
        if self.event_type == Some(EventType::Class) && self.classes.is_empty() {
            missing.push(MissingField::Class);
        }
        if self.organizers.is_empty() {
            missing.push(MissingField::Organizer);
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// Teacher record being built by the teacher-registration wizards.
#[derive(Debug, Default)]
pub struct DraftTeacher {
    pub name: Option<String>,
    pub details: Option<String>,
    pub phone: Option<String>,
    pub password: Option<SecretString>,
}

/// Payload handed to the directory when a teacher is confirmed.
#[derive(Debug)]
pub struct NewTeacher {
    pub name: String,
    pub details: Option<String>,
    pub password: Option<SecretString>,
}

impl DraftTeacher {
    /// Build the persistence payload; `None` while the name is missing.
    pub fn to_new_teacher(&self) -> Option<NewTeacher> {
        let name = self.name.clone()?;
        Some(NewTeacher {
            name,
            details: self.details.clone(),
            password: self
                .password
                .as_ref()
                .map(|p| SecretString::from(p.expose_secret().to_string())),
        })
    }
}
