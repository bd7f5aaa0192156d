//! The persistence collaborator: users, teachers and events.
//!
//! The conversation core only sees the [`Directory`] trait. The in-memory
//! backend serves the CLI mode, local webhook runs and tests.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use secrecy::ExposeSecret;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::DirectoryError;
use crate::flow::draft::{DraftEvent, EventType, NewTeacher, PricingEntry};

/// A known user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub phone: String,
    pub name: String,
    pub details: Option<String>,
    pub is_teacher: bool,
}

/// A teacher search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeacherMatch {
    pub id: String,
    pub name: String,
    pub details: Option<String>,
}

/// Receipt for a persisted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedEvent {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One occurrence of an event inside a queried date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedEvent {
    pub id: Uuid,
    pub title: String,
    pub event_type: EventType,
    pub venue_name: String,
    pub address: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub is_recurring: bool,
    pub organizers: Vec<String>,
    pub description: Option<String>,
    pub pricing: Vec<PricingEntry>,
    pub contact_phone: Option<String>,
}

/// Backend-agnostic persistence interface.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Look up a user by session key.
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>, DirectoryError>;

    /// Teachers whose name contains `fragment`, up to `limit`.
    async fn search_teachers(
        &self,
        fragment: &str,
        limit: usize,
    ) -> Result<Vec<TeacherMatch>, DirectoryError>;

    /// Persist a complete event draft. Incomplete drafts are refused.
    async fn create_event(
        &self,
        creator_id: &str,
        draft: &DraftEvent,
    ) -> Result<CreatedEvent, DirectoryError>;

    /// Create (or promote) a teacher record under `id`.
    async fn create_teacher(&self, id: &str, teacher: NewTeacher) -> Result<User, DirectoryError>;

    /// Event occurrences between `start` and `end` (inclusive; `None` = `start` only),
    /// expanding weekly recurrences.
    async fn query_events_in_range(
        &self,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<Vec<ListedEvent>, DirectoryError>;
}

#[derive(Debug, Clone)]
struct StoredEvent {
    id: Uuid,
    creator_id: String,
    draft: DraftEvent,
    date: NaiveDate,
}

/// Process-local directory.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<Vec<User>>,
    events: RwLock<Vec<StoredEvent>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user.
    pub async fn add_user(&self, user: User) {
        let mut users = self.users.write().await;
        users.retain(|u| u.id != user.id);
        users.push(user);
    }

    /// Snapshot of persisted drafts with their creators, in insertion order.
    pub async fn events(&self) -> Vec<(String, DraftEvent)> {
        self.events
            .read()
            .await
            .iter()
            .map(|e| (e.creator_id.clone(), e.draft.clone()))
            .collect()
    }

    pub async fn users(&self) -> Vec<User> {
        self.users.read().await.clone()
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>, DirectoryError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.phone == phone)
            .cloned())
    }

    async fn search_teachers(
        &self,
        fragment: &str,
        limit: usize,
    ) -> Result<Vec<TeacherMatch>, DirectoryError> {
        let needle = fragment.trim().to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .iter()
            .filter(|u| u.is_teacher && u.name.to_lowercase().contains(&needle))
            .take(limit)
            .map(|u| TeacherMatch {
                id: u.id.clone(),
                name: u.name.clone(),
                details: u.details.clone(),
            })
            .collect())
    }

    async fn create_event(
        &self,
        creator_id: &str,
        draft: &DraftEvent,
    ) -> Result<CreatedEvent, DirectoryError> {
        let missing = draft.missing_fields();
        if !missing.is_empty() {
            let labels: Vec<_> = missing.iter().map(|m| m.label()).collect();
            return Err(DirectoryError::Constraint(format!(
                "incomplete event draft: missing {}",
                labels.join(", ")
            )));
        }
        let date = draft
            .date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .ok_or_else(|| DirectoryError::Constraint("event date is not ISO".into()))?;

        let created = CreatedEvent {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        self.events.write().await.push(StoredEvent {
            id: created.id,
            creator_id: creator_id.to_string(),
            draft: draft.clone(),
            date,
        });
        info!(event_id = %created.id, creator = %creator_id, "Event stored");
        Ok(created)
    }

    async fn create_teacher(&self, id: &str, teacher: NewTeacher) -> Result<User, DirectoryError> {
        let empty_password = teacher
            .password
            .as_ref()
            .is_some_and(|p| p.expose_secret().is_empty());
        if empty_password {
            return Err(DirectoryError::Constraint("empty password".into()));
        }

        let mut users = self.users.write().await;
        let user = match users.iter_mut().find(|u| u.id == id) {
            Some(existing) => {
                existing.name = teacher.name;
                existing.details = teacher.details;
                existing.is_teacher = true;
                existing.clone()
            }
            None => {
                let user = User {
                    id: id.to_string(),
                    phone: id.to_string(),
                    name: teacher.name,
                    details: teacher.details,
                    is_teacher: true,
                };
                users.push(user.clone());
                user
            }
        };
        info!(teacher_id = %user.id, "Teacher stored");
        Ok(user)
    }

    async fn query_events_in_range(
        &self,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<Vec<ListedEvent>, DirectoryError> {
        let end = end.unwrap_or(start);
        if end < start {
            return Err(DirectoryError::Query(format!(
                "range end {end} is before start {start}"
            )));
        }

        let events = self.events.read().await;
        let mut listed: Vec<ListedEvent> = events
            .iter()
            .flat_map(|event| {
                occurrences(event.date, event.draft.has_weekly_recurrence, start, end)
                    .into_iter()
                    .map(move |date| listing(event, date))
            })
            .collect();
        listed.sort_by(|a, b| (a.date, &a.time, &a.title).cmp(&(b.date, &b.time, &b.title)));
        Ok(listed)
    }
}

/// Dates in `[start, end]` on which an event dated `date` happens.
fn occurrences(date: NaiveDate, weekly: bool, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if !weekly {
        return if date >= start && date <= end {
            vec![date]
        } else {
            Vec::new()
        };
    }

    let mut found = Vec::new();
    let mut day = start.max(date);
    while day <= end {
        if day.weekday() == date.weekday() {
            found.push(day);
        }
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }
    found
}

fn listing(event: &StoredEvent, date: NaiveDate) -> ListedEvent {
    let draft = &event.draft;
    let time = draft
        .classes
        .first()
        .map(|c| c.start_time.clone())
        .or_else(|| draft.pre_class.as_ref().map(|p| p.class_time.clone()))
        .or_else(|| draft.start_time.clone())
        .or_else(|| draft.practice.as_ref().map(|p| p.time.clone()));

    // Primary organizer first, the rest in entry order.
    let organizers = draft
        .primary_organizer()
        .into_iter()
        .chain(
            draft
                .organizers
                .iter()
                .filter(|entry| !entry.is_primary)
                .map(|entry| &entry.organizer),
        )
        .map(|organizer| organizer.name().to_string())
        .collect();

    ListedEvent {
        id: event.id,
        title: draft.title.clone().unwrap_or_default(),
        event_type: draft.event_type.unwrap_or(EventType::SpecialEvent),
        venue_name: draft.venue_name.clone().unwrap_or_default(),
        address: draft.address.clone().unwrap_or_default(),
        date,
        time,
        is_recurring: draft.has_weekly_recurrence,
        organizers,
        description: draft.description.clone(),
        pricing: draft.pricing.clone(),
        contact_phone: draft.contact_phone.clone(),
    }
}
